use nalgebra::{Vector2, Vector3};
use crate::geom::ray::{Intersection, Ray};
use crate::helper::BaseFloat;

/// One triangle of a mesh, immutable after load. The centroid is derived at
/// construction and drives the SAH partitioning.
#[derive(Clone, Copy, Debug)]
pub struct Tri<T> {
    pub vertex0: Vector3<T>,
    pub vertex1: Vector3<T>,
    pub vertex2: Vector3<T>,
    pub centroid: Vector3<T>,
}

impl<T> Tri<T>
where T: BaseFloat {
    pub fn new(vertex0: Vector3<T>, vertex1: Vector3<T>, vertex2: Vector3<T>) -> Self {
        let centroid = (vertex0 + vertex1 + vertex2) / <T as BaseFloat>::from_usize(3);
        Tri {
            vertex0,
            vertex1,
            vertex2,
            centroid,
        }
    }

    /// Möller–Trumbore ray/triangle test. Updates the ray's hit record only
    /// when the intersection is strictly closer than the current one. Rays
    /// parallel to the triangle plane (and degenerate triangles, whose
    /// determinant is zero as well) report no hit.
    pub fn intersect(&self, ray: &mut Ray<T>, inst_prim: u32) {
        let parallel_eps = <T as BaseFloat>::from_f32(1e-5);
        let min_t = <T as BaseFloat>::from_f32(1e-4);

        let edge1 = self.vertex1 - self.vertex0;
        let edge2 = self.vertex2 - self.vertex0;
        let h = ray.dir.cross(&edge2);
        let a = edge1.dot(&h);
        if a > -parallel_eps && a < parallel_eps {
            return;
        }
        let f = T::one() / a;
        let s = ray.origin - self.vertex0;
        let u = f * s.dot(&h);
        if u < T::zero() || u > T::one() {
            return;
        }
        let q = s.cross(&edge1);
        let v = f * ray.dir.dot(&q);
        if v < T::zero() || u + v > T::one() {
            return;
        }
        let t = f * edge2.dot(&q);
        if t > min_t && t < ray.hit.t {
            ray.hit = Intersection { t, u, v, inst_prim };
        }
    }
}

/// Shading attributes kept parallel to the `Tri` array: per-vertex normals
/// and texture coordinates. The traversal never reads these; they exist for
/// the shading hook.
#[derive(Clone, Copy, Debug)]
pub struct TriEx<T> {
    pub n0: Vector3<T>,
    pub n1: Vector3<T>,
    pub n2: Vector3<T>,
    pub uv0: Vector2<T>,
    pub uv1: Vector2<T>,
    pub uv2: Vector2<T>,
}
