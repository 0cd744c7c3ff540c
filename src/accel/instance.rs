use std::sync::Arc;
use log::warn;
use nalgebra::{Matrix4, Vector3};
use crate::accel::aabb::Aabb;
use crate::accel::blas::Blas;
use crate::geom::ray::{Ray, RayCounter};
use crate::helper::mat::{transform_point, transform_vector};
use crate::helper::BaseFloat;

/// A placed copy of a BLAS: a shared read-only handle to the hierarchy, an
/// index into the caller's BLAS table (so shading can find the matching
/// attributes), the instance's own id for hit identification, and the
/// world-space transform with its inverse.
pub struct BlasInstance<T> {
    blas: Arc<Blas<T>>,
    blas_idx: u32,
    inst_idx: u32,
    transform: Matrix4<T>,
    inv_transform: Matrix4<T>,
    bounds: Aabb<T>,
}

impl<T> BlasInstance<T>
where T: BaseFloat {
    pub fn new(blas: Arc<Blas<T>>, blas_idx: u32, inst_idx: u32) -> Self {
        let mut instance = BlasInstance {
            blas,
            blas_idx,
            inst_idx,
            transform: Matrix4::identity(),
            inv_transform: Matrix4::identity(),
            bounds: Aabb::new(),
        };
        instance.set_transform(Matrix4::identity());
        instance
    }

    pub fn blas(&self) -> &Blas<T> {
        &self.blas
    }

    pub fn blas_idx(&self) -> usize {
        self.blas_idx as usize
    }

    pub fn inst_idx(&self) -> u32 {
        self.inst_idx
    }

    pub fn transform(&self) -> &Matrix4<T> {
        &self.transform
    }

    /// World-space bounds of the transformed BLAS root box.
    pub fn bounds(&self) -> &Aabb<T> {
        &self.bounds
    }

    /// Installs a new transform and recomputes the world bounds from the 8
    /// transformed corners of the BLAS root box.
    ///
    /// Transforms must be rigid or uniformly scaling: the hit distance is
    /// carried across the instance boundary unscaled, and non-uniform scale
    /// would break its ordering against hits in other instances.
    pub fn set_transform(&mut self, transform: Matrix4<T>) {
        self.inv_transform = transform.try_inverse().unwrap_or_else(|| {
            warn!("singular instance transform, falling back to identity");
            Matrix4::identity()
        });
        self.transform = transform;

        let root = self.blas.root_bounds();
        let mut bounds = Aabb::new();
        if self.blas.tris().is_empty() {
            self.bounds = bounds;
            return;
        }
        for i in 0..8 {
            let corner = Vector3::new(
                if i & 1 != 0 { root.max[0] } else { root.min[0] },
                if i & 2 != 0 { root.max[1] } else { root.min[1] },
                if i & 4 != 0 { root.max[2] } else { root.min[2] },
            );
            bounds.grow(&transform_point(&transform, &corner));
        }
        self.bounds = bounds;
    }

    /// Traverses the BLAS with a sub-ray expressed in the instance's local
    /// frame: the origin transforms as a point, the direction as a vector
    /// (deliberately not re-normalized, so the hit distance keeps the
    /// caller's parameterization). The caller's origin and direction are
    /// never touched; only the tightened hit record is carried back.
    pub fn intersect(&self, ray: &mut Ray<T>, counter: &mut RayCounter) {
        let mut local = Ray::new(
            transform_point(&self.inv_transform, &ray.origin),
            transform_vector(&self.inv_transform, &ray.dir),
        );
        local.hit = ray.hit;
        self.blas.intersect(&mut local, self.inst_idx, counter);
        ray.hit = local.hit;
    }
}


#[cfg(test)]
mod test {
    use std::sync::Arc;
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Vector3};
    use crate::accel::blas::Blas;
    use crate::accel::splitting::{BinnedSah, BINS};
    use crate::geom::ray::{Ray, RayCounter};
    use crate::geom::tri::Tri;
    use crate::helper::mat::init_translation;
    use super::BlasInstance;

    fn unit_tri_blas() -> Arc<Blas<f32>> {
        let mut blas = Blas::new(vec![Tri::new(
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        )]);
        blas.build::<BinnedSah<BINS>>();
        Arc::new(blas)
    }

    #[test]
    fn identity_instance_matches_the_bare_blas() {
        let blas = unit_tri_blas();
        let instance = BlasInstance::new(blas.clone(), 0, 0);

        let origin = Vector3::new(0.25, 0.25, -1.0);
        let dir = Vector3::new(0.0, 0.0, 1.0);
        let mut direct = Ray::new(origin, dir);
        blas.intersect(&mut direct, 0, &mut RayCounter::default());
        let mut via_instance = Ray::new(origin, dir);
        instance.intersect(&mut via_instance, &mut RayCounter::default());

        assert_eq!(direct.hit.t, via_instance.hit.t);
        assert_eq!(direct.hit.u, via_instance.hit.u);
        assert_eq!(direct.hit.v, via_instance.hit.v);
    }

    #[test]
    fn intersect_leaves_origin_and_direction_alone() {
        let mut instance = BlasInstance::new(unit_tri_blas(), 0, 0);
        instance.set_transform(init_translation(&Vector3::new(0.5, 0.0, 0.0)));
        let mut ray = Ray::new(Vector3::new(0.75, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0));
        instance.intersect(&mut ray, &mut RayCounter::default());
        assert_eq!(ray.origin, Vector3::new(0.75, 0.25, -1.0));
        assert_eq!(ray.dir, Vector3::new(0.0, 0.0, 1.0));
        assert!(ray.hit.is_hit());
        assert_relative_eq!(ray.hit.t, 1.0);
    }

    #[test]
    fn world_bounds_follow_the_transform() {
        let mut instance = BlasInstance::new(unit_tri_blas(), 0, 0);
        instance.set_transform(init_translation(&Vector3::new(-3.0, 2.0, 0.0)));
        assert_relative_eq!(instance.bounds().min, Vector3::new(-3.0, 2.0, 0.0));
        assert_relative_eq!(instance.bounds().max, Vector3::new(-2.0, 3.0, 0.0));
    }

    #[test]
    fn translated_instances_resolve_to_their_own_ids() {
        let blas = unit_tri_blas();
        let mut left = BlasInstance::new(blas.clone(), 0, 0);
        left.set_transform(init_translation(&Vector3::new(-2.0, 0.0, 0.0)));
        let mut right = BlasInstance::new(blas, 0, 1);
        right.set_transform(init_translation(&Vector3::new(2.0, 0.0, 0.0)));

        // aimed at the +x copy: misses the -x copy entirely
        let mut ray = Ray::new(Vector3::new(2.25, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0));
        left.intersect(&mut ray, &mut RayCounter::default());
        assert!(!ray.hit.is_hit());
        right.intersect(&mut ray, &mut RayCounter::default());
        assert!(ray.hit.is_hit());
        assert_eq!(ray.hit.instance(), 1);
        assert_eq!(ray.hit.triangle(), 0);
    }

    #[test]
    fn singular_transform_falls_back_to_identity_inverse() {
        let mut instance = BlasInstance::new(unit_tri_blas(), 0, 0);
        instance.set_transform(Matrix4::zeros());
        let mut ray = Ray::new(Vector3::new(0.25, 0.25, -1.0), Vector3::new(0.0, 0.0, 1.0));
        instance.intersect(&mut ray, &mut RayCounter::default());
        assert!(ray.hit.is_hit());
    }
}
