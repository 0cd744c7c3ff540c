use nalgebra::Vector3;
use crate::helper::BaseFloat;

/// Bits of `inst_prim` reserved for the triangle index; the instance index
/// occupies the bits above. Instances are therefore limited to 4096 and
/// triangles per mesh to 2^20.
pub const INST_PRIM_TRI_BITS: u32 = 20;

const INST_PRIM_TRI_MASK: u32 = (1 << INST_PRIM_TRI_BITS) - 1;

/// Hit record carried along a ray. A `t` of `BaseFloat::NO_HIT` means the
/// ray has not hit anything yet; `u` and `v` are the barycentric weights of
/// the second and third vertex (the first gets `1 - u - v`).
#[derive(Clone, Copy, Debug)]
pub struct Intersection<T> {
    pub t: T,
    pub u: T,
    pub v: T,
    pub inst_prim: u32,
}

impl<T> Intersection<T>
where T: BaseFloat {
    pub fn none() -> Self {
        Intersection {
            t: T::NO_HIT,
            u: T::zero(),
            v: T::zero(),
            inst_prim: 0,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.t < T::NO_HIT
    }

    /// Index of the instance the hit triangle belongs to.
    pub fn instance(&self) -> u32 {
        self.inst_prim >> INST_PRIM_TRI_BITS
    }

    /// Index of the hit triangle within its mesh.
    pub fn triangle(&self) -> u32 {
        self.inst_prim & INST_PRIM_TRI_MASK
    }
}

/// Packs an instance index and a triangle index into one hit identifier.
pub fn pack_inst_prim(instance: u32, triangle: u32) -> u32 {
    debug_assert!(instance < 1 << (32 - INST_PRIM_TRI_BITS));
    debug_assert!(triangle <= INST_PRIM_TRI_MASK);
    (instance << INST_PRIM_TRI_BITS) | triangle
}

/// A ray with its reciprocal direction (for slab tests) and the closest hit
/// found so far.
#[derive(Clone, Copy, Debug)]
pub struct Ray<T> {
    pub origin: Vector3<T>,
    pub dir: Vector3<T>,
    pub r_dir: Vector3<T>,
    pub hit: Intersection<T>,
}

impl<T> Ray<T>
where T: BaseFloat {
    /// Creates a ray with no hit recorded. The direction is taken as given;
    /// primary rays are expected to be unit length, instance-local sub-rays
    /// deliberately are not.
    pub fn new(origin: Vector3<T>, dir: Vector3<T>) -> Self {
        let mut ray = Ray {
            origin,
            dir,
            r_dir: Vector3::zeros(),
            hit: Intersection::none(),
        };
        ray.set_direction(dir);
        ray
    }

    /// Replaces the direction and recomputes the reciprocal elementwise. A
    /// zero component divides to ±∞, which keeps the slab test well defined.
    pub fn set_direction(&mut self, dir: Vector3<T>) {
        self.dir = dir;
        self.r_dir = Vector3::new(
            T::one() / dir[0],
            T::one() / dir[1],
            T::one() / dir[2],
        );
    }

    pub fn reset_hit(&mut self) {
        self.hit = Intersection::none();
    }
}

/// Traversal statistics for one unit of tracing work (the driver keeps one
/// per tile). Plain counters, bumped from the hot loops.
#[derive(Clone, Copy, Debug, Default)]
pub struct RayCounter {
    pub traversals: u64,
    pub box_tests: u64,
    pub triangle_tests: u64,
    pub bounces: u64,
}


#[cfg(test)]
mod test {
    use nalgebra::Vector3;
    use super::*;

    #[test]
    fn inst_prim_round_trip() {
        let packed = pack_inst_prim(4095, (1 << 20) - 1);
        let hit = Intersection::<f32> {
            inst_prim: packed,
            ..Intersection::none()
        };
        assert_eq!(hit.instance(), 4095);
        assert_eq!(hit.triangle(), (1 << 20) - 1);
    }

    #[test]
    fn reciprocal_of_zero_component_is_infinite() {
        let ray = Ray::new(Vector3::zeros(), Vector3::new(1.0f32, 0.0, 0.0));
        assert_eq!(ray.r_dir[0], 1.0);
        assert!(ray.r_dir[1].is_infinite());
        assert!(ray.r_dir[2].is_infinite());
    }

    #[test]
    fn fresh_ray_has_no_hit() {
        let ray = Ray::new(Vector3::zeros(), Vector3::new(0.0f64, 0.0, 1.0));
        assert!(!ray.hit.is_hit());
        assert_eq!(ray.hit.t, f64::NO_HIT);
    }

    #[test]
    fn reset_hit_clears_the_record() {
        let mut ray = Ray::new(Vector3::zeros(), Vector3::new(0.0f32, 0.0, 1.0));
        ray.hit = Intersection {
            t: 2.0,
            u: 0.1,
            v: 0.2,
            inst_prim: 9,
        };
        ray.reset_hit();
        assert!(!ray.hit.is_hit());
        assert_eq!(ray.hit.inst_prim, 0);
    }
}
