use nalgebra::{Vector3, Vector4};
use crate::geom::ray::Ray;
use crate::helper::BaseFloat;

/// Axis aligned bounding box.
#[derive(Clone, Copy, Debug)]
pub struct Aabb<T> {
    pub min: Vector3<T>,
    pub max: Vector3<T>,
}

impl<T> PartialEq for Aabb<T>
where T: BaseFloat {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl<T> Aabb<T>
where T: BaseFloat {
    /// Creates an empty AABB: min at the float maximum, max at the float
    /// minimum. Growing from this state fits the box to whatever is added,
    /// and growing *by* an empty box is a no-op.
    pub fn new() -> Self {
        Aabb {
            min: Vector3::repeat(T::MAX),
            max: Vector3::repeat(T::MIN),
        }
    }

    /// Resets the box to the empty state (see `new`).
    pub fn reset(&mut self) {
        self.min = Vector3::repeat(T::MAX);
        self.max = Vector3::repeat(T::MIN);
    }

    /// Grows the box to include the point `p`. Growth is monotonic; the box
    /// never shrinks.
    pub fn grow(&mut self, p: &Vector3<T>) {
        for i in 0..3 {
            self.min[i] = T::min(self.min[i], p[i]);
            self.max[i] = T::max(self.max[i], p[i]);
        }
    }

    /// Grows the box to include the `other` box.
    pub fn grow_aabb(&mut self, other: &Aabb<T>) {
        for i in 0..3 {
            self.min[i] = T::min(self.min[i], other.min[i]);
            self.max[i] = T::max(self.max[i], other.max[i]);
        }
    }

    /// Sets the box to the union of `left` and `right`.
    pub fn adjust(&mut self, left: &Aabb<T>, right: &Aabb<T>) {
        for i in 0..3 {
            self.min[i] = T::min(left.min[i], right.min[i]);
            self.max[i] = T::max(left.max[i], right.max[i]);
        }
    }

    pub fn center(&self) -> Vector3<T> {
        (self.min + self.max) * T::half()
    }

    /// Surface area `2(ex·ey + ey·ez + ez·ex)`, 0 for an empty box.
    pub fn area(&self) -> T {
        let e = self.max - self.min;
        if e[0] < T::zero() || e[1] < T::zero() || e[2] < T::zero() {
            return T::zero();
        }
        T::two() * (e[0] * e[1] + e[1] * e[2] + e[2] * e[0])
    }

    /// Whether `p` lies inside the box (inclusive).
    pub fn contains(&self, p: &Vector3<T>) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// Whether `other` lies fully inside the box.
    pub fn contains_aabb(&self, other: &Aabb<T>) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && other.max[i] <= self.max[i])
    }

    /// Slab test: returns the entry distance along `ray`, or
    /// `BaseFloat::NO_HIT` when the box is missed, lies behind the origin,
    /// or starts beyond the ray's current closest hit.
    pub fn intersect(&self, ray: &Ray<T>) -> T {
        let tx1 = (self.min[0] - ray.origin[0]) * ray.r_dir[0];
        let tx2 = (self.max[0] - ray.origin[0]) * ray.r_dir[0];
        let mut tmin = T::min(tx1, tx2);
        let mut tmax = T::max(tx1, tx2);
        let ty1 = (self.min[1] - ray.origin[1]) * ray.r_dir[1];
        let ty2 = (self.max[1] - ray.origin[1]) * ray.r_dir[1];
        tmin = T::max(tmin, T::min(ty1, ty2));
        tmax = T::min(tmax, T::max(ty1, ty2));
        let tz1 = (self.min[2] - ray.origin[2]) * ray.r_dir[2];
        let tz2 = (self.max[2] - ray.origin[2]) * ray.r_dir[2];
        tmin = T::max(tmin, T::min(tz1, tz2));
        tmax = T::min(tmax, T::max(tz1, tz2));
        if tmax >= tmin && tmin < ray.hit.t && tmax > T::zero() {
            tmin
        } else {
            T::NO_HIT
        }
    }

    /// 4-wide variant of the slab test: the box corners and ray are padded
    /// into 4-lane vectors with the fourth lane zeroed, and only the first
    /// three lanes take part in the reductions. Numerically equivalent to
    /// `intersect` on finite inputs.
    pub fn intersect_wide(&self, ray: &Ray<T>) -> T {
        let bmin = Vector4::new(self.min[0], self.min[1], self.min[2], T::zero());
        let bmax = Vector4::new(self.max[0], self.max[1], self.max[2], T::zero());
        let o = Vector4::new(ray.origin[0], ray.origin[1], ray.origin[2], T::zero());
        let rd = Vector4::new(ray.r_dir[0], ray.r_dir[1], ray.r_dir[2], T::zero());
        let t1 = (bmin - o).component_mul(&rd);
        let t2 = (bmax - o).component_mul(&rd);
        let tmin = T::max(
            T::min(t1[0], t2[0]),
            T::max(T::min(t1[1], t2[1]), T::min(t1[2], t2[2])),
        );
        let tmax = T::min(
            T::max(t1[0], t2[0]),
            T::min(T::max(t1[1], t2[1]), T::max(t1[2], t2[2])),
        );
        if tmax >= tmin && tmin < ray.hit.t && tmax > T::zero() {
            tmin
        } else {
            T::NO_HIT
        }
    }
}
