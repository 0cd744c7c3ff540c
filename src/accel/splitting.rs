use crate::accel::aabb::Aabb;
use crate::accel::blas::{Blas, BlasNode};
use crate::helper::BaseFloat;

/// SAH bin count used when nothing else is asked for.
pub const BINS: usize = 8;

/// A split candidate: plane position along an axis, plus the SAH cost of
/// cutting there.
pub struct SplitPlane<T> {
    pub axis: usize,
    pub pos: T,
    pub cost: T,
}

/// Strategy seam for the BLAS builder: given a node's triangle range, find
/// the cheapest split plane. The builder keeps the node a leaf whenever the
/// returned cost fails to beat the no-split cost strictly.
pub trait SplitStrategy<T>
where T: BaseFloat {
    fn find(blas: &Blas<T>, node: &BlasNode<T>) -> SplitPlane<T>;
}


#[derive(Clone, Copy)]
struct Bin<T> {
    bounds: Aabb<T>,
    tri_count: usize,
}

impl<T> Bin<T>
where T: BaseFloat {
    fn empty() -> Self {
        Bin {
            bounds: Aabb::new(),
            tri_count: 0,
        }
    }

    fn reset(&mut self) {
        self.bounds.reset();
        self.tri_count = 0;
    }
}

/// Binned surface-area-heuristic splitting: triangles are bucketed into
/// `NUM_BINS` bins by centroid along each axis, and only the `NUM_BINS - 1`
/// planes between adjacent bins are evaluated. Strict `<` comparison makes
/// the earliest cheapest axis/plane win, so identical input always produces
/// the identical split.
pub struct BinnedSah<const NUM_BINS: usize> {}

impl<T, const NUM_BINS: usize> SplitStrategy<T> for BinnedSah<NUM_BINS>
where T: BaseFloat {
    fn find(blas: &Blas<T>, node: &BlasNode<T>) -> SplitPlane<T> {
        debug_assert!((4..=32).contains(&NUM_BINS));

        let mut best = SplitPlane {
            axis: 0,
            pos: T::zero(),
            cost: T::MAX,
        };

        let mut bins = [Bin::<T>::empty(); NUM_BINS];
        let mut left_area = [T::zero(); NUM_BINS];
        let mut right_area = [T::zero(); NUM_BINS];
        let mut left_count = [0usize; NUM_BINS];
        let mut right_count = [0usize; NUM_BINS];

        for axis in 0..3 {
            // centroid bounds; a flat axis cannot separate anything
            let mut bounds_min = T::MAX;
            let mut bounds_max = T::MIN;
            for i in 0..node.tri_count() {
                let centroid = blas.node_tri(node, i).centroid;
                bounds_min = T::min(bounds_min, centroid[axis]);
                bounds_max = T::max(bounds_max, centroid[axis]);
            }
            if bounds_min == bounds_max {
                continue;
            }

            // populate the bins; bin bounds grow from the vertices, not the
            // centroid, so the plane costs reflect real triangle extents
            bins.iter_mut().for_each(Bin::reset);
            let scale = <T as BaseFloat>::from_usize(NUM_BINS) / (bounds_max - bounds_min);
            for i in 0..node.tri_count() {
                let tri = blas.node_tri(node, i);
                let bin_idx = usize::min(
                    NUM_BINS - 1,
                    ((tri.centroid[axis] - bounds_min) * scale).floor_to_u32() as usize,
                );
                bins[bin_idx].tri_count += 1;
                bins[bin_idx].bounds.grow(&tri.vertex0);
                bins[bin_idx].bounds.grow(&tri.vertex1);
                bins[bin_idx].bounds.grow(&tri.vertex2);
            }

            // sweep from both ends over the NUM_BINS - 1 candidate planes
            let mut left_box = Aabb::<T>::new();
            let mut right_box = Aabb::<T>::new();
            let mut left_sum = 0usize;
            let mut right_sum = 0usize;
            for i in 0..(NUM_BINS - 1) {
                left_sum += bins[i].tri_count;
                left_count[i] = left_sum;
                left_box.grow_aabb(&bins[i].bounds);
                left_area[i] = left_box.area();

                right_sum += bins[NUM_BINS - 1 - i].tri_count;
                right_count[NUM_BINS - 2 - i] = right_sum;
                right_box.grow_aabb(&bins[NUM_BINS - 1 - i].bounds);
                right_area[NUM_BINS - 2 - i] = right_box.area();
            }

            let scale = (bounds_max - bounds_min) / <T as BaseFloat>::from_usize(NUM_BINS);
            for i in 0..(NUM_BINS - 1) {
                let plane_cost = <T as BaseFloat>::from_usize(left_count[i]) * left_area[i]
                    + <T as BaseFloat>::from_usize(right_count[i]) * right_area[i];
                if plane_cost < best.cost {
                    best.axis = axis;
                    best.pos = bounds_min + scale * <T as BaseFloat>::from_usize(i + 1);
                    best.cost = plane_cost;
                }
            }
        }
        best
    }
}


#[cfg(test)]
mod test {
    use nalgebra::Vector3;
    use crate::accel::blas::Blas;
    use crate::geom::tri::Tri;
    use super::{BinnedSah, SplitStrategy, BINS};

    /// Two clusters of triangles far apart along x should split on x,
    /// somewhere in the gap.
    #[test]
    fn clusters_split_on_the_separating_axis() {
        let mut tris = Vec::new();
        for i in 0..4 {
            let base = Vector3::new(i as f32 * 0.1, 0.0, 0.0);
            tris.push(Tri::new(
                base,
                base + Vector3::new(0.1, 0.0, 0.0),
                base + Vector3::new(0.0, 0.1, 0.0),
            ));
            let base = base + Vector3::new(100.0, 0.0, 0.0);
            tris.push(Tri::new(
                base,
                base + Vector3::new(0.1, 0.0, 0.0),
                base + Vector3::new(0.0, 0.1, 0.0),
            ));
        }
        let blas = Blas::new(tris);
        let plane = BinnedSah::<BINS>::find(&blas, &blas.nodes()[0]);
        assert_eq!(plane.axis, 0);
        assert!(plane.pos > 1.0 && plane.pos < 100.0);
        assert!(plane.cost < f32::MAX);
    }

    /// The same input must produce the same plane, bit for bit.
    #[test]
    fn split_is_deterministic() {
        let tris: Vec<Tri<f32>> = (0..32)
            .map(|i| {
                let x = (i * 37 % 64) as f32;
                let y = (i * 13 % 32) as f32;
                Tri::new(
                    Vector3::new(x, y, 0.0),
                    Vector3::new(x + 1.0, y, 0.0),
                    Vector3::new(x, y + 1.0, 0.5),
                )
            })
            .collect();
        let blas_a = Blas::new(tris.clone());
        let blas_b = Blas::new(tris);
        let pa = BinnedSah::<BINS>::find(&blas_a, &blas_a.nodes()[0]);
        let pb = BinnedSah::<BINS>::find(&blas_b, &blas_b.nodes()[0]);
        assert_eq!(pa.axis, pb.axis);
        assert_eq!(pa.pos, pb.pos);
        assert_eq!(pa.cost, pb.cost);
    }
}
