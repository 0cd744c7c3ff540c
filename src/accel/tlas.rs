use std::mem;
use crate::accel::aabb::Aabb;
use crate::accel::instance::BlasInstance;
use crate::accel::TRAVERSAL_STACK;
use crate::geom::ray::{Ray, RayCounter};
use crate::helper::BaseFloat;

/// One node of the top-level hierarchy. Child indices are packed into
/// `left_right` as two 16-bit halves; 0 marks a leaf (node 0 is always the
/// root, so no child can legally live there). Leaves address an instance
/// through `instance`.
#[derive(Clone, Debug)]
pub struct TlasNode<T> {
    aabb: Aabb<T>,
    left_right: u32,
    instance: u32,
}

impl<T> TlasNode<T>
where T: BaseFloat {
    fn new() -> Self {
        TlasNode {
            aabb: Aabb::new(),
            left_right: 0,
            instance: 0,
        }
    }

    /// Returns true, only if the node is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.left_right == 0
    }

    pub fn left_child(&self) -> usize {
        (self.left_right >> 16) as usize
    }

    pub fn right_child(&self) -> usize {
        (self.left_right & 0xffff) as usize
    }

    pub fn instance(&self) -> usize {
        self.instance as usize
    }

    pub fn aabb(&self) -> &Aabb<T> {
        &self.aabb
    }
}


/// Top-level acceleration structure over BLAS instances. Cheap enough to
/// rebuild every frame after the instance transforms move.
pub struct Tlas<T> {
    nodes: Vec<TlasNode<T>>,
    instances: Vec<BlasInstance<T>>,
}

impl<T> Tlas<T>
where T: BaseFloat {
    pub fn new(instances: Vec<BlasInstance<T>>) -> Self {
        // instance indices must survive the 12 bits of the hit identifier,
        // child slots the 16 bits of the packed node links
        debug_assert!(instances.len() < 4096);
        let cap = 2 * usize::max(1, instances.len());
        let mut nodes = Vec::with_capacity(cap);
        nodes.push(TlasNode::new());
        Tlas { nodes, instances }
    }

    pub fn nodes(&self) -> &[TlasNode<T>] {
        &self.nodes
    }

    pub fn instances(&self) -> &[BlasInstance<T>] {
        &self.instances
    }

    /// Transform updates go through here, strictly between frames.
    pub fn instances_mut(&mut self) -> &mut [BlasInstance<T>] {
        &mut self.instances
    }

    /// Rebuilds the tree bottom-up by agglomerative clustering: repeatedly
    /// join the pair of open nodes whose combined box has the smallest
    /// surface area, following the chain a → best(a) → best(best(a)) until
    /// it closes on a mutual pair. Every instance ends up in exactly one
    /// leaf and every interior box contains its children.
    pub fn build(&mut self) {
        self.nodes.clear();
        self.nodes.push(TlasNode::new());
        if self.instances.is_empty() {
            return;
        }

        // one leaf per instance, all of them open for clustering
        let mut node_idx: Vec<usize> = Vec::with_capacity(self.instances.len());
        let mut open = self.instances.len();
        for (i, instance) in self.instances.iter().enumerate() {
            node_idx.push(self.nodes.len());
            self.nodes.push(TlasNode {
                aabb: *instance.bounds(),
                left_right: 0,
                instance: i as u32,
            });
        }

        let mut a = 0usize;
        if open > 1 {
            let mut b = self.find_best_match(&node_idx, open, a);
            while open > 1 {
                let c = self.find_best_match(&node_idx, open, b);
                if a == c {
                    let node_idx_a = node_idx[a];
                    let node_idx_b = node_idx[b];
                    let mut aabb = Aabb::new();
                    aabb.adjust(&self.nodes[node_idx_a].aabb, &self.nodes[node_idx_b].aabb);

                    node_idx[a] = self.nodes.len();
                    node_idx[b] = node_idx[open - 1];
                    self.nodes.push(TlasNode {
                        aabb,
                        left_right: ((node_idx_a as u32) << 16) | node_idx_b as u32,
                        instance: 0,
                    });

                    open -= 1;
                    if open == 1 {
                        break;
                    }
                    b = self.find_best_match(&node_idx, open, a);
                } else {
                    a = b;
                    b = c;
                }
            }
        }
        self.nodes[0] = self.nodes[node_idx[a]].clone();
    }

    /// Finds the cheapest clustering partner for `list[a]` among the first
    /// `n` open entries: the one minimizing the surface area of the joined
    /// box. Callers guarantee `n > 1`.
    fn find_best_match(&self, list: &[usize], n: usize, a: usize) -> usize {
        let mut smallest = T::MAX;
        let mut best_b = a;
        for b in 0..n {
            if b == a {
                continue;
            }
            let mut joined = self.nodes[list[a]].aabb;
            joined.grow_aabb(&self.nodes[list[b]].aabb);
            let area = joined.area();
            if area < smallest {
                smallest = area;
                best_b = b;
            }
        }
        best_b
    }

    /// Same traversal shape as the BLAS, but leaves hand the ray to the
    /// referenced instance, which does its own frame change. The TLAS never
    /// transforms rays itself.
    pub fn intersect(&self, ray: &mut Ray<T>, counter: &mut RayCounter) {
        if self.instances.is_empty() {
            return;
        }
        let mut node = &self.nodes[0];
        let mut stack = [node; TRAVERSAL_STACK];
        let mut stack_ptr = 0usize;

        loop {
            counter.traversals += 1;
            if node.is_leaf() {
                self.instances[node.instance()].intersect(ray, counter);
                if stack_ptr == 0 {
                    break;
                }
                stack_ptr -= 1;
                node = stack[stack_ptr];
                continue;
            }

            let mut child1 = &self.nodes[node.left_child()];
            let mut child2 = &self.nodes[node.right_child()];
            counter.box_tests += 2;
            let mut dist1 = child1.aabb.intersect(ray);
            let mut dist2 = child2.aabb.intersect(ray);
            if dist1 > dist2 {
                mem::swap(&mut dist1, &mut dist2);
                mem::swap(&mut child1, &mut child2);
            }
            if dist1 == T::NO_HIT {
                if stack_ptr == 0 {
                    break;
                }
                stack_ptr -= 1;
                node = stack[stack_ptr];
            } else {
                node = child1;
                if dist2 != T::NO_HIT {
                    stack[stack_ptr] = child2;
                    stack_ptr += 1;
                }
            }
        }
    }
}
