//! Top-down BVH construction shared by the shape and scene levels.
//!
//! The builder consumes an array of bound primitives (bounding box,
//! center, primitive id), splits it recursively with the selected
//! heuristic, and emits a flat node arena. Child nodes always land at
//! higher arena indices than their parent, which the scene refit relies
//! on for its bottom-up sweep.

use core::cmp::Ordering;

use canopy_core::{Aabb, Vec3};

use crate::node::{BvhNode, MIN_PRIMS};

/// Split-selection heuristic used during construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Heuristic {
    /// The default strategy: surface area heuristic.
    #[default]
    Default = 0,
    /// Balanced tree: split the longest centroid axis at the median.
    EqualCount = 1,
    /// Surface area heuristic via linear sweeps.
    Sah = 2,
}

/// A primitive prepared for construction: bounds, center, and id, plus
/// two scratch floats for the SAH sweeps.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BoundPrim {
    pub bbox: Aabb,
    pub center: Vec3,
    pub pid: u32,
    sah_cost_left: f32,
    sah_cost_right: f32,
}

impl BoundPrim {
    pub fn new(bbox: Aabb, pid: u32) -> Self {
        Self {
            bbox,
            center: bbox.centroid(),
            pid,
            sah_cost_left: 0.0,
            sah_cost_right: 0.0,
        }
    }
}

/// Build a node arena over the given primitives, sorting them in place.
///
/// Nodes are over-allocated at two per primitive and shrunk to the emitted
/// count afterwards. On return the primitive order matches the leaf
/// ranges; callers extract `sorted_prim` from the `pid` fields.
pub(crate) fn build_nodes(prims: &mut [BoundPrim], heuristic: Heuristic) -> Vec<BvhNode> {
    let mut nodes = vec![BvhNode::default(); (prims.len() * 2).max(1)];
    let mut nnodes = 1;
    make_node(0, &mut nnodes, &mut nodes, prims, 0, prims.len(), heuristic);
    nodes.truncate(nnodes);
    nodes.shrink_to_fit();
    nodes
}

/// Sort a primitive range by bbox center along an axis.
fn sort_prims(prims: &mut [BoundPrim], axis: usize) {
    prims.sort_unstable_by(|a, b| {
        a.center
            .axis(axis)
            .partial_cmp(&b.center.axis(axis))
            .unwrap_or(Ordering::Equal)
    });
}

/// Choose the split axis and position for `prims[start..end]`.
///
/// Equal-count splits the longest axis of the centroid bounds at the
/// median. SAH sorts along each axis in turn and sweeps prefix and suffix
/// half-areas into the primitives' scratch fields, so the cost of every
/// candidate split is `sah_cost_left[i-1] + sah_cost_right[i]`; candidates
/// range over `[start+2, end-2]`, which keeps both children at two
/// primitives or more. Ties resolve to the first axis, then the first
/// position, encountered.
fn split_axis(
    prims: &mut [BoundPrim],
    start: usize,
    end: usize,
    heuristic: Heuristic,
) -> (usize, usize) {
    match heuristic {
        Heuristic::EqualCount => {
            let mut centers = Aabb::empty();
            for prim in &prims[start..end] {
                centers.expand(prim.center);
            }
            (centers.longest_axis(), (start + end) / 2)
        }
        Heuristic::Default | Heuristic::Sah => {
            let count = end - start;
            let mut min_cost = f32::INFINITY;
            let mut best_axis = 0;
            let mut best_mid = (start + end) / 2;
            for axis in 0..3 {
                sort_prims(&mut prims[start..end], axis);

                let mut sweep = Aabb::empty();
                for i in 0..count {
                    sweep = sweep.union(&prims[start + i].bbox);
                    prims[start + i].sah_cost_left = sweep.half_area() * (i + 1) as f32;
                }
                sweep = Aabb::empty();
                for i in 0..count {
                    sweep = sweep.union(&prims[end - 1 - i].bbox);
                    prims[end - 1 - i].sah_cost_right = sweep.half_area() * (i + 1) as f32;
                }

                for mid in start + 2..=end - 2 {
                    let cost = prims[mid - 1].sah_cost_left + prims[mid].sah_cost_right;
                    if min_cost > cost {
                        min_cost = cost;
                        best_axis = axis;
                        best_mid = mid;
                    }
                }
            }
            (best_axis, best_mid)
        }
    }
}

/// Emit the node covering `prims[start..end]`, splitting it recursively
/// or finishing it as a leaf.
fn make_node(
    node_idx: usize,
    nnodes: &mut usize,
    nodes: &mut [BvhNode],
    prims: &mut [BoundPrim],
    start: usize,
    end: usize,
    heuristic: Heuristic,
) {
    let mut bbox = Aabb::empty();
    for prim in &prims[start..end] {
        bbox = bbox.union(&prim.bbox);
    }

    if end - start <= MIN_PRIMS {
        nodes[node_idx] = BvhNode {
            bbox,
            start: start as u32,
            count: (end - start) as u16,
            is_leaf: true,
            axis: 0,
        };
    } else {
        let (axis, mid) = split_axis(prims, start, end, heuristic);
        sort_prims(&mut prims[start..end], axis);

        let child = *nnodes;
        *nnodes += 2;
        nodes[node_idx] = BvhNode {
            bbox,
            start: child as u32,
            count: 2,
            is_leaf: false,
            axis: axis as u8,
        };
        make_node(child, nnodes, nodes, prims, start, mid, heuristic);
        make_node(child + 1, nnodes, nodes, prims, mid, end, heuristic);
    }
}
