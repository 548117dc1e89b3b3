//! Scene-level BVH over transformed shapes.
//!
//! The scene tree's primitives are shape trees paired with an affine
//! transform and its cached inverse. Rays and query points are re-framed
//! through the inverse at scene leaves, so shape trees stay fixed in
//! their local space and a refit only touches scene-node bounds.

use log::{debug, trace};

use canopy_core::{intersect, Aabb, Affine3, ElemUv, Elements, Ray3, Vec3};

use crate::builder::{build_nodes, BoundPrim, Heuristic};
use crate::error::{BvhError, Result};
use crate::node::{collect_stats, BvhNode, TreeStats, PAIR_STACK_DEPTH, RAY_STACK_DEPTH};
use crate::shape::ShapeBvh;

/// Result of a closest-intersection query against a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneRayHit {
    /// Ray parameter at the hit, in units of the direction length.
    pub t: f32,
    /// Index of the hit shape.
    pub shape: usize,
    /// Index of the hit element within the shape.
    pub element: usize,
    /// Element-local coordinates of the hit.
    pub uv: ElemUv,
}

/// Result of a nearest-element query against a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNearestHit {
    /// Unsigned distance to the closest element surface point.
    pub dist: f32,
    /// Index of the shape holding the closest element.
    pub shape: usize,
    /// Index of the closest element within the shape.
    pub element: usize,
    /// Element-local coordinates of the closest point.
    pub uv: ElemUv,
}

/// Two-level BVH over a collection of transformed shapes.
///
/// Created with a fixed number of shape slots; every slot must be filled
/// with [`set_shape`](Self::set_shape) before [`build`](Self::build).
/// The scene owns its shape trees and transform arrays.
pub struct SceneBvh<'a> {
    shapes: Vec<Option<ShapeBvh<'a>>>,
    xforms: Vec<Affine3>,
    inv_xforms: Vec<Affine3>,
    heuristic: Heuristic,
    nodes: Vec<BvhNode>,
    sorted_prim: Vec<u32>,
}

impl<'a> SceneBvh<'a> {
    /// Create a scene with `nshapes` empty slots.
    pub fn new(nshapes: usize, heuristic: Heuristic) -> Self {
        Self {
            shapes: (0..nshapes).map(|_| None).collect(),
            xforms: vec![Affine3::IDENTITY; nshapes],
            inv_xforms: vec![Affine3::IDENTITY; nshapes],
            heuristic,
            nodes: Vec::new(),
            sorted_prim: Vec::new(),
        }
    }

    /// Number of shape slots.
    #[inline]
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// The shape in slot `sid`, if it has been set.
    #[inline]
    pub fn shape(&self, sid: usize) -> Option<&ShapeBvh<'a>> {
        self.shapes.get(sid).and_then(|slot| slot.as_ref())
    }

    /// The forward transform of slot `sid`.
    #[inline]
    pub fn transform(&self, sid: usize) -> Option<&Affine3> {
        self.xforms.get(sid)
    }

    /// The scene node arena. Empty until built.
    #[inline]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// The sorted shape permutation referenced by scene leaf ranges.
    #[inline]
    pub fn sorted_prims(&self) -> &[u32] {
        &self.sorted_prim
    }

    /// Aggregate statistics of the scene-level tree.
    pub fn stats(&self) -> TreeStats {
        collect_stats(&self.nodes)
    }

    /// Fill slot `sid` with shape data, replacing any previous shape.
    ///
    /// Validates the shape buffers and inverts the transform; the
    /// inverse stays cached alongside the forward transform.
    ///
    /// # Errors
    /// * `ShapeOutOfBounds` if `sid` has no slot
    /// * `SingularTransform` if the transform cannot be inverted
    /// * any shape-buffer validation error from [`ShapeBvh::new`]
    pub fn set_shape(
        &mut self,
        sid: usize,
        xform: Affine3,
        elements: Elements<'a>,
        positions: &'a [Vec3],
        radii: Option<&'a [f32]>,
    ) -> Result<()> {
        if sid >= self.shapes.len() {
            return Err(BvhError::ShapeOutOfBounds {
                shape: sid,
                count: self.shapes.len(),
            });
        }
        let inv = xform
            .inverse()
            .ok_or(BvhError::SingularTransform { shape: sid })?;
        self.shapes[sid] = Some(ShapeBvh::new(elements, positions, radii, self.heuristic)?);
        self.xforms[sid] = xform;
        self.inv_xforms[sid] = inv;
        Ok(())
    }

    /// Build every shape tree, then the scene tree over their transformed
    /// bounds. Idempotent; subsequent builds overwrite.
    ///
    /// With the `parallel` feature the independent shape builds run on
    /// the rayon thread pool.
    ///
    /// # Errors
    /// `ShapeNotSet` if any slot was never filled.
    pub fn build(&mut self) -> Result<()> {
        for (sid, slot) in self.shapes.iter().enumerate() {
            if slot.is_none() {
                return Err(BvhError::ShapeNotSet { shape: sid });
            }
        }

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;
            self.shapes.par_iter_mut().for_each(|slot| {
                if let Some(shape) = slot {
                    shape.build();
                }
            });
        }
        #[cfg(not(feature = "parallel"))]
        for slot in self.shapes.iter_mut() {
            if let Some(shape) = slot {
                shape.build();
            }
        }

        let mut prims: Vec<BoundPrim> = (0..self.shapes.len())
            .map(|sid| BoundPrim::new(self.world_bounds(sid), sid as u32))
            .collect();
        self.nodes = build_nodes(&mut prims, self.heuristic);
        self.sorted_prim = prims.iter().map(|prim| prim.pid).collect();

        debug!(
            "scene bvh built: {} shapes, {} nodes",
            self.shapes.len(),
            self.nodes.len()
        );
        Ok(())
    }

    /// Replace all transforms and recompute scene-node bounds bottom-up.
    ///
    /// The tree topology and sorted permutation stay frozen; only node
    /// bounds and the cached inverses change. Children live at higher
    /// arena indices than their parent, so a reverse index sweep visits
    /// every child before its parent.
    ///
    /// # Errors
    /// * `TransformCountMismatch` if the slice length differs from the
    ///   slot count
    /// * `SingularTransform` if any transform cannot be inverted
    pub fn refit(&mut self, xforms: &[Affine3]) -> Result<()> {
        if xforms.len() != self.xforms.len() {
            return Err(BvhError::TransformCountMismatch {
                expected: self.xforms.len(),
                got: xforms.len(),
            });
        }
        for (sid, xform) in xforms.iter().enumerate() {
            let inv = xform
                .inverse()
                .ok_or(BvhError::SingularTransform { shape: sid })?;
            self.xforms[sid] = *xform;
            self.inv_xforms[sid] = inv;
        }

        for idx in (0..self.nodes.len()).rev() {
            let node = self.nodes[idx];
            let mut bbox = Aabb::empty();
            if node.is_leaf {
                for i in 0..node.count as usize {
                    let sid = self.sorted_prim[node.start as usize + i] as usize;
                    bbox = bbox.union(&self.world_bounds(sid));
                }
            } else {
                for i in 0..node.count as usize {
                    bbox = bbox.union(&self.nodes[node.start as usize + i].bbox);
                }
            }
            self.nodes[idx].bbox = bbox;
        }

        trace!("scene bvh refit: {} shapes", self.shapes.len());
        Ok(())
    }

    /// Closest ray intersection across all shapes.
    pub fn intersect(&self, ray: &Ray3) -> Option<SceneRayHit> {
        self.intersect_scene(ray, false)
    }

    /// Whether the ray hits anything, exiting at the first hit found.
    pub fn hit(&self, ray: &Ray3) -> bool {
        self.intersect_scene(ray, true).is_some()
    }

    /// Closest element within `max_dist` of a world-space point.
    ///
    /// With `shape` set the query is restricted to that shape: the scene
    /// walk is bypassed and the point is pre-transformed into the shape's
    /// frame. An out-of-range or unset shape id reports no hit.
    pub fn neighbor(
        &self,
        pt: Vec3,
        max_dist: f32,
        shape: Option<usize>,
    ) -> Option<SceneNearestHit> {
        if let Some(sid) = shape {
            let shape_bvh = self.shapes.get(sid)?.as_ref()?;
            let local = self.inv_xforms[sid].transform_point(pt);
            return shape_bvh.neighbor_local(local, max_dist).map(|hit| {
                SceneNearestHit {
                    dist: hit.dist,
                    shape: sid,
                    element: hit.element,
                    uv: hit.uv,
                }
            });
        }

        if self.nodes.is_empty() {
            return None;
        }

        let mut stack = [0u32; RAY_STACK_DEPTH];
        let mut top = 0;
        stack[top] = 0;
        top += 1;

        let mut dist_max = max_dist;
        let mut best: Option<SceneNearestHit> = None;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];

            if node.bbox.distance_squared(pt) >= dist_max * dist_max {
                continue;
            }

            if node.is_leaf {
                for i in 0..node.count as usize {
                    let sid = self.sorted_prim[node.start as usize + i] as usize;
                    let Some(shape_bvh) = self.shapes[sid].as_ref() else {
                        continue;
                    };
                    let local = self.inv_xforms[sid].transform_point(pt);
                    if let Some(hit) = shape_bvh.neighbor_local(local, dist_max) {
                        dist_max = hit.dist;
                        best = Some(SceneNearestHit {
                            dist: hit.dist,
                            shape: sid,
                            element: hit.element,
                            uv: hit.uv,
                        });
                    }
                }
            } else {
                for i in 0..node.count as usize {
                    debug_assert!(top < RAY_STACK_DEPTH);
                    stack[top] = node.start + i as u32;
                    top += 1;
                }
            }
        }

        best
    }

    /// Report all shape pairs whose world-space bounds overlap.
    ///
    /// Walks pairs of scene nodes with a dual stack; at leaf/leaf pairs
    /// each shape's root bounds are transformed to world space and tested
    /// directly. Every overlap is reported twice, as `(i, j)` and
    /// `(j, i)`; with `exclude_self` the `(i, i)` pairs are dropped.
    /// Returns the number of reported pairs.
    pub fn overlap_shape_bounds<F>(&self, exclude_self: bool, mut overlap: F) -> usize
    where
        F: FnMut(usize, usize),
    {
        if self.nodes.is_empty() {
            return 0;
        }

        let mut stack = [(0u32, 0u32); PAIR_STACK_DEPTH];
        let mut top = 0;
        stack[top] = (0, 0);
        top += 1;

        let mut hits = 0;

        while top > 0 {
            top -= 1;
            let (idx1, idx2) = stack[top];
            let node1 = &self.nodes[idx1 as usize];
            let node2 = &self.nodes[idx2 as usize];

            if !node1.bbox.overlaps(&node2.bbox) {
                continue;
            }

            if node1.is_leaf && node2.is_leaf {
                for i1 in 0..node1.count as usize {
                    for i2 in 0..node2.count as usize {
                        let sid1 = self.sorted_prim[node1.start as usize + i1] as usize;
                        let sid2 = self.sorted_prim[node2.start as usize + i2] as usize;
                        if exclude_self && sid1 == sid2 {
                            continue;
                        }
                        let bbox1 = self.world_bounds(sid1);
                        let bbox2 = self.world_bounds(sid2);
                        if !bbox1.overlaps(&bbox2) {
                            continue;
                        }
                        hits += 1;
                        overlap(sid1, sid2);
                    }
                }
            } else if node1.is_leaf {
                for i in 0..node2.count as usize {
                    debug_assert!(top < PAIR_STACK_DEPTH);
                    stack[top] = (idx1, node2.start + i as u32);
                    top += 1;
                }
            } else {
                for i in 0..node1.count as usize {
                    debug_assert!(top < PAIR_STACK_DEPTH);
                    stack[top] = (node1.start + i as u32, idx2);
                    top += 1;
                }
            }
        }

        hits
    }

    /// Collecting form of [`overlap_shape_bounds`](Self::overlap_shape_bounds):
    /// clears `out` and appends every reported pair.
    pub fn overlap_shape_bounds_vec(
        &self,
        exclude_self: bool,
        out: &mut Vec<(usize, usize)>,
    ) -> usize {
        out.clear();
        self.overlap_shape_bounds(exclude_self, |sid1, sid2| out.push((sid1, sid2)))
    }

    /// World-space bounds of one shape: its root bbox pushed through the
    /// forward transform as an 8-corner envelope.
    fn world_bounds(&self, sid: usize) -> Aabb {
        match &self.shapes[sid] {
            Some(shape) => shape.local_bounds().transformed(&self.xforms[sid]),
            None => Aabb::empty(),
        }
    }

    /// Stack-based scene ray walk; shape leaves re-frame the ray through
    /// the cached inverse and continue in the shape tree. The parametric
    /// window carries across frames because affine maps preserve the ray
    /// parameter.
    fn intersect_scene(&self, ray: &Ray3, early_exit: bool) -> Option<SceneRayHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut stack = [0u32; RAY_STACK_DEPTH];
        let mut top = 0;
        stack[top] = 0;
        top += 1;

        let mut ray = *ray;
        let mut best: Option<SceneRayHit> = None;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];

            if !intersect::ray_aabb(&ray, &node.bbox) {
                continue;
            }

            if node.is_leaf {
                for i in 0..node.count as usize {
                    let sid = self.sorted_prim[node.start as usize + i] as usize;
                    let Some(shape_bvh) = self.shapes[sid].as_ref() else {
                        continue;
                    };
                    let inv = &self.inv_xforms[sid];
                    let local = Ray3::segment(
                        inv.transform_point(ray.origin),
                        inv.transform_vector(ray.dir),
                        ray.tmin,
                        ray.tmax,
                    );
                    if let Some(hit) = shape_bvh.intersect_local(&local, early_exit) {
                        ray.tmax = hit.t;
                        best = Some(SceneRayHit {
                            t: hit.t,
                            shape: sid,
                            element: hit.element,
                            uv: hit.uv,
                        });
                    }
                }
                if early_exit && best.is_some() {
                    break;
                }
            } else {
                let first = node.start as usize;
                let count = node.count as usize;
                if ray.dir.axis(node.axis as usize) >= 0.0 {
                    for i in (0..count).rev() {
                        debug_assert!(top < RAY_STACK_DEPTH);
                        stack[top] = (first + i) as u32;
                        top += 1;
                    }
                } else {
                    for i in 0..count {
                        debug_assert!(top < RAY_STACK_DEPTH);
                        stack[top] = (first + i) as u32;
                        top += 1;
                    }
                }
            }
        }

        best
    }
}
