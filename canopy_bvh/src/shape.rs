//! Single-shape BVH over one indexed mesh.
//!
//! A shape tree covers one primitive kind and borrows its vertex data;
//! the buffers must outlive the tree and stay untouched while queries
//! run. Shape trees are usable standalone for a single untransformed
//! mesh, or nested under a [`SceneBvh`](crate::scene::SceneBvh).

use log::debug;

use canopy_core::{distance, intersect, Aabb, ElemUv, ElementKind, Elements, Ray3, Vec3};

use crate::builder::{build_nodes, BoundPrim, Heuristic};
use crate::error::{BvhError, Result};
use crate::node::{collect_stats, BvhNode, TreeStats, RAY_STACK_DEPTH};

/// Result of a closest-intersection query against a single shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Ray parameter at the hit, in units of the direction length.
    pub t: f32,
    /// Index of the hit element.
    pub element: usize,
    /// Element-local coordinates of the hit.
    pub uv: ElemUv,
}

/// Result of a nearest-element query against a single shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestHit {
    /// Unsigned distance to the closest element surface point.
    pub dist: f32,
    /// Index of the closest element.
    pub element: usize,
    /// Element-local coordinates of the closest point.
    pub uv: ElemUv,
}

/// BVH over a single indexed mesh of one primitive kind.
///
/// Owns its node arena and sorted primitive permutation; borrows the
/// element, position, and radius buffers.
pub struct ShapeBvh<'a> {
    elements: Elements<'a>,
    positions: &'a [Vec3],
    radii: Option<&'a [f32]>,
    heuristic: Heuristic,
    nodes: Vec<BvhNode>,
    sorted_prim: Vec<u32>,
}

impl<'a> ShapeBvh<'a> {
    /// Register a shape and validate its buffers.
    ///
    /// The tree is empty until [`build`](Self::build) runs.
    ///
    /// # Errors
    /// * `MissingLineRadius` for line shapes without radii
    /// * `RadiusCountMismatch` if the radius buffer length differs from
    ///   the vertex count
    /// * `VertexIndexOutOfBounds` if any element references a vertex
    ///   outside the position buffer
    pub fn new(
        elements: Elements<'a>,
        positions: &'a [Vec3],
        radii: Option<&'a [f32]>,
        heuristic: Heuristic,
    ) -> Result<Self> {
        if let Some(radii) = radii {
            if radii.len() != positions.len() {
                return Err(BvhError::RadiusCountMismatch {
                    expected: positions.len(),
                    got: radii.len(),
                });
            }
        }
        if matches!(elements, Elements::Lines(_)) && radii.is_none() {
            return Err(BvhError::MissingLineRadius);
        }
        if let Some(index) = elements.max_vertex_index() {
            if index as usize >= positions.len() {
                return Err(BvhError::VertexIndexOutOfBounds {
                    index,
                    verts: positions.len(),
                });
            }
        }

        Ok(Self {
            elements,
            positions,
            radii,
            heuristic,
            nodes: Vec::new(),
            sorted_prim: Vec::new(),
        })
    }

    /// Build (or rebuild) the tree over the current vertex data.
    ///
    /// Point and line bounds are inflated by their vertex radii; triangle
    /// bounds cover the three vertices.
    pub fn build(&mut self) {
        let mut prims: Vec<BoundPrim> = Vec::with_capacity(self.elements.len());
        match self.elements {
            Elements::Points(ids) => {
                for (pid, &f) in ids.iter().enumerate() {
                    let r = Vec3::splat(self.radius(f));
                    let p = self.positions[f as usize];
                    let mut bbox = Aabb::empty();
                    bbox.expand(p - r);
                    bbox.expand(p + r);
                    prims.push(BoundPrim::new(bbox, pid as u32));
                }
            }
            Elements::Lines(segs) => {
                for (pid, &[a, b]) in segs.iter().enumerate() {
                    let ra = Vec3::splat(self.radius(a));
                    let rb = Vec3::splat(self.radius(b));
                    let pa = self.positions[a as usize];
                    let pb = self.positions[b as usize];
                    let mut bbox = Aabb::empty();
                    bbox.expand(pa - ra);
                    bbox.expand(pa + ra);
                    bbox.expand(pb - rb);
                    bbox.expand(pb + rb);
                    prims.push(BoundPrim::new(bbox, pid as u32));
                }
            }
            Elements::Triangles(tris) => {
                for (pid, &[a, b, c]) in tris.iter().enumerate() {
                    let mut bbox = Aabb::empty();
                    bbox.expand(self.positions[a as usize]);
                    bbox.expand(self.positions[b as usize]);
                    bbox.expand(self.positions[c as usize]);
                    prims.push(BoundPrim::new(bbox, pid as u32));
                }
            }
        }

        self.nodes = build_nodes(&mut prims, self.heuristic);
        self.sorted_prim = prims.iter().map(|prim| prim.pid).collect();
        debug!(
            "shape bvh built: {} {:?} elements, {} nodes",
            self.elements.len(),
            self.elements.kind(),
            self.nodes.len()
        );
    }

    /// The primitive kind this shape holds.
    #[inline]
    pub fn element_kind(&self) -> ElementKind {
        self.elements.kind()
    }

    /// Number of elements in the shape.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// The borrowed element index buffer.
    #[inline]
    pub fn elements(&self) -> &Elements<'a> {
        &self.elements
    }

    /// The borrowed vertex position buffer.
    #[inline]
    pub fn positions(&self) -> &'a [Vec3] {
        self.positions
    }

    /// The node arena. Empty until built.
    #[inline]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// The sorted primitive permutation referenced by leaf ranges.
    #[inline]
    pub fn sorted_prims(&self) -> &[u32] {
        &self.sorted_prim
    }

    /// Bounding box of the whole shape in its local frame.
    #[inline]
    pub fn local_bounds(&self) -> Aabb {
        match self.nodes.first() {
            Some(root) => root.bbox,
            None => Aabb::empty(),
        }
    }

    /// Aggregate tree statistics.
    pub fn stats(&self) -> TreeStats {
        collect_stats(&self.nodes)
    }

    /// Closest ray intersection in the shape's local frame.
    pub fn intersect(&self, ray: &Ray3) -> Option<RayHit> {
        self.intersect_local(ray, false)
    }

    /// Whether the ray hits anything, exiting at the first hit found.
    pub fn hit(&self, ray: &Ray3) -> bool {
        self.intersect_local(ray, true).is_some()
    }

    /// Closest element within `max_dist` of a point in the local frame.
    pub fn neighbor(&self, pt: Vec3, max_dist: f32) -> Option<NearestHit> {
        self.neighbor_local(pt, max_dist)
    }

    /// Radius of a vertex, zero when the shape carries no radii.
    #[inline]
    fn radius(&self, vid: u32) -> f32 {
        self.radii.map_or(0.0, |radii| radii[vid as usize])
    }

    /// Stack-based ray walk shared by the closest and any-hit queries.
    ///
    /// The working ray's `tmax` tightens on every accepted hit, so the
    /// node slab test prunes all farther subtrees. Internal nodes push
    /// the far child first; the near child, keyed on the ray direction
    /// sign along the split axis, pops first.
    pub(crate) fn intersect_local(&self, ray: &Ray3, early_exit: bool) -> Option<RayHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut stack = [0u32; RAY_STACK_DEPTH];
        let mut top = 0;
        stack[top] = 0;
        top += 1;

        let mut ray = *ray;
        let mut best: Option<RayHit> = None;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];

            if !intersect::ray_aabb(&ray, &node.bbox) {
                continue;
            }

            if node.is_leaf {
                for i in 0..node.count as usize {
                    let eid = self.sorted_prim[node.start as usize + i] as usize;
                    if let Some((t, uv)) = self.intersect_element(&ray, eid) {
                        ray.tmax = t;
                        best = Some(RayHit {
                            t,
                            element: eid,
                            uv,
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

    /// Stack-based nearest-element walk.
    ///
    /// Prunes with the strict point-to-box squared-distance test and
    /// tightens `dist_max` on every accepted element. Children are pushed
    /// unconditionally; no descent-order hint applies to distance queries.
    pub(crate) fn neighbor_local(&self, pt: Vec3, mut dist_max: f32) -> Option<NearestHit> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut stack = [0u32; RAY_STACK_DEPTH];
        let mut top = 0;
        stack[top] = 0;
        top += 1;

        let mut best: Option<NearestHit> = None;

        while top > 0 {
            top -= 1;
            let node = &self.nodes[stack[top] as usize];

            if node.bbox.distance_squared(pt) >= dist_max * dist_max {
                continue;
            }

            if node.is_leaf {
                for i in 0..node.count as usize {
                    let eid = self.sorted_prim[node.start as usize + i] as usize;
                    if let Some((dist, uv)) = self.distance_element(pt, dist_max, eid) {
                        dist_max = dist;
                        best = Some(NearestHit {
                            dist,
                            element: eid,
                            uv,
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

    /// Kind-appropriate ray test for one element.
    fn intersect_element(&self, ray: &Ray3, eid: usize) -> Option<(f32, ElemUv)> {
        match self.elements {
            Elements::Points(ids) => {
                let f = ids[eid];
                intersect::ray_point(ray, self.positions[f as usize], self.radius(f))
            }
            Elements::Lines(segs) => {
                let [a, b] = segs[eid];
                intersect::ray_line(
                    ray,
                    self.positions[a as usize],
                    self.positions[b as usize],
                    self.radius(a),
                    self.radius(b),
                )
            }
            Elements::Triangles(tris) => {
                let [a, b, c] = tris[eid];
                intersect::ray_triangle(
                    ray,
                    self.positions[a as usize],
                    self.positions[b as usize],
                    self.positions[c as usize],
                )
            }
        }
    }

    /// Kind-appropriate distance test for one element.
    fn distance_element(&self, pt: Vec3, dist_max: f32, eid: usize) -> Option<(f32, ElemUv)> {
        match self.elements {
            Elements::Points(ids) => {
                let f = ids[eid];
                distance::point_point(pt, dist_max, self.positions[f as usize], self.radius(f))
            }
            Elements::Lines(segs) => {
                let [a, b] = segs[eid];
                distance::point_line(
                    pt,
                    dist_max,
                    self.positions[a as usize],
                    self.positions[b as usize],
                    self.radius(a),
                    self.radius(b),
                )
            }
            Elements::Triangles(tris) => {
                let [a, b, c] = tris[eid];
                distance::point_triangle(
                    pt,
                    dist_max,
                    self.positions[a as usize],
                    self.positions[b as usize],
                    self.positions[c as usize],
                    self.radius(a),
                    self.radius(b),
                    self.radius(c),
                )
            }
        }
    }
}
