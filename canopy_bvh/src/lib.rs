//! # canopy_bvh
//!
//! Two-level bounding volume hierarchy for geometric queries against
//! indexed meshes of points, lines, and triangles.
//!
//! The crate accelerates three query kinds: closest ray intersection,
//! any-hit ray tests, and closest-element-within-radius lookups, plus a
//! conservative shape-pair overlap report over world-space bounds. Shapes
//! are indexed meshes borrowing caller-owned buffers; a scene places each
//! shape under an affine transform with a cached inverse.
//!
//! ## Quick Start
//!
//! ```ignore
//! use canopy_bvh::{Heuristic, SceneBvh};
//! use canopy_core::{Affine3, Elements, Ray3, Vec3};
//!
//! let positions = [
//!     Vec3::new(0.0, 0.0, 0.0),
//!     Vec3::new(1.0, 0.0, 0.0),
//!     Vec3::new(0.0, 1.0, 0.0),
//! ];
//! let triangles = [[0u32, 1, 2]];
//!
//! let mut scene = SceneBvh::new(1, Heuristic::Default);
//! scene.set_shape(
//!     0,
//!     Affine3::IDENTITY,
//!     Elements::Triangles(&triangles),
//!     &positions,
//!     None,
//! )?;
//! scene.build()?;
//!
//! let ray = Ray3::new(Vec3::new(0.25, 0.25, -1.0), Vec3::new(0.0, 0.0, 1.0));
//! if let Some(hit) = scene.intersect(&ray) {
//!     println!("hit shape {} element {} at t = {}", hit.shape, hit.element, hit.t);
//! }
//! ```
//!
//! ## Architecture
//!
//! Trees are flat node arenas addressed by index. The shape level covers
//! one primitive kind per tree; the scene level's leaves are shape trees
//! paired with their transforms, and queries re-frame themselves through
//! the cached inverse on the way down. All traversal is iterative over
//! fixed-size stacks, so queries allocate nothing and never block.
//!
//! Built trees are single-writer, multi-reader: `build` and `refit` must
//! not race queries, but any number of query threads may run against a
//! quiescent tree.
//!
//! ## Feature Flags
//!
//! - `parallel`: build independent shape trees on the rayon thread pool

#![warn(missing_docs)]
#![warn(clippy::all)]

mod builder;
mod error;
mod node;
mod scene;
mod shape;

pub use builder::Heuristic;
pub use error::{BvhError, Result};
pub use node::{BvhNode, TreeStats, MIN_PRIMS, PAIR_STACK_DEPTH, RAY_STACK_DEPTH};
pub use scene::{SceneBvh, SceneNearestHit, SceneRayHit};
pub use shape::{NearestHit, RayHit, ShapeBvh};
