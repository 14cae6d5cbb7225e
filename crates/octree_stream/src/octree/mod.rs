//! Streaming LOD octree.
//!
//! The tree is explicit: every [`OctreeNode`] owns its children, which come
//! into existence when the node's file has been decoded. Nodes start
//! collapsed and are split when their projected size on screen exceeds the
//! [`LodProfile`] threshold.
//!
//! ```text
//! projected size = 2^tolerance * tolerance_scale * clip_scale / max(distance - radius, min_distance)
//! ```
//!
//! (orthographic cameras drop the distance term).
//!
//! # Module Structure
//!
//! - [`bounds`]: `DAabb3` and `BoundingSphere` in world space (f64)
//! - [`frustum`]: `Frustum`, `Camera` and `Visibility`
//! - [`config`]: `LodProfile` thresholds and the `FailurePolicy`
//! - [`budget`]: `RequestBudget` rate limiting and per-frame `FrameStats`
//! - [`node`]: `OctreeNode` and its load state machine
//! - [`index`]: `OctreeIndex`, which owns the root and drives frames

pub mod bounds;
pub mod budget;
pub mod config;
pub mod frustum;
pub mod index;
pub mod node;

// Re-exports
pub use bounds::{BoundingSphere, DAabb3};
pub use budget::{FrameStats, RequestBudget};
pub use config::{FailurePolicy, LodProfile};
pub use frustum::{Camera, Frustum, Projection, Visibility};
pub use index::{FrameOutput, OctreeIndex, RenderBackend, SceneDescriptor};
pub use node::{NodeMesh, NodePath, NodeState, OctreeNode, RenderItem};
