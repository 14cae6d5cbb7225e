//! octree_stream - Engine independent streaming octree LOD
//!
//! This crate streams large meshes and point clouds as an octree of node
//! files. Each node file is a versioned columnar record of the node's own
//! geometry plus a descriptor for every child, so the tree is discovered as it
//! is downloaded.
//!
//! # Features
//!
//! - **Node format**: zero-copy decode of three format versions (LTS,
//!   Previous, Current) into a borrowed columnar `Schema`
//! - **Geometry builder**: interleaved vertex buffers, per-octant draw ranges
//!   and per-object ranges, with object filtering
//! - **Highlight table**: per-object bytes shared with the decode threads
//!   under a spin / blocking / async mutex
//! - **Abortable downloads**: streaming fetch into a pre-sized buffer from
//!   memory, files or HTTP (feature `http`)
//! - **Worker pipeline**: downloads on a tokio runtime, decodes on rayon
//! - **LOD octree**: frustum culling, projected-size split decisions and a
//!   request budget, rendering through a `RenderBackend`
//!
//! # Example
//!
//! ```ignore
//! use octree_stream::{OctreeIndex, SceneDescriptor, StreamConfig};
//!
//! let scene = SceneDescriptor::new("https://cdn.example.com/model", root, FormatVersion::Current);
//! let source = Arc::new(HttpSource::new("https://cdn.example.com/")?);
//! let mut index = OctreeIndex::new(StreamConfig::default(), backend, source, scene)?;
//!
//! // Each frame
//! let frame = index.update(&camera);
//! for item in &frame.items {
//!     renderer.draw(&item.handle, item.sub_mesh, &item.draw_ranges);
//! }
//! ```

pub mod types;

// Re-export commonly used items
pub use types::{NodeData, PrimitiveType, VertexAttributes, FULL_CHILD_MASK, OCTANT_COUNT};

// Versioned columnar node format
pub mod format;
pub use format::{DecodeError, FormatVersion, NodeBuffer, Schema, SchemaDecoder};

// Renderer-ready geometry from a decoded node
pub mod geometry;
pub use geometry::{get_children, get_geometry, NodeGeometry, SubMesh};

// Shared per-object highlight bytes
pub mod highlight;
pub use highlight::{HighlightMutex, HighlightTable};

// Cancellable node downloads
pub mod download;
pub use download::{ByteSource, DownloadError, Downloader, FileSource, MemorySource};
#[cfg(feature = "http")]
pub use download::HttpSource;

// Background download + decode worker
pub mod pipeline;
pub use pipeline::{decode_node, DecodeOptions, PipelineError, RequestId, Worker, WorkerRequest, WorkerResponse};

// LOD octree
pub mod octree;
pub use octree::{Camera, FrameOutput, OctreeIndex, OctreeNode, RenderBackend, SceneDescriptor};

pub mod config;
pub use config::StreamConfig;

// Engine-agnostic metrics (feature `metrics`)
pub mod metrics;

#[cfg(test)]
pub mod test_utils;
