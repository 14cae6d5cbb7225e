//! ParsePipeline - the message boundary between the foreground octree and
//! the background download/decode worker.
//!
//! ```text
//!  foreground                    worker thread               rayon pool
//! ┌─────────────┐  Load/Parse   ┌──────────────┐  bytes   ┌──────────────┐
//! │ OctreeIndex ├──────────────►│ tokio: fetch ├─────────►│ decode +     │
//! │             │  Abort/All    │ + abort      │          │ build        │
//! └──────▲──────┘               └──────────────┘          └──────┬───────┘
//!        │      Ready / Aborted / AbortedAll / Error             │
//!        └───────────────────────────────────────────────────────┘
//! ```
//!
//! Buffers and geometry move through the channels by ownership. Abort only
//! cancels downloads; a decode that has started runs to completion.

pub mod decode;
pub mod messages;
pub mod worker;

pub use decode::{decode_node, DecodedNode};
pub use messages::{
  DecodeOptions, LoadStats, NodeRequest, PipelineError, RequestId, WorkerRequest, WorkerResponse,
};
pub use worker::Worker;
