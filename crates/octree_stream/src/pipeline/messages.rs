//! Worker protocol: requests from the foreground, responses from the worker.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::download::{ByteSource, DownloadError};
use crate::format::{DecodeError, FormatVersion, NodeBuffer};
use crate::geometry::NodeGeometry;
use crate::highlight::HighlightTable;
use crate::types::NodeData;

/// Caller-chosen id correlating a request with its response. Not reused
/// while the request is outstanding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Object-level filtering applied while decoding.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
  /// Object ids left out of the build.
  pub hidden_objects: Vec<u32>,
  /// Also leave out objects whose highlight byte is `FILTERED`.
  pub filter_highlighted: bool,
}

impl Default for DecodeOptions {
  fn default() -> Self {
    Self {
      hidden_objects: Vec::new(),
      filter_highlighted: true,
    }
  }
}

impl DecodeOptions {
  /// Options hiding `ids`, kept sorted for lookup.
  pub fn hiding(ids: impl IntoIterator<Item = u32>) -> Self {
    let mut hidden_objects: Vec<u32> = ids.into_iter().collect();
    hidden_objects.sort_unstable();
    hidden_objects.dedup();
    Self {
      hidden_objects,
      ..Self::default()
    }
  }

  pub fn is_hidden(&self, object_id: u32) -> bool {
    self.hidden_objects.binary_search(&object_id).is_ok()
  }
}

/// Which node a load or parse is for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRequest {
  /// Id of the node being decoded, prefix of its legacy child ids.
  pub node_id: String,
  pub version: FormatVersion,
  pub options: Arc<DecodeOptions>,
}

/// Foreground to worker.
pub enum WorkerRequest {
  /// Supply the shared highlight table and the byte source.
  Init {
    highlights: Arc<HighlightTable>,
    source: Arc<dyn ByteSource>,
  },
  /// Download and decode one node file.
  Load {
    id: RequestId,
    url: String,
    byte_size: u32,
    node: NodeRequest,
  },
  /// Decode bytes the foreground already holds.
  Parse {
    id: RequestId,
    buffer: NodeBuffer,
    node: NodeRequest,
  },
  /// Cancel a pending download. Ignored for unknown ids and for decodes
  /// already under way.
  Abort { id: RequestId },
  /// Cancel everything and answer once no request is active.
  AbortAll,
}

impl fmt::Debug for WorkerRequest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Init { highlights, .. } => f.debug_struct("Init").field("highlights", highlights).finish_non_exhaustive(),
      Self::Load { id, url, byte_size, node } => f
        .debug_struct("Load")
        .field("id", id)
        .field("url", url)
        .field("byte_size", byte_size)
        .field("node", node)
        .finish(),
      Self::Parse { id, buffer, node } => f
        .debug_struct("Parse")
        .field("id", id)
        .field("len", &buffer.len())
        .field("node", node)
        .finish(),
      Self::Abort { id } => f.debug_struct("Abort").field("id", id).finish(),
      Self::AbortAll => f.write_str("AbortAll"),
    }
  }
}

/// Timing and size of one completed request.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoadStats {
  /// Bytes of the node file.
  pub bytes: usize,
  pub decode_time: Duration,
}

/// Worker to foreground.
#[derive(Debug)]
pub enum WorkerResponse {
  Ready {
    id: RequestId,
    children: Vec<NodeData>,
    geometry: NodeGeometry,
    stats: LoadStats,
  },
  Aborted {
    id: RequestId,
  },
  AbortedAll,
  Error {
    id: RequestId,
    error: PipelineError,
  },
}

impl WorkerResponse {
  /// Request the response answers; `None` for `AbortedAll`.
  pub fn id(&self) -> Option<RequestId> {
    match self {
      Self::Ready { id, .. } | Self::Aborted { id } | Self::Error { id, .. } => Some(*id),
      Self::AbortedAll => None,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
  #[error(transparent)]
  Decode(#[from] DecodeError),

  #[error(transparent)]
  Download(#[from] DownloadError),

  #[error("worker received a load before init")]
  NotInitialized,

  #[error("worker is gone")]
  Disconnected,
}
