//! Downloader / AbortableDownload - cancellable streaming fetch of node files.
//!
//! A [`ByteSource`] opens a [`ByteStream`] of chunks for a URL. An
//! [`AbortableDownload`] drains that stream into a [`NodeBuffer`], pre-sized
//! from the node's known byte size or grown as chunks arrive, and checks the
//! abort signal at every chunk boundary. Aborting resolves to `Ok(None)`.

pub mod abortable;
pub mod active;
pub mod file;
#[cfg(feature = "http")]
pub mod http;
pub mod memory;

use async_trait::async_trait;

pub use abortable::{AbortHandle, AbortableDownload, Downloader, MISMATCH_RETRIES};
pub use active::{ActiveCounter, ActiveGuard};
pub use file::FileSource;
#[cfg(feature = "http")]
pub use http::HttpSource;
pub use memory::MemorySource;

pub use crate::format::NodeBuffer;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DownloadError {
  #[error("network error: {0}")]
  Network(String),

  #[error("unexpected HTTP status code: {0}")]
  Status(u16),

  #[error("content length mismatch: expected {expected} bytes, received {received}")]
  ContentMismatch { expected: u64, received: u64 },

  #[error("file error: {0}")]
  File(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("unsupported url: {0}")]
  Unsupported(String),
}

impl From<std::io::Error> for DownloadError {
  fn from(err: std::io::Error) -> Self {
    match err.kind() {
      std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
      _ => Self::File(err.to_string()),
    }
  }
}

/// Where node files come from.
#[async_trait]
pub trait ByteSource: Send + Sync {
  /// Start fetching `url`.
  async fn open(&self, url: &str) -> Result<Box<dyn ByteStream>, DownloadError>;
}

/// Chunked body of one fetch.
#[async_trait]
pub trait ByteStream: Send {
  /// Length announced by the source, if any.
  fn content_length(&self) -> Option<u64>;

  /// Next chunk, `None` at the end of the body.
  async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, DownloadError>;
}

#[async_trait]
impl<S: ByteSource + ?Sized> ByteSource for std::sync::Arc<S> {
  async fn open(&self, url: &str) -> Result<Box<dyn ByteStream>, DownloadError> {
    (**self).open(url).await
  }
}
