//! Downloader and the cancellable fetch it hands out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use super::{ActiveCounter, ByteSource, DownloadError, NodeBuffer};

/// Automatic re-fetches after a content length mismatch.
pub const MISMATCH_RETRIES: u32 = 1;

#[derive(Debug, Default)]
struct AbortSignal {
  aborted: AtomicBool,
  notify: Notify,
}

/// Cloneable cancel switch for one download.
#[derive(Clone, Debug, Default)]
pub struct AbortHandle {
  signal: Arc<AbortSignal>,
}

impl AbortHandle {
  pub fn new() -> Self {
    Self::default()
  }

  /// Stop the download at its next chunk boundary. Idempotent.
  pub fn abort(&self) {
    self.signal.aborted.store(true, Ordering::Release);
    self.signal.notify.notify_waiters();
  }

  #[inline]
  pub fn is_aborted(&self) -> bool {
    self.signal.aborted.load(Ordering::Acquire)
  }

  /// Resolve once [`abort`](Self::abort) has been called.
  pub async fn aborted(&self) {
    loop {
      let notified = self.signal.notify.notified();
      tokio::pin!(notified);
      notified.as_mut().enable();
      if self.is_aborted() {
        return;
      }
      notified.await;
    }
  }
}

/// Hands out [`AbortableDownload`]s against one source and counts the ones
/// running.
#[derive(Clone)]
pub struct Downloader {
  source: Arc<dyn ByteSource>,
  active: ActiveCounter,
}

impl Downloader {
  pub fn new(source: Arc<dyn ByteSource>) -> Self {
    Self {
      source,
      active: ActiveCounter::new(),
    }
  }

  /// Downloads currently running.
  pub fn active(&self) -> &ActiveCounter {
    &self.active
  }

  /// Prepare a fetch of `url`. `byte_size` pre-sizes the buffer; zero means
  /// unknown and the buffer grows as chunks arrive.
  pub fn download(&self, url: impl Into<String>, byte_size: u32) -> AbortableDownload {
    AbortableDownload {
      source: Arc::clone(&self.source),
      url: url.into(),
      byte_size,
      abort: AbortHandle::new(),
      active: self.active.clone(),
    }
  }
}

impl std::fmt::Debug for Downloader {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Downloader")
      .field("active", &self.active.get())
      .finish_non_exhaustive()
  }
}

/// One cancellable fetch. Resolves to `Ok(None)` when aborted.
pub struct AbortableDownload {
  source: Arc<dyn ByteSource>,
  url: String,
  byte_size: u32,
  abort: AbortHandle,
  active: ActiveCounter,
}

impl AbortableDownload {
  pub fn abort_handle(&self) -> AbortHandle {
    self.abort.clone()
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  /// Fetch the whole body, re-fetching once on a length mismatch.
  pub async fn run(self) -> Result<Option<NodeBuffer>, DownloadError> {
    let _active = self.active.enter();
    let mut attempt = 0;
    loop {
      match self.fetch_once().await {
        Err(DownloadError::ContentMismatch { expected, received }) if attempt < MISMATCH_RETRIES => {
          attempt += 1;
          tracing::warn!(url = %self.url, expected, received, "content length mismatch, re-fetching");
        }
        other => return other,
      }
    }
  }

  async fn fetch_once(&self) -> Result<Option<NodeBuffer>, DownloadError> {
    if self.abort.is_aborted() {
      return Ok(None);
    }
    let mut stream = tokio::select! {
      biased;
      _ = self.abort.aborted() => return Ok(None),
      stream = self.source.open(&self.url) => stream?,
    };

    // Declared size is untrusted header data: check it before allocating.
    let advertised = stream.content_length();
    let expected = match self.byte_size {
      0 => advertised,
      size => Some(size as u64),
    };
    if let (Some(expected), Some(advertised)) = (expected, advertised) {
      if expected != advertised {
        return Err(DownloadError::ContentMismatch {
          expected,
          received: advertised,
        });
      }
    }
    // Pre-size only a length both sides agree on; otherwise grow per chunk.
    let mut buffer = match (expected, advertised) {
      (Some(len), Some(_)) => NodeBuffer::zeroed(len as usize),
      _ => NodeBuffer::default(),
    };

    let mut received = 0usize;
    loop {
      let chunk = tokio::select! {
        biased;
        _ = self.abort.aborted() => return Ok(None),
        chunk = stream.next_chunk() => chunk?,
      };
      let Some(chunk) = chunk else {
        break;
      };

      let end = received + chunk.len();
      if let Some(expected) = expected {
        if end as u64 > expected {
          return Err(DownloadError::ContentMismatch {
            expected,
            received: end as u64,
          });
        }
      }
      if end <= buffer.len() {
        buffer.as_bytes_mut()[received..end].copy_from_slice(&chunk);
      } else {
        buffer.extend_from_slice(&chunk);
      }
      received = end;
    }

    if let Some(expected) = expected {
      if received as u64 != expected {
        return Err(DownloadError::ContentMismatch {
          expected,
          received: received as u64,
        });
      }
    }
    Ok(Some(buffer))
  }
}

impl std::fmt::Debug for AbortableDownload {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AbortableDownload")
      .field("url", &self.url)
      .field("byte_size", &self.byte_size)
      .field("aborted", &self.abort.is_aborted())
      .finish()
  }
}
