//! In-memory byte source for tests, benches and preloaded datasets.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{ByteSource, ByteStream, DownloadError};

#[derive(Default)]
struct Entry {
  bytes: Vec<u8>,
  /// Next opens that drop the last byte of the body.
  corrupt: u32,
  opens: u32,
}

/// Serves registered byte blobs in fixed-size chunks.
pub struct MemorySource {
  entries: Mutex<HashMap<String, Entry>>,
  chunk_size: usize,
  chunk_delay: Option<Duration>,
}

impl MemorySource {
  pub fn new() -> Self {
    Self {
      entries: Mutex::default(),
      chunk_size: 64 * 1024,
      chunk_delay: None,
    }
  }

  pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
    self.chunk_size = chunk_size.max(1);
    self
  }

  /// Sleep before every chunk, to keep downloads in flight.
  pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
    self.chunk_delay = Some(delay);
    self
  }

  pub fn insert(&self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) {
    let entry = Entry {
      bytes: bytes.into(),
      ..Default::default()
    };
    self.lock().insert(url.into(), entry);
  }

  /// Serve a body one byte short for the next `times` opens of `url`.
  pub fn corrupt_next(&self, url: &str, times: u32) {
    if let Some(entry) = self.lock().get_mut(url) {
      entry.corrupt = times;
    }
  }

  /// How many times `url` was opened.
  pub fn open_count(&self, url: &str) -> u32 {
    self.lock().get(url).map_or(0, |entry| entry.opens)
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl Default for MemorySource {
  fn default() -> Self {
    Self::new()
  }
}

#[async_trait]
impl ByteSource for MemorySource {
  async fn open(&self, url: &str) -> Result<Box<dyn ByteStream>, DownloadError> {
    let mut entries = self.lock();
    let entry = entries
      .get_mut(url)
      .ok_or_else(|| DownloadError::NotFound(url.to_owned()))?;
    entry.opens += 1;

    let mut bytes = entry.bytes.clone();
    if entry.corrupt > 0 {
      entry.corrupt -= 1;
      bytes.pop();
    }
    Ok(Box::new(MemoryStream {
      bytes,
      pos: 0,
      chunk_size: self.chunk_size,
      chunk_delay: self.chunk_delay,
    }))
  }
}

struct MemoryStream {
  bytes: Vec<u8>,
  pos: usize,
  chunk_size: usize,
  chunk_delay: Option<Duration>,
}

#[async_trait]
impl ByteStream for MemoryStream {
  fn content_length(&self) -> Option<u64> {
    Some(self.bytes.len() as u64)
  }

  async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, DownloadError> {
    if self.pos >= self.bytes.len() {
      return Ok(None);
    }
    if let Some(delay) = self.chunk_delay {
      tokio::time::sleep(delay).await;
    }
    let end = (self.pos + self.chunk_size).min(self.bytes.len());
    let chunk = self.bytes[self.pos..end].to_vec();
    self.pos = end;
    Ok(Some(chunk))
  }
}
