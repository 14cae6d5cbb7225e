//! Local file byte source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use super::{ByteSource, ByteStream, DownloadError};

const CHUNK_SIZE: usize = 256 * 1024;

/// Reads node files from disk. Accepts `file://` URLs and paths relative to
/// `root`.
#[derive(Clone, Debug)]
pub struct FileSource {
  root: PathBuf,
}

impl FileSource {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn resolve(&self, url: &str) -> Result<PathBuf, DownloadError> {
    if let Some(path) = url.strip_prefix("file://") {
      return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
      return Err(DownloadError::Unsupported(url.to_owned()));
    }
    Ok(self.root.join(url))
  }
}

#[async_trait]
impl ByteSource for FileSource {
  async fn open(&self, url: &str) -> Result<Box<dyn ByteStream>, DownloadError> {
    let path = self.resolve(url)?;
    let file = tokio::fs::File::open(&path).await?;
    let len = file.metadata().await?.len();
    tracing::trace!(path = %path.display(), len, "opened node file");
    Ok(Box::new(FileStream { file, len }))
  }
}

struct FileStream {
  file: tokio::fs::File,
  len: u64,
}

#[async_trait]
impl ByteStream for FileStream {
  fn content_length(&self) -> Option<u64> {
    Some(self.len)
  }

  async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, DownloadError> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let n = self.file.read(&mut chunk).await?;
    if n == 0 {
      return Ok(None);
    }
    chunk.truncate(n);
    Ok(Some(chunk))
  }
}
