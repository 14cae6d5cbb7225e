//! HTTP byte source on reqwest.

use async_trait::async_trait;

use super::{ByteSource, ByteStream, DownloadError};

/// Fetches node files over HTTP(S). Relative URLs are joined onto `base`.
#[derive(Clone, Debug)]
pub struct HttpSource {
  client: reqwest::Client,
  base: String,
}

impl HttpSource {
  pub fn new(base: impl Into<String>) -> Self {
    Self::with_client(reqwest::Client::new(), base)
  }

  pub fn with_client(client: reqwest::Client, base: impl Into<String>) -> Self {
    let mut base = base.into();
    if !base.is_empty() && !base.ends_with('/') {
      base.push('/');
    }
    Self { client, base }
  }

  fn resolve(&self, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
      url.to_owned()
    } else {
      format!("{}{}", self.base, url.trim_start_matches('/'))
    }
  }
}

fn network(err: reqwest::Error) -> DownloadError {
  DownloadError::Network(err.to_string())
}

#[async_trait]
impl ByteSource for HttpSource {
  async fn open(&self, url: &str) -> Result<Box<dyn ByteStream>, DownloadError> {
    let url = self.resolve(url);
    let response = self.client.get(&url).send().await.map_err(network)?;
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
      return Err(DownloadError::NotFound(url));
    }
    if !status.is_success() {
      return Err(DownloadError::Status(status.as_u16()));
    }
    Ok(Box::new(HttpStream { response }))
  }
}

struct HttpStream {
  response: reqwest::Response,
}

#[async_trait]
impl ByteStream for HttpStream {
  fn content_length(&self) -> Option<u64> {
    self.response.content_length()
  }

  async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, DownloadError> {
    let chunk = self.response.chunk().await.map_err(network)?;
    Ok(chunk.map(|bytes| bytes.to_vec()))
  }
}
