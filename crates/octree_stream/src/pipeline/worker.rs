//! Background worker running downloads on a tokio runtime and decodes on
//! the rayon pool.
//!
//! ```ignore
//! let worker = Worker::spawn()?;
//! worker.send(WorkerRequest::Init { highlights, source })?;
//! worker.send(WorkerRequest::Load { id, url, byte_size, node })?;
//!
//! // Each frame
//! while let Some(response) = worker.try_recv() {
//!   // Ready / Aborted / AbortedAll / Error
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tokio::sync::{mpsc, oneshot};
use web_time::Instant;

use super::decode::{decode_node, DecodedNode};
use super::messages::{LoadStats, NodeRequest, PipelineError, RequestId, WorkerRequest, WorkerResponse};
use crate::download::{AbortHandle, ActiveCounter, ActiveGuard, Downloader};
use crate::format::{DecodeError, NodeBuffer};
use crate::highlight::HighlightTable;

/// Handle to the worker thread. Dropping it cancels outstanding work and
/// joins the thread.
pub struct Worker {
  requests: Option<mpsc::UnboundedSender<WorkerRequest>>,
  responses: Receiver<WorkerResponse>,
  thread: Option<JoinHandle<()>>,
}

impl Worker {
  pub fn spawn() -> std::io::Result<Self> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = crossbeam_channel::unbounded();

    let thread = std::thread::Builder::new()
      .name("octree-stream-worker".into())
      .spawn(move || runtime.block_on(WorkerLoop::new(response_tx).run(request_rx)))?;

    Ok(Self {
      requests: Some(request_tx),
      responses: response_rx,
      thread: Some(thread),
    })
  }

  pub fn send(&self, request: WorkerRequest) -> Result<(), PipelineError> {
    self
      .requests
      .as_ref()
      .ok_or(PipelineError::Disconnected)?
      .send(request)
      .map_err(|_| PipelineError::Disconnected)
  }

  /// Next response, if one is waiting.
  pub fn try_recv(&self) -> Option<WorkerResponse> {
    self.responses.try_recv().ok()
  }

  /// Wait up to `timeout` for the next response.
  pub fn recv_timeout(&self, timeout: std::time::Duration) -> Option<WorkerResponse> {
    self.responses.recv_timeout(timeout).ok()
  }

  pub fn responses(&self) -> &Receiver<WorkerResponse> {
    &self.responses
  }
}

impl Drop for Worker {
  fn drop(&mut self) {
    self.requests.take();
    if let Some(thread) = self.thread.take() {
      if thread.join().is_err() {
        tracing::error!("octree stream worker panicked");
      }
    }
  }
}

impl std::fmt::Debug for Worker {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Worker")
      .field("queued_responses", &self.responses.len())
      .finish_non_exhaustive()
  }
}

type Pending = Arc<Mutex<HashMap<RequestId, AbortHandle>>>;

fn lock(pending: &Pending) -> MutexGuard<'_, HashMap<RequestId, AbortHandle>> {
  pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// State owned by the worker thread.
struct WorkerLoop {
  responses: Sender<WorkerResponse>,
  highlights: Option<Arc<HighlightTable>>,
  downloader: Option<Downloader>,
  /// Outstanding requests, until their response is sent.
  pending: Pending,
  /// Requests between acceptance and response, download and decode both.
  tasks: ActiveCounter,
}

impl WorkerLoop {
  fn new(responses: Sender<WorkerResponse>) -> Self {
    Self {
      responses,
      highlights: None,
      downloader: None,
      pending: Pending::default(),
      tasks: ActiveCounter::new(),
    }
  }

  async fn run(mut self, mut requests: mpsc::UnboundedReceiver<WorkerRequest>) {
    while let Some(request) = requests.recv().await {
      tracing::trace!(?request, "worker request");
      match request {
        WorkerRequest::Init { highlights, source } => {
          self.highlights = Some(highlights);
          self.downloader = Some(Downloader::new(source));
        }
        WorkerRequest::Load {
          id,
          url,
          byte_size,
          node,
        } => self.load(id, url, byte_size, node),
        WorkerRequest::Parse { id, buffer, node } => self.parse(id, buffer, node),
        WorkerRequest::Abort { id } => {
          // Unknown ids have already been answered.
          if let Some(handle) = lock(&self.pending).get(&id) {
            handle.abort();
          }
        }
        WorkerRequest::AbortAll => {
          self.abort_all().await;
          let _ = self.responses.send(WorkerResponse::AbortedAll);
        }
      }
    }
    self.abort_all().await;
    tracing::debug!("octree stream worker stopped");
  }

  async fn abort_all(&self) {
    for handle in lock(&self.pending).values() {
      handle.abort();
    }
    self.tasks.wait_idle().await;
  }

  /// Track `id` until its response is sent. Panics if it is still
  /// outstanding.
  fn accept(&self, id: RequestId, abort: AbortHandle) -> Task {
    let previous = lock(&self.pending).insert(id, abort);
    assert!(previous.is_none(), "request id {id} reused while outstanding");
    Task {
      id,
      _active: self.tasks.enter(),
      pending: Arc::clone(&self.pending),
      responses: self.responses.clone(),
      highlights: self.highlights.clone(),
    }
  }

  fn load(&self, id: RequestId, url: String, byte_size: u32, node: NodeRequest) {
    let Some(downloader) = &self.downloader else {
      let _ = self.responses.send(WorkerResponse::Error {
        id,
        error: PipelineError::NotInitialized,
      });
      return;
    };

    let download = downloader.download(url, byte_size);
    let task = self.accept(id, download.abort_handle());
    tokio::spawn(async move {
      tracing::debug!(%id, url = download.url(), byte_size, "load started");
      let response = match download.run().await {
        Ok(Some(buffer)) => task.decode(buffer, node).await,
        Ok(None) => WorkerResponse::Aborted { id },
        Err(err) => {
          tracing::warn!(%id, %err, "download failed");
          WorkerResponse::Error { id, error: err.into() }
        }
      };
      task.finish(response);
    });
  }

  fn parse(&self, id: RequestId, buffer: NodeBuffer, node: NodeRequest) {
    let abort = AbortHandle::new();
    let task = self.accept(id, abort.clone());
    tokio::spawn(async move {
      let response = if abort.is_aborted() {
        WorkerResponse::Aborted { id }
      } else {
        task.decode(buffer, node).await
      };
      task.finish(response);
    });
  }
}

/// What a spawned request needs from the loop.
struct Task {
  id: RequestId,
  _active: ActiveGuard,
  pending: Pending,
  responses: Sender<WorkerResponse>,
  highlights: Option<Arc<HighlightTable>>,
}

impl Task {
  /// Decode on the rayon pool. Runs to completion once started.
  async fn decode(&self, buffer: NodeBuffer, node: NodeRequest) -> WorkerResponse {
    let id = self.id;
    let highlights = self.highlights.clone();
    let (tx, rx) = oneshot::channel::<(Result<DecodedNode, DecodeError>, LoadStats)>();

    rayon::spawn(move || {
      let started = Instant::now();
      let result = decode_node(
        &buffer,
        node.version,
        &node.node_id,
        &node.options,
        highlights.as_deref(),
      );
      let stats = LoadStats {
        bytes: buffer.len(),
        decode_time: started.elapsed(),
      };
      let _ = tx.send((result, stats));
    });

    match rx.await {
      Ok((Ok(decoded), stats)) => {
        tracing::debug!(%id, children = decoded.children.len(), ?stats.decode_time, "node ready");
        WorkerResponse::Ready {
          id,
          children: decoded.children,
          geometry: decoded.geometry,
          stats,
        }
      }
      Ok((Err(err), _)) => {
        tracing::warn!(%id, %err, "decode failed");
        WorkerResponse::Error { id, error: err.into() }
      }
      Err(_) => WorkerResponse::Error {
        id,
        error: PipelineError::Disconnected,
      },
    }
  }

  fn finish(self, response: WorkerResponse) {
    lock(&self.pending).remove(&self.id);
    let _ = self.responses.send(response);
  }
}

#[cfg(test)]
#[path = "worker_test.rs"]
mod worker_test;
