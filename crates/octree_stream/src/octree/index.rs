//! OctreeIndex - owns the root node, the worker and the render backend.
//!
//! Each frame [`OctreeIndex::update`]:
//!
//! 1. applies worker responses to the nodes that asked for them,
//! 2. evaluates the tree against the camera,
//! 3. aborts and releases what the traversal disposed,
//! 4. issues the largest download candidates within the [`RequestBudget`],
//! 5. returns the render items for the frame.
//!
//! Nodes are addressed by their [`NodePath`] from the root. A response is only
//! applied when the node at that path still awaits the same request id, so
//! responses outliving a disposal are dropped.
//!
//! [`RequestBudget`]: super::RequestBudget

use std::collections::HashMap;
use std::sync::Arc;

use super::budget::FrameStats;
use super::frustum::Camera;
use super::node::{Disposal, NodeMesh, NodePath, OctreeNode, RenderItem, Traversal};
use crate::config::StreamConfig;
use crate::download::ByteSource;
use crate::format::FormatVersion;
use crate::geometry::NodeGeometry;
use crate::highlight::HighlightTable;
use crate::metrics::{NodeCounts, StreamMetrics};
use crate::pipeline::{DecodeOptions, NodeRequest, RequestId, Worker, WorkerRequest, WorkerResponse};
use crate::types::NodeData;

// =============================================================================
// RenderBackend - where geometry ends up
// =============================================================================

/// Turns decoded geometry into something drawable.
pub trait RenderBackend {
  /// Opaque handle of one node's uploaded geometry.
  type Handle: Clone;

  /// Upload `geometry` of `node`. Never called for empty geometry.
  fn create_geometry(&mut self, node: &NodeData, geometry: &NodeGeometry) -> Self::Handle;

  /// Free a handle returned by `create_geometry`.
  fn release(&mut self, handle: Self::Handle);
}

/// One streamed scene: where its node files live and how they are encoded.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneDescriptor {
  /// Directory (or URL prefix) holding one file per node, named by node id.
  pub base_url: String,
  /// Synthetic descriptor of the root node.
  pub root: NodeData,
  pub version: FormatVersion,
}

impl SceneDescriptor {
  pub fn new(base_url: impl Into<String>, root: NodeData, version: FormatVersion) -> Self {
    Self {
      base_url: base_url.into(),
      root,
      version,
    }
  }

  /// `<base_url>/<node id>`.
  pub fn node_url(&self, node_id: &str) -> String {
    let base = self.base_url.trim_end_matches('/');
    if base.is_empty() {
      node_id.to_owned()
    } else {
      format!("{base}/{node_id}")
    }
  }
}

/// What the renderer draws this frame.
#[derive(Clone, Debug)]
pub struct FrameOutput<H> {
  pub items: Vec<RenderItem<H>>,
  pub stats: FrameStats,
}

// =============================================================================
// OctreeIndex
// =============================================================================

pub struct OctreeIndex<B: RenderBackend> {
  config: StreamConfig,
  backend: B,
  worker: Worker,
  highlights: Arc<HighlightTable>,
  options: Arc<DecodeOptions>,
  scene: SceneDescriptor,
  root: OctreeNode<B::Handle>,
  /// Outstanding requests and the node each one is for.
  in_flight: HashMap<RequestId, NodePath>,
  next_request: u64,
  metrics: StreamMetrics,
}

impl<B: RenderBackend> OctreeIndex<B> {
  /// Spawn the worker and start streaming `scene` from `source`.
  pub fn new(
    config: StreamConfig,
    backend: B,
    source: Arc<dyn ByteSource>,
    scene: SceneDescriptor,
  ) -> std::io::Result<Self> {
    let worker = Worker::spawn()?;
    let highlights = Arc::new(HighlightTable::default());
    let options = Arc::new(config.decode.clone());
    worker
      .send(WorkerRequest::Init {
        highlights: highlights.clone(),
        source,
      })
      .map_err(std::io::Error::other)?;

    Ok(Self {
      config,
      backend,
      worker,
      highlights,
      options,
      root: OctreeNode::new(scene.root.clone()),
      scene,
      in_flight: HashMap::new(),
      next_request: 1,
      metrics: StreamMetrics::new(),
    })
  }

  #[inline]
  pub fn root(&self) -> &OctreeNode<B::Handle> {
    &self.root
  }

  #[inline]
  pub fn scene(&self) -> &SceneDescriptor {
    &self.scene
  }

  #[inline]
  pub fn config(&self) -> &StreamConfig {
    &self.config
  }

  #[inline]
  pub fn backend(&self) -> &B {
    &self.backend
  }

  #[inline]
  pub fn backend_mut(&mut self) -> &mut B {
    &mut self.backend
  }

  #[inline]
  pub fn metrics(&self) -> &StreamMetrics {
    &self.metrics
  }

  #[inline]
  pub fn highlights(&self) -> &Arc<HighlightTable> {
    &self.highlights
  }

  /// Requests sent to the worker and not yet answered or aborted.
  #[inline]
  pub fn in_flight(&self) -> usize {
    self.in_flight.len()
  }

  /// Switch to another scene. The whole tree is torn down.
  pub fn set_source(&mut self, scene: SceneDescriptor) {
    tracing::info!(base_url = %scene.base_url, version = scene.version.as_str(), "switching scene");
    self.scene = scene;
    self.reset();
  }

  /// Fetch node files from `source` from now on. The tree is reloaded.
  pub fn set_byte_source(&mut self, source: Arc<dyn ByteSource>) {
    self.reset();
    let init = WorkerRequest::Init {
      highlights: self.highlights.clone(),
      source,
    };
    if let Err(err) = self.worker.send(init) {
      tracing::warn!(%err, "failed to re-initialize worker");
    }
  }

  /// Set one object's highlight byte. Nodes decoded from now on see it;
  /// `FILTERED` takes effect on nodes loaded after the change.
  pub fn set_highlight(&self, object_id: u32, value: u8) {
    self.highlights.lock_spin().set(object_id, value);
  }

  pub fn clear_highlights(&self) {
    self.highlights.lock_spin().clear();
  }

  /// Hide `ids` from every node. The tree is reloaded so loaded nodes drop
  /// their geometry too.
  pub fn set_hidden_objects(&mut self, ids: impl IntoIterator<Item = u32>) {
    let options = DecodeOptions {
      filter_highlighted: self.options.filter_highlighted,
      ..DecodeOptions::hiding(ids)
    };
    if *self.options == options {
      return;
    }
    self.options = Arc::new(options);
    self.reset();
  }

  /// Dispose everything, cancel all requests and start over from the root.
  fn reset(&mut self) {
    let mut disposal = Disposal::default();
    self.root.dispose(&mut disposal);
    tracing::debug!(nodes = disposal.nodes, handles = disposal.handles.len(), "tearing down tree");
    self.release(disposal.handles, disposal.gpu_bytes);
    self.in_flight.clear();
    if let Err(err) = self.worker.send(WorkerRequest::AbortAll) {
      tracing::warn!(%err, "failed to abort outstanding requests");
    }
    self.root = OctreeNode::new(self.scene.root.clone());
    self.metrics.reset();
  }

  fn release(&mut self, handles: Vec<B::Handle>, gpu_bytes: u64) {
    for handle in handles {
      self.backend.release(handle);
    }
    self.metrics.record_release(gpu_bytes);
  }

  /// Advance one frame for `camera`.
  #[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "OctreeIndex::update"))]
  pub fn update(&mut self, camera: &Camera) -> FrameOutput<B::Handle> {
    let mut stats = FrameStats::default();
    self.apply_responses(&mut stats);

    let mut t = Traversal::new(camera, &self.config.lod, self.config.failure);
    self.root.evaluate(&mut t, &mut NodePath::new(), None);
    let Traversal {
      mut candidates,
      items,
      disposal,
      nodes_visited,
      nodes_visible,
      ..
    } = t;
    stats.nodes_visited = nodes_visited;
    stats.nodes_visible = nodes_visible;

    stats.requests_aborted = disposal.aborts.len();
    stats.disposed = disposal.nodes;
    for id in disposal.aborts {
      self.in_flight.remove(&id);
      if let Err(err) = self.worker.send(WorkerRequest::Abort { id }) {
        tracing::warn!(%id, %err, "failed to abort request");
      }
    }
    self.release(disposal.handles, disposal.gpu_bytes);

    candidates.sort_by(|a, b| b.priority.total_cmp(&a.priority));
    for candidate in candidates {
      if !self.config.budget.can_request(stats.requests_issued, self.in_flight.len()) {
        stats.requests_deferred += 1;
        continue;
      }
      if self.issue(candidate.path) {
        stats.requests_issued += 1;
      } else {
        stats.requests_deferred += 1;
      }
    }

    let mut counts = NodeCounts::default();
    self.root.count_states(&mut counts);
    self.metrics.record_nodes(counts);

    FrameOutput { items, stats }
  }

  /// Send a load for the node at `path`. False when it could not be sent.
  fn issue(&mut self, path: NodePath) -> bool {
    let Some(node) = self.root.descendant_mut(&path) else {
      return false;
    };
    let id = RequestId(self.next_request);
    let data = node.data();
    let request = WorkerRequest::Load {
      id,
      url: self.scene.node_url(&data.id),
      byte_size: data.byte_size,
      node: NodeRequest {
        node_id: data.id.clone(),
        version: self.scene.version,
        options: self.options.clone(),
      },
    };
    if let Err(err) = self.worker.send(request) {
      tracing::warn!(%id, %err, "failed to issue request");
      return false;
    }
    self.next_request += 1;
    node.start_request(id);
    self.in_flight.insert(id, path);
    true
  }

  fn apply_responses(&mut self, stats: &mut FrameStats) {
    while let Some(response) = self.worker.try_recv() {
      let Some(id) = response.id() else {
        tracing::debug!("worker idle after abort all");
        continue;
      };
      let Some(path) = self.in_flight.remove(&id) else {
        tracing::trace!(%id, "dropping stale response");
        continue;
      };
      let Some(node) = self.root.descendant_mut(&path).filter(|node| node.awaits(id)) else {
        tracing::trace!(%id, "dropping response for a replaced node");
        continue;
      };

      match response {
        WorkerResponse::Ready {
          children,
          geometry,
          stats: load,
          ..
        } => {
          let mesh = (!geometry.is_empty())
            .then(|| NodeMesh::new(self.backend.create_geometry(node.data(), &geometry), &geometry));
          let gpu_bytes = mesh.as_ref().map_or(0, |mesh| mesh.gpu_bytes);
          self.metrics.record_load(&load, gpu_bytes);
          tracing::debug!(%id, node = %node.data().id, children = children.len(), gpu_bytes, "node ready");
          node.finish_load(children, mesh);
          stats.ready += 1;
        }
        WorkerResponse::Aborted { .. } => node.mark_aborted(),
        WorkerResponse::Error { error, .. } => {
          tracing::warn!(%id, node = %node.data().id, %error, "node failed to load");
          node.fail();
          self.metrics.record_failure();
          stats.failed += 1;
        }
        WorkerResponse::AbortedAll => {}
      }
    }
  }
}

impl<B: RenderBackend> Drop for OctreeIndex<B> {
  fn drop(&mut self) {
    let mut disposal = Disposal::default();
    self.root.dispose(&mut disposal);
    for handle in disposal.handles {
      self.backend.release(handle);
    }
  }
}

impl<B: RenderBackend> std::fmt::Debug for OctreeIndex<B> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OctreeIndex")
      .field("scene", &self.scene)
      .field("in_flight", &self.in_flight.len())
      .field("worker", &self.worker)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
