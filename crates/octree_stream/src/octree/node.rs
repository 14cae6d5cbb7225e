//! OctreeNode - one LOD node, its children and its load state machine.
//!
//! ```text
//! Collapsed ──split──► RequestDownload ──issued──► Downloading ──ready──► Ready
//!     ▲                        │                        │                   │
//!     └────────────── dispose (any state, recursive) ◄──┴───────────────────┘
//! ```
//!
//! A failed or aborted download falls back to `Collapsed` and is requested
//! again on the next evaluation that wants the node split, unless the
//! [`FailurePolicy`] has given up on it.

use smallvec::SmallVec;

use super::config::{FailurePolicy, LodProfile};
use super::frustum::{Camera, Visibility};
use crate::geometry::{DrawRange, NodeGeometry};
use crate::metrics::NodeCounts;
use crate::pipeline::RequestId;
use crate::types::NodeData;

/// Positions into `children` from the root down to a node.
pub type NodePath = SmallVec<[u8; 16]>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeState {
  /// No geometry, no children.
  #[default]
  Collapsed,
  /// Wants a download, waiting for request budget.
  RequestDownload,
  Downloading { request: RequestId },
  /// Geometry handed to the backend, children materialized.
  Ready,
}

/// Draw ranges of one submesh, kept after the geometry was uploaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshDraw {
  pub sub_mesh: u32,
  pub draw_ranges: SmallVec<[DrawRange; 8]>,
}

/// Backend handle plus what is needed to draw partial octants.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeMesh<H> {
  pub handle: H,
  pub draws: Vec<MeshDraw>,
  pub gpu_bytes: u64,
}

impl<H> NodeMesh<H> {
  pub fn new(handle: H, geometry: &NodeGeometry) -> Self {
    let draws = geometry
      .sub_meshes
      .iter()
      .enumerate()
      .map(|(i, sub_mesh)| MeshDraw {
        sub_mesh: i as u32,
        draw_ranges: sub_mesh.draw_ranges.iter().copied().collect(),
      })
      .collect();
    Self {
      handle,
      draws,
      gpu_bytes: geometry.gpu_bytes(),
    }
  }
}

/// One submesh draw for the renderer, restricted to the octants the node
/// still covers.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem<H> {
  pub handle: H,
  pub sub_mesh: u32,
  pub draw_ranges: SmallVec<[DrawRange; 8]>,
}

/// Resources freed by [`OctreeNode::dispose`].
#[derive(Debug)]
pub struct Disposal<H> {
  /// In-flight requests to abort.
  pub aborts: Vec<RequestId>,
  /// Backend handles to release.
  pub handles: Vec<H>,
  pub gpu_bytes: u64,
  /// Nodes that were loading or loaded.
  pub nodes: usize,
}

impl<H> Default for Disposal<H> {
  fn default() -> Self {
    Self {
      aborts: Vec::new(),
      handles: Vec::new(),
      gpu_bytes: 0,
      nodes: 0,
    }
  }
}

/// A node that wants to be downloaded.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
  pub path: NodePath,
  /// Larger first.
  pub priority: f64,
}

/// Per-frame traversal state.
pub struct Traversal<'a, H> {
  pub camera: &'a Camera,
  pub profile: &'a LodProfile,
  pub failure_policy: FailurePolicy,
  pub candidates: Vec<Candidate>,
  pub items: Vec<RenderItem<H>>,
  pub disposal: Disposal<H>,
  pub nodes_visited: usize,
  pub nodes_visible: usize,
}

impl<'a, H> Traversal<'a, H> {
  pub fn new(camera: &'a Camera, profile: &'a LodProfile, failure_policy: FailurePolicy) -> Self {
    Self {
      camera,
      profile,
      failure_policy,
      candidates: Vec::new(),
      items: Vec::new(),
      disposal: Disposal::default(),
      nodes_visited: 0,
      nodes_visible: 0,
    }
  }
}

#[derive(Debug)]
pub struct OctreeNode<H> {
  data: NodeData,
  state: NodeState,
  /// Owned subtree; empty unless `Ready`.
  children: Vec<OctreeNode<H>>,
  /// `None` when the node decoded to no geometry.
  mesh: Option<NodeMesh<H>>,
  visibility: Visibility,
  projected_size: f64,
  failures: u32,
}

impl<H> OctreeNode<H> {
  pub fn new(data: NodeData) -> Self {
    Self {
      data,
      state: NodeState::Collapsed,
      children: Vec::new(),
      mesh: None,
      visibility: Visibility::Partial,
      projected_size: 0.0,
      failures: 0,
    }
  }

  #[inline]
  pub fn data(&self) -> &NodeData {
    &self.data
  }

  #[inline]
  pub fn state(&self) -> NodeState {
    self.state
  }

  #[inline]
  pub fn children(&self) -> &[OctreeNode<H>] {
    &self.children
  }

  #[inline]
  pub fn mesh(&self) -> Option<&NodeMesh<H>> {
    self.mesh.as_ref()
  }

  #[inline]
  pub fn visibility(&self) -> Visibility {
    self.visibility
  }

  #[inline]
  pub fn projected_size(&self) -> f64 {
    self.projected_size
  }

  #[inline]
  pub fn failures(&self) -> u32 {
    self.failures
  }

  #[inline]
  pub fn is_ready(&self) -> bool {
    self.state == NodeState::Ready
  }

  /// Whether this node is waiting on `request`.
  #[inline]
  pub fn awaits(&self, request: RequestId) -> bool {
    self.state == NodeState::Downloading { request }
  }

  /// Octants this node still draws itself: those holding geometry whose
  /// child has not taken over.
  pub fn render_mask(&self) -> u8 {
    let covered = self
      .children
      .iter()
      .filter(|child| child.is_ready())
      .fold(0u8, |mask, child| mask | 1 << (child.data.child_index & 7));
    self.data.child_mask & !covered
  }

  pub fn descendant_mut(&mut self, path: &[u8]) -> Option<&mut Self> {
    let mut node = self;
    for &i in path {
      node = node.children.get_mut(i as usize)?;
    }
    Some(node)
  }

  pub fn descendant(&self, path: &[u8]) -> Option<&Self> {
    let mut node = self;
    for &i in path {
      node = node.children.get(i as usize)?;
    }
    Some(node)
  }

  pub(crate) fn start_request(&mut self, request: RequestId) {
    debug_assert_eq!(self.state, NodeState::RequestDownload);
    self.state = NodeState::Downloading { request };
  }

  /// Take the decode result. Children start collapsed.
  pub(crate) fn finish_load(&mut self, children: Vec<NodeData>, mesh: Option<NodeMesh<H>>) {
    self.children = children.into_iter().map(OctreeNode::new).collect();
    self.mesh = mesh;
    self.state = NodeState::Ready;
    self.failures = 0;
  }

  pub(crate) fn fail(&mut self) {
    self.state = NodeState::Collapsed;
    self.failures += 1;
  }

  pub(crate) fn mark_aborted(&mut self) {
    self.state = NodeState::Collapsed;
  }

  /// Back to `Collapsed`: abort any request, release the mesh and dispose
  /// every child first.
  pub fn dispose(&mut self, disposal: &mut Disposal<H>) {
    for child in &mut self.children {
      child.dispose(disposal);
    }
    self.children.clear();

    match self.state {
      NodeState::Downloading { request } => {
        disposal.aborts.push(request);
        disposal.nodes += 1;
      }
      NodeState::Ready => disposal.nodes += 1,
      NodeState::Collapsed | NodeState::RequestDownload => {}
    }
    if let Some(mesh) = self.mesh.take() {
      disposal.gpu_bytes += mesh.gpu_bytes;
      disposal.handles.push(mesh.handle);
    }
    self.state = NodeState::Collapsed;
  }

  pub fn count_states(&self, counts: &mut NodeCounts) {
    match self.state {
      NodeState::Collapsed => counts.collapsed += 1,
      NodeState::RequestDownload => counts.requested += 1,
      NodeState::Downloading { .. } => counts.downloading += 1,
      NodeState::Ready => counts.ready += 1,
    }
    for child in &self.children {
      child.count_states(counts);
    }
  }
}

impl<H: Clone> OctreeNode<H> {
  /// Per-frame evaluation. `parent_visibility` is `None` for the root.
  ///
  /// Visibility is inherited from a fully-in or fully-out parent, otherwise
  /// tested. A node that should not split is disposed; one that should is
  /// queued for download, or recursed into and drawn once ready.
  pub fn evaluate(&mut self, t: &mut Traversal<'_, H>, path: &mut NodePath, parent_visibility: Option<Visibility>) {
    let is_root = parent_visibility.is_none();
    t.nodes_visited += 1;

    self.visibility = match parent_visibility {
      Some(inherited) if inherited.is_conclusive() => inherited,
      _ => t.camera.frustum.visibility(&self.data.sphere, &self.data.bounds),
    };
    self.projected_size = t.profile.projected_size(t.camera, self.data.tolerance, &self.data.sphere);
    if self.visibility != Visibility::None {
      t.nodes_visible += 1;
    }

    if !t.profile.should_split(is_root, self.visibility, self.projected_size) {
      self.dispose(&mut t.disposal);
      return;
    }

    match self.state {
      NodeState::Collapsed => {
        if t.failure_policy.allows_retry(self.failures) {
          self.state = NodeState::RequestDownload;
          t.candidates.push(self.candidate(path, is_root));
        }
      }
      NodeState::RequestDownload => t.candidates.push(self.candidate(path, is_root)),
      NodeState::Downloading { .. } => {}
      NodeState::Ready => {
        for (i, child) in self.children.iter_mut().enumerate() {
          path.push(i as u8);
          child.evaluate(t, path, Some(self.visibility));
          path.pop();
        }
        if self.visibility != Visibility::None {
          self.emit(t);
        }
      }
    }
  }

  fn candidate(&self, path: &NodePath, is_root: bool) -> Candidate {
    Candidate {
      path: path.clone(),
      priority: if is_root { f64::INFINITY } else { self.projected_size },
    }
  }

  fn emit(&self, t: &mut Traversal<'_, H>) {
    let Some(mesh) = &self.mesh else {
      return;
    };
    let mask = self.render_mask();
    for draw in &mesh.draws {
      let draw_ranges: SmallVec<[DrawRange; 8]> = draw
        .draw_ranges
        .iter()
        .filter(|range| mask & (1 << (range.child_index & 7)) != 0)
        .copied()
        .collect();
      if !draw_ranges.is_empty() {
        t.items.push(RenderItem {
          handle: mesh.handle.clone(),
          sub_mesh: draw.sub_mesh,
          draw_ranges,
        });
      }
    }
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
