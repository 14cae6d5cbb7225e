//! Core value types shared by the format, geometry and octree layers.

use glam::DVec3;

use crate::octree::bounds::{BoundingSphere, DAabb3};

/// Number of octants in a cube split.
pub const OCTANT_COUNT: usize = 8;

/// Child mask with every octant set (synthetic root).
pub const FULL_CHILD_MASK: u8 = 0xFF;

/// Primitive topology of a submesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveType {
  Points = 0,
  Lines = 1,
  Triangles = 2,
}

impl PrimitiveType {
  /// Number of valid raw values.
  pub const COUNT: usize = 3;

  /// Map a raw column value. Values are range-checked during schema
  /// validation, so unknown values only reach here from unvalidated input.
  pub fn from_raw(raw: u8) -> Self {
    match raw {
      0 => Self::Points,
      1 => Self::Lines,
      _ => Self::Triangles,
    }
  }

  /// Vertices (or indices) consumed per primitive.
  pub fn vertices_per_primitive(&self) -> u32 {
    match self {
      Self::Points => 1,
      Self::Lines => 2,
      Self::Triangles => 3,
    }
  }

  /// Primitive count for `elements` indices or vertices.
  pub fn primitive_count(&self, elements: u32) -> u32 {
    elements / self.vertices_per_primitive()
  }
}

bitflags::bitflags! {
  /// Optional per-vertex attributes a submesh carries beyond its position.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
  pub struct VertexAttributes: u16 {
    const NORMAL         = 0b0000_0001;
    const COLOR          = 0b0000_0010;
    const TEX_COORD      = 0b0000_0100;
    const PROJECTED_POS  = 0b0000_1000;
    const DEVIATION      = 0b0001_0000;
    const INTENSITY      = 0b0010_0000;
    const CLASSIFICATION = 0b0100_0000;
  }
}

/// Immutable descriptor of one octree child, produced when its parent is
/// decoded. Enough to decide visibility and cost before downloading it.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeData {
  /// Content hash (current format) or hierarchical radix-32 path (legacy).
  pub id: String,
  /// Octant of this node inside its parent (0-7).
  pub child_index: u8,
  /// Bitmask of this node's own octants that contain geometry.
  pub child_mask: u8,
  /// log2 of the node's geometric error.
  pub tolerance: i8,
  /// Exact uncompressed size of the node file.
  pub byte_size: u32,
  /// Quantization bits of 16-bit positions.
  pub position_bits: u8,
  /// Model-to-world translation.
  pub offset: DVec3,
  /// Model-to-world scale of quantized positions.
  pub scale: f32,
  /// World-space bounds, offset applied.
  pub bounds: DAabb3,
  pub sphere: BoundingSphere,
  /// Predicted primitive count after filtering.
  pub primitives: u64,
  /// Primitives beyond what the parent already renders in this octant. May
  /// be negative.
  pub primitives_delta: i64,
  /// Predicted GPU upload size.
  pub gpu_bytes: u64,
  /// Every object id found anywhere below this node.
  pub descendant_object_ids: Option<Vec<u32>>,
}

impl NodeData {
  /// Synthetic descriptor for the scene root, as supplied by a manifest.
  pub fn root(id: impl Into<String>, byte_size: u32, bounds: DAabb3, tolerance: i8) -> Self {
    Self {
      id: id.into(),
      child_index: 0,
      child_mask: FULL_CHILD_MASK,
      tolerance,
      byte_size,
      position_bits: 16,
      offset: DVec3::ZERO,
      scale: 1.0,
      sphere: BoundingSphere::from_aabb(&bounds),
      bounds,
      primitives: 0,
      primitives_delta: 0,
      gpu_bytes: 0,
      descendant_object_ids: None,
    }
  }

  #[inline]
  pub fn has_child(&self, octant: u8) -> bool {
    self.child_mask & (1 << octant) != 0
  }

  /// Whether `object_id` can occur in this subtree. Without descendant ids
  /// every object may. Ids are kept sorted.
  pub fn may_contain_object(&self, object_id: u32) -> bool {
    self
      .descendant_object_ids
      .as_ref()
      .map_or(true, |ids| ids.binary_search(&object_id).is_ok())
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
