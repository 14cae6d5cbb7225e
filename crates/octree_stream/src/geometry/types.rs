//! Renderer-facing geometry produced from one decoded node.
//!
//! Everything here is owned so it can cross from the decode thread to the
//! foreground by move.

use std::ops::Range;

use glam::Mat3;

use super::layout::{BufferLayout, GroupLayout};
use crate::types::{PrimitiveType, VertexAttributes, OCTANT_COUNT};

/// Members sharing this key are merged into one draw group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
  pub material_type: u8,
  pub primitive_type: PrimitiveType,
  pub attributes: VertexAttributes,
  pub num_deviation_channels: u8,
  pub child_index: u8,
}

/// One interleaved vertex buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexBuffer {
  pub layout: BufferLayout,
  pub data: Vec<u8>,
}

impl VertexBuffer {
  pub fn vertex_count(&self) -> usize {
    match self.layout.stride {
      0 => 0,
      stride => self.data.len() / stride as usize,
    }
  }
}

/// Index storage, narrowed to u16 when every vertex fits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexBuffer {
  /// Draw `count` vertices in order.
  None { count: u32 },
  U16(Vec<u16>),
  U32(Vec<u32>),
}

impl IndexBuffer {
  /// Index (or vertex, when not indexed) count.
  pub fn len(&self) -> usize {
    match self {
      Self::None { count } => *count as usize,
      Self::U16(indices) => indices.len(),
      Self::U32(indices) => indices.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_indexed(&self) -> bool {
    !matches!(self, Self::None { .. })
  }

  /// Bytes per index. Zero for non-indexed draws.
  pub fn element_size(&self) -> u32 {
    match self {
      Self::None { .. } => 0,
      Self::U16(_) => 2,
      Self::U32(_) => 4,
    }
  }

  pub fn byte_size(&self) -> usize {
    self.len() * self.element_size() as usize
  }
}

/// Span of one child octant inside a group's index (or vertex) stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawRange {
  pub child_index: u8,
  /// First index (or vertex) of the span.
  pub first: u32,
  /// Byte offset of `first` in the index buffer, or in the position buffer
  /// for non-indexed groups.
  pub byte_offset: u32,
  pub count: u32,
}

impl DrawRange {
  pub fn elements(&self) -> Range<u32> {
    self.first..self.first + self.count
  }
}

/// Contiguous vertices of one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectRange {
  pub object_id: u32,
  pub vertices: Range<u32>,
  /// Triangle span, when the format carries it and the group is triangles.
  pub triangles: Option<Range<u32>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
  pub color: [u8; 4],
  /// Index into [`NodeGeometry::textures`].
  pub texture: Option<u32>,
  pub uv_transform: Option<Mat3>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureDescriptor {
  pub width: u16,
  pub height: u16,
  /// Encoded texture format code, interpreted by the renderer.
  pub format: u8,
  pub data: Vec<u8>,
}

/// One draw group.
#[derive(Clone, Debug, PartialEq)]
pub struct SubMesh {
  pub key: GroupKey,
  pub layout: GroupLayout,
  pub vertex_buffers: Vec<VertexBuffer>,
  pub vertex_count: u32,
  pub indices: IndexBuffer,
  /// Per-triangle topology flags, when the node carries them.
  pub triangle_flags: Option<Vec<u8>>,
  /// Ascending by child index.
  pub draw_ranges: Vec<DrawRange>,
  /// Strictly ascending by object id.
  pub object_ranges: Vec<ObjectRange>,
}

impl SubMesh {
  pub fn primitive_count(&self) -> u32 {
    self.key.primitive_type.primitive_count(self.indices.len() as u32)
  }

  pub fn byte_size(&self) -> usize {
    self.vertex_buffers.iter().map(|b| b.data.len()).sum::<usize>() + self.indices.byte_size()
  }
}

/// Everything a renderer needs to draw one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeGeometry {
  pub sub_meshes: Vec<SubMesh>,
  /// Only materials referenced by some submesh, compacted.
  pub materials: Vec<Material>,
  /// Only textures referenced by some material, compacted.
  pub textures: Vec<TextureDescriptor>,
}

impl NodeGeometry {
  pub fn is_empty(&self) -> bool {
    self.sub_meshes.is_empty()
  }

  /// Primitives this node draws in each child octant. A child's
  /// `primitives_delta` is measured against this.
  pub fn primitives_per_octant(&self) -> [u64; OCTANT_COUNT] {
    let mut per_octant = [0u64; OCTANT_COUNT];
    for sub_mesh in &self.sub_meshes {
      let per_primitive = sub_mesh.key.primitive_type.vertices_per_primitive();
      for range in &sub_mesh.draw_ranges {
        per_octant[range.child_index as usize] += (range.count / per_primitive) as u64;
      }
    }
    per_octant
  }

  pub fn primitive_count(&self) -> u64 {
    self.sub_meshes.iter().map(|s| s.primitive_count() as u64).sum()
  }

  /// Bytes uploaded to the GPU: vertex and index buffers plus textures.
  pub fn gpu_bytes(&self) -> u64 {
    let meshes: usize = self.sub_meshes.iter().map(SubMesh::byte_size).sum();
    let textures: usize = self.textures.iter().map(|t| t.data.len()).sum();
    (meshes + textures) as u64
  }
}
