//! Interleaved vertex layout.
//!
//! A draw group stores up to three vertex buffers:
//!
//! ```text
//! buffer 0  Position     position16 (u16×3) | position32 (f32×3)
//! buffer 1  Attributes   material index, projected pos, tex coord, deviation,
//!                        intensity, normal, color, classification
//! buffer 2  Highlight    u8 highlight byte per vertex (groups with object ids)
//! ```
//!
//! Attributes inside a buffer are ordered by descending component size so
//! every offset is naturally aligned without padding, and the stride is
//! rounded up to the largest component. The same function sizes both the real
//! build and the pre-download cost prediction.

use smallvec::SmallVec;

use crate::types::VertexAttributes;

/// Scalar type of one attribute component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
  I8,
  U8,
  U16,
  /// IEEE 754 half float, passed through as raw bits.
  F16,
  U32,
  F32,
}

impl ComponentType {
  #[inline]
  pub const fn byte_size(self) -> u32 {
    match self {
      Self::I8 | Self::U8 => 1,
      Self::U16 | Self::F16 => 2,
      Self::U32 | Self::F32 => 4,
    }
  }
}

/// What a vertex attribute means to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexSemantic {
  Position,
  Normal,
  Color,
  TexCoord,
  ProjectedPos,
  Deviation,
  Intensity,
  Classification,
  /// Index into [`NodeGeometry::materials`](super::NodeGeometry::materials).
  MaterialIndex,
  Highlight,
}

/// Type and arity of one attribute, before placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeFormat {
  pub semantic: VertexSemantic,
  pub component: ComponentType,
  pub components: u8,
  /// Integer components map to [0, 1] / [-1, 1] in the shader.
  pub normalized: bool,
}

impl AttributeFormat {
  const fn new(semantic: VertexSemantic, component: ComponentType, components: u8, normalized: bool) -> Self {
    Self {
      semantic,
      component,
      components,
      normalized,
    }
  }

  #[inline]
  pub fn byte_size(&self) -> u32 {
    self.component.byte_size() * self.components as u32
  }
}

/// An attribute placed at a byte offset inside a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeDescriptor {
  pub format: AttributeFormat,
  pub offset: u32,
}

impl AttributeDescriptor {
  /// Byte span inside one vertex.
  #[inline]
  pub fn span(&self) -> std::ops::Range<u32> {
    self.offset..self.offset + self.format.byte_size()
  }
}

/// Role of an interleaved buffer within a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferRole {
  Position,
  Attributes,
  Highlight,
}

/// Placement of attributes inside one interleaved buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BufferLayout {
  pub role: BufferRole,
  pub attributes: SmallVec<[AttributeDescriptor; 8]>,
  pub stride: u32,
}

impl BufferLayout {
  /// Pack attributes by descending component size; stride rounded up to the
  /// largest component.
  pub fn pack(role: BufferRole, formats: impl IntoIterator<Item = AttributeFormat>) -> Self {
    let mut formats: SmallVec<[AttributeFormat; 8]> = formats.into_iter().collect();
    // Stable: equal sizes keep declaration order.
    formats.sort_by_key(|format| std::cmp::Reverse(format.component.byte_size()));

    let mut offset = 0u32;
    let mut largest = 1u32;
    let mut attributes = SmallVec::new();
    for format in formats {
      let align = format.component.byte_size();
      largest = largest.max(align);
      offset = offset.next_multiple_of(align);
      attributes.push(AttributeDescriptor { format, offset });
      offset += format.byte_size();
    }

    Self {
      role,
      attributes,
      stride: offset.next_multiple_of(largest),
    }
  }

  pub fn find(&self, semantic: VertexSemantic) -> Option<&AttributeDescriptor> {
    self.attributes.iter().find(|a| a.format.semantic == semantic)
  }
}

/// Inputs that decide a group's vertex layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayoutKey {
  /// Optional attributes actually stored (flags ∩ node columns).
  pub attributes: VertexAttributes,
  pub num_deviation_channels: u8,
  pub position32: bool,
  /// Any member references a real material.
  pub has_materials: bool,
  /// Any member carries a real object id.
  pub has_object_ids: bool,
}

/// All buffers of one draw group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupLayout {
  pub buffers: SmallVec<[BufferLayout; 3]>,
}

impl GroupLayout {
  /// Bytes per vertex summed over every buffer.
  pub fn vertex_stride(&self) -> u32 {
    self.buffers.iter().map(|b| b.stride).sum()
  }

  pub fn buffer(&self, role: BufferRole) -> Option<&BufferLayout> {
    self.buffers.iter().find(|b| b.role == role)
  }
}

/// Compute the layout for a key.
pub fn group_layout(key: &LayoutKey) -> GroupLayout {
  use ComponentType as C;
  use VertexSemantic as S;

  let mut buffers = SmallVec::new();

  let position = if key.position32 {
    AttributeFormat::new(S::Position, C::F32, 3, false)
  } else {
    AttributeFormat::new(S::Position, C::U16, 3, false)
  };
  buffers.push(BufferLayout::pack(BufferRole::Position, [position]));

  let has = |flag| key.attributes.contains(flag);
  let mut formats: SmallVec<[AttributeFormat; 8]> = SmallVec::new();
  if key.has_materials {
    formats.push(AttributeFormat::new(S::MaterialIndex, C::U32, 1, false));
  }
  if has(VertexAttributes::PROJECTED_POS) {
    formats.push(AttributeFormat::new(S::ProjectedPos, C::F32, 2, false));
  }
  if has(VertexAttributes::TEX_COORD) {
    formats.push(AttributeFormat::new(S::TexCoord, C::F16, 2, false));
  }
  if has(VertexAttributes::DEVIATION) && key.num_deviation_channels > 0 {
    formats.push(AttributeFormat::new(S::Deviation, C::F16, key.num_deviation_channels, false));
  }
  if has(VertexAttributes::INTENSITY) {
    formats.push(AttributeFormat::new(S::Intensity, C::U16, 1, true));
  }
  if has(VertexAttributes::NORMAL) {
    formats.push(AttributeFormat::new(S::Normal, C::I8, 3, true));
  }
  if has(VertexAttributes::COLOR) {
    formats.push(AttributeFormat::new(S::Color, C::U8, 4, true));
  }
  if has(VertexAttributes::CLASSIFICATION) {
    formats.push(AttributeFormat::new(S::Classification, C::U8, 1, false));
  }
  if !formats.is_empty() {
    buffers.push(BufferLayout::pack(BufferRole::Attributes, formats));
  }

  if key.has_object_ids {
    buffers.push(BufferLayout::pack(
      BufferRole::Highlight,
      [AttributeFormat::new(S::Highlight, C::U8, 1, false)],
    ));
  }

  GroupLayout { buffers }
}

#[cfg(test)]
#[path = "layout_test.rs"]
mod layout_test;
