//! Schema - decoded struct-of-arrays view of one node buffer.
//!
//! Every column borrows directly from the [`NodeBuffer`](super::NodeBuffer).
//! Optional columns are `None` when their presence flag was zero; callers
//! branch on presence rather than reading zeroes.

use std::ops::Range;

use glam::{DVec3, Mat3, Vec3};

use super::{ColumnVisitor, DecodeError, F16Bits, FormatVersion, MAX_DEVIATION_CHANNELS, NO_INDEX};
use crate::types::{PrimitiveType, VertexAttributes};

// =============================================================================
// Nested fixed-size records (stored as parallel columns)
// =============================================================================

#[derive(Clone, Copy, Debug, Default)]
pub struct Float3Columns<'a> {
  pub x: &'a [f32],
  pub y: &'a [f32],
  pub z: &'a [f32],
}

impl<'a> Float3Columns<'a> {
  #[inline]
  pub fn get(&self, i: usize) -> Vec3 {
    Vec3::new(self.x[i], self.y[i], self.z[i])
  }

  pub fn visit<V: ColumnVisitor<'a>>(&mut self, v: &mut V, count: usize) -> Result<(), DecodeError> {
    v.column(count, &mut self.x)?;
    v.column(count, &mut self.y)?;
    v.column(count, &mut self.z)
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Double3Columns<'a> {
  pub x: &'a [f64],
  pub y: &'a [f64],
  pub z: &'a [f64],
}

impl<'a> Double3Columns<'a> {
  #[inline]
  pub fn get(&self, i: usize) -> DVec3 {
    DVec3::new(self.x[i], self.y[i], self.z[i])
  }

  pub fn visit<V: ColumnVisitor<'a>>(&mut self, v: &mut V, count: usize) -> Result<(), DecodeError> {
    v.column(count, &mut self.x)?;
    v.column(count, &mut self.y)?;
    v.column(count, &mut self.z)
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AabbColumns<'a> {
  pub min: Float3Columns<'a>,
  pub max: Float3Columns<'a>,
}

impl<'a> AabbColumns<'a> {
  pub fn visit<V: ColumnVisitor<'a>>(&mut self, v: &mut V, count: usize) -> Result<(), DecodeError> {
    self.min.visit(v, count)?;
    self.max.visit(v, count)
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SphereColumns<'a> {
  pub center: Float3Columns<'a>,
  pub radius: &'a [f32],
}

impl<'a> SphereColumns<'a> {
  pub fn visit<V: ColumnVisitor<'a>>(&mut self, v: &mut V, count: usize) -> Result<(), DecodeError> {
    self.center.visit(v, count)?;
    v.column(count, &mut self.radius)
  }
}

/// Column-major 3×3 matrix as nine parallel columns.
#[derive(Clone, Copy, Debug, Default)]
pub struct Float3x3Columns<'a> {
  pub cols: [Float3Columns<'a>; 3],
}

impl<'a> Float3x3Columns<'a> {
  pub fn get(&self, i: usize) -> Mat3 {
    Mat3::from_cols(self.cols[0].get(i), self.cols[1].get(i), self.cols[2].get(i))
  }

  pub fn visit<V: ColumnVisitor<'a>>(&mut self, v: &mut V, count: usize) -> Result<(), DecodeError> {
    for col in &mut self.cols {
      col.visit(v, count)?;
    }
    Ok(())
  }
}

/// Half-open `[begin, end)` index ranges into another group.
#[derive(Clone, Copy, Debug, Default)]
pub struct RangeColumns<'a> {
  pub begin: &'a [u32],
  pub end: &'a [u32],
}

impl<'a> RangeColumns<'a> {
  #[inline]
  pub fn get(&self, i: usize) -> Range<usize> {
    self.begin[i] as usize..self.end[i] as usize
  }

  pub fn visit<V: ColumnVisitor<'a>>(&mut self, v: &mut V, count: usize) -> Result<(), DecodeError> {
    v.column(count, &mut self.begin)?;
    v.column(count, &mut self.end)
  }

  pub fn visit_optional<V: ColumnVisitor<'a>>(
    slot: &mut Option<Self>,
    v: &mut V,
    present: bool,
    count: usize,
  ) -> Result<(), DecodeError> {
    if !present {
      *slot = None;
      return Ok(());
    }
    let mut ranges = slot.unwrap_or_default();
    ranges.visit(v, count)?;
    *slot = Some(ranges);
    Ok(())
  }

  fn check(&self, what: &'static str, limit: usize) -> Result<(), DecodeError> {
    for (&begin, &end) in self.begin.iter().zip(self.end) {
      check_range(what, begin, end, limit)?;
    }
    Ok(())
  }
}

fn check_index(what: &'static str, index: u32, limit: usize) -> Result<(), DecodeError> {
  if index as usize >= limit {
    return Err(DecodeError::InvalidRange {
      what,
      begin: index,
      end: index.saturating_add(1),
      limit,
    });
  }
  Ok(())
}

fn check_range(what: &'static str, begin: u32, end: u32, limit: usize) -> Result<(), DecodeError> {
  if begin > end || end as usize > limit {
    return Err(DecodeError::InvalidRange {
      what,
      begin,
      end,
      limit,
    });
  }
  Ok(())
}

// =============================================================================
// Field groups
// =============================================================================

/// Per-child records of the node's octree children.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChildInfoColumns<'a> {
  pub len: usize,
  /// 128-bit content hash as four u32 words (current format only).
  pub hash: Option<[&'a [u32]; 4]>,
  pub child_index: &'a [u8],
  pub child_mask: &'a [u8],
  pub tolerance: &'a [i8],
  /// Quantization bits of 16-bit positions (absent in LTS, implied 16).
  pub position_bits: Option<&'a [u8]>,
  pub total_byte_size: &'a [u32],
  pub offset: Double3Columns<'a>,
  pub scale: &'a [f32],
  pub bounds: AabbColumns<'a>,
  pub sphere: SphereColumns<'a>,
  pub sub_mesh_projections: RangeColumns<'a>,
  pub descendant_object_ids: Option<RangeColumns<'a>>,
}

impl ChildInfoColumns<'_> {
  /// Lowercase hex of the content hash, most significant word first.
  pub fn hash_hex(&self, i: usize) -> Option<String> {
    self
      .hash
      .map(|words| format!("{:08x}{:08x}{:08x}{:08x}", words[0][i], words[1][i], words[2][i], words[3][i]))
  }

  pub fn position_bits(&self, i: usize) -> u8 {
    self.position_bits.map_or(16, |bits| bits[i])
  }
}

/// One cost-prediction entry, readable before the child is downloaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProjectionRecord {
  pub object_id: u32,
  pub material_type: u8,
  pub primitive_type: PrimitiveType,
  pub attributes: VertexAttributes,
  pub num_indices: u32,
  pub num_vertices: u32,
  pub num_texture_bytes: u32,
  pub num_deviation_channels: u8,
  /// The submesh references a material, so its group carries a per-vertex
  /// material index.
  pub has_material: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SubMeshProjectionColumns<'a> {
  pub len: usize,
  pub object_id: &'a [u32],
  pub material_type: &'a [u8],
  pub primitive_type: &'a [u8],
  pub attributes: &'a [u16],
  pub num_indices: &'a [u32],
  pub num_vertices: &'a [u32],
  pub num_texture_bytes: Option<&'a [u32]>,
  pub num_deviation_channels: Option<&'a [u8]>,
  pub has_material: Option<&'a [u8]>,
}

impl SubMeshProjectionColumns<'_> {
  pub fn get(&self, i: usize) -> ProjectionRecord {
    ProjectionRecord {
      object_id: self.object_id[i],
      material_type: self.material_type[i],
      primitive_type: PrimitiveType::from_raw(self.primitive_type[i]),
      attributes: VertexAttributes::from_bits_truncate(self.attributes[i]),
      num_indices: self.num_indices[i],
      num_vertices: self.num_vertices[i],
      num_texture_bytes: self.num_texture_bytes.map_or(0, |bytes| bytes[i]),
      num_deviation_channels: self.num_deviation_channels.map_or(0, |channels| channels[i]),
      // LTS does not record it: any non-zero material type is taken as
      // referencing a material.
      has_material: self
        .has_material
        .map_or(self.material_type[i] != 0, |flags| flags[i] != 0),
    }
  }
}

/// One decoded submesh: a run of vertices (and optionally indices) of a
/// single object in a single child octant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubMeshRecord {
  pub child_index: u8,
  pub object_id: u32,
  pub material_index: u32,
  pub material_type: u8,
  pub primitive_type: PrimitiveType,
  pub attributes: VertexAttributes,
  pub num_deviation_channels: u8,
  pub vertices: Range<usize>,
  pub indices: Range<usize>,
}

impl SubMeshRecord {
  pub fn has_object_id(&self) -> bool {
    self.object_id != NO_INDEX
  }

  pub fn has_material(&self) -> bool {
    self.material_index != NO_INDEX
  }

  /// Entries this submesh owns in the triangle group: one per triangle of a
  /// triangle submesh, indexed or not, none otherwise.
  pub fn triangle_count(&self) -> usize {
    if self.primitive_type != PrimitiveType::Triangles {
      return 0;
    }
    if self.indices.is_empty() {
      self.vertices.len() / 3
    } else {
      self.indices.len() / 3
    }
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SubMeshColumns<'a> {
  pub len: usize,
  pub child_index: &'a [u8],
  pub material_type: &'a [u8],
  pub primitive_type: &'a [u8],
  pub num_deviation_channels: Option<&'a [u8]>,
  pub attributes: &'a [u16],
  pub object_id: &'a [u32],
  pub material_index: &'a [u32],
  pub vertices: RangeColumns<'a>,
  pub indices: RangeColumns<'a>,
}

impl SubMeshColumns<'_> {
  pub fn get(&self, i: usize) -> SubMeshRecord {
    SubMeshRecord {
      child_index: self.child_index[i],
      object_id: self.object_id[i],
      material_index: self.material_index[i],
      material_type: self.material_type[i],
      primitive_type: PrimitiveType::from_raw(self.primitive_type[i]),
      attributes: VertexAttributes::from_bits_truncate(self.attributes[i]),
      num_deviation_channels: self.num_deviation_channels.map_or(0, |channels| channels[i]),
      vertices: self.vertices.get(i),
      indices: self.indices.get(i),
    }
  }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MaterialColumns<'a> {
  pub len: usize,
  /// RGBA8 base colour.
  pub color: [&'a [u8]; 4],
  pub texture_index: Option<&'a [u32]>,
  /// UV transform (current format only).
  pub uv_transform: Option<Float3x3Columns<'a>>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TextureInfoColumns<'a> {
  pub len: usize,
  pub width: &'a [u16],
  pub height: &'a [u16],
  pub format: &'a [u8],
  /// Byte range into `Schema::texture_data`.
  pub data: RangeColumns<'a>,
}

/// Per-vertex attribute columns. Exactly one of the position encodings is
/// present whenever the node has vertices.
#[derive(Clone, Copy, Debug, Default)]
pub struct VertexColumns<'a> {
  pub len: usize,
  pub position16: Option<[&'a [u16]; 3]>,
  pub position32: Option<[&'a [f32]; 3]>,
  /// Signed-normalized normal.
  pub normal: Option<[&'a [i8]; 3]>,
  pub color: Option<[&'a [u8]; 4]>,
  pub tex_coord: Option<[&'a [F16Bits]; 2]>,
  pub projected_pos: Option<[&'a [f32]; 2]>,
  pub deviation: Option<[&'a [F16Bits]; MAX_DEVIATION_CHANNELS]>,
  pub intensity: Option<&'a [u16]>,
  pub classification: Option<&'a [u8]>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TriangleColumns<'a> {
  pub len: usize,
  /// Per-triangle topology flags (edge visibility bits).
  pub flags: Option<&'a [u8]>,
}

// =============================================================================
// Schema
// =============================================================================

/// Decoded node: struct-of-arrays over every field group.
#[derive(Clone, Debug)]
pub struct Schema<'a> {
  pub version: FormatVersion,
  pub child_info: ChildInfoColumns<'a>,
  pub sub_mesh_projection: SubMeshProjectionColumns<'a>,
  pub sub_mesh: SubMeshColumns<'a>,
  pub material: MaterialColumns<'a>,
  pub texture_info: TextureInfoColumns<'a>,
  pub texture_data: &'a [u8],
  pub vertex: VertexColumns<'a>,
  pub triangle: TriangleColumns<'a>,
  pub vertex_index: &'a [u32],
  pub descendant_object_ids: &'a [u32],
}

impl<'a> Schema<'a> {
  /// Schema with every group empty, ready to be filled by a reader.
  pub fn empty(version: FormatVersion) -> Self {
    Self {
      version,
      child_info: Default::default(),
      sub_mesh_projection: Default::default(),
      sub_mesh: Default::default(),
      material: Default::default(),
      texture_info: Default::default(),
      texture_data: &[],
      vertex: Default::default(),
      triangle: Default::default(),
      vertex_index: &[],
      descendant_object_ids: &[],
    }
  }

  /// Vertex position as f32, whichever encoding is stored.
  pub fn position(&self, i: usize) -> Option<Vec3> {
    if let Some([x, y, z]) = self.vertex.position32 {
      return Some(Vec3::new(x[i], y[i], z[i]));
    }
    self
      .vertex
      .position16
      .map(|[x, y, z]| Vec3::new(x[i] as f32, y[i] as f32, z[i] as f32))
  }

  /// Descendant object ids of child `i`, if the node carries them.
  pub fn descendant_object_ids(&self, i: usize) -> Option<&'a [u32]> {
    self
      .child_info
      .descendant_object_ids
      .map(|ranges| &self.descendant_object_ids[ranges.get(i)])
  }

  /// Cross-group consistency: every stored range points inside its target
  /// group and every vertex index stays inside its submesh.
  pub fn validate(&self) -> Result<(), DecodeError> {
    let children = &self.child_info;
    for &octant in children.child_index {
      check_index("child index", octant as u32, 8)?;
    }
    children
      .sub_mesh_projections
      .check("sub mesh projection", self.sub_mesh_projection.len)?;
    for &raw in self.sub_mesh_projection.primitive_type {
      check_index("projection primitive type", raw as u32, PrimitiveType::COUNT)?;
    }
    if let Some(channels) = self.sub_mesh_projection.num_deviation_channels {
      for &channels in channels {
        check_range("projection deviation channel", 0, channels as u32, MAX_DEVIATION_CHANNELS)?;
      }
    }
    if let Some(ranges) = &children.descendant_object_ids {
      ranges.check("descendant object id", self.descendant_object_ids.len())?;
    }

    let sub_meshes = &self.sub_mesh;
    sub_meshes.vertices.check("vertex", self.vertex.len)?;
    sub_meshes.indices.check("vertex index", self.vertex_index.len())?;
    for i in 0..sub_meshes.len {
      check_index("sub mesh child index", sub_meshes.child_index[i] as u32, 8)?;
      check_index("primitive type", sub_meshes.primitive_type[i] as u32, PrimitiveType::COUNT)?;
      let material = sub_meshes.material_index[i];
      if material != NO_INDEX {
        check_index("material", material, self.material.len)?;
      }
      if let Some(channels) = sub_meshes.num_deviation_channels {
        let channels = channels[i] as u32;
        check_range("deviation channel", 0, channels, MAX_DEVIATION_CHANNELS)?;
      }
      let vertex_count = sub_meshes.vertices.get(i).len();
      for &index in &self.vertex_index[sub_meshes.indices.get(i)] {
        check_index("local vertex index", index, vertex_count)?;
      }
    }

    if self.triangle.flags.is_some() {
      let triangles: usize = (0..sub_meshes.len).map(|i| sub_meshes.get(i).triangle_count()).sum();
      if triangles != self.triangle.len {
        return Err(DecodeError::ColumnLength {
          expected: triangles,
          actual: self.triangle.len,
        });
      }
    }

    if let Some(textures) = self.material.texture_index {
      for &texture in textures.iter().filter(|&&t| t != NO_INDEX) {
        check_index("texture", texture, self.texture_info.len)?;
      }
    }
    self
      .texture_info
      .data
      .check("texture data", self.texture_data.len())?;
    Ok(())
  }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod schema_test;
