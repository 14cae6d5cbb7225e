//! OwnedSchema - growable column storage for producing node files.
//!
//! Records are appended with `push_*` helpers and the result is viewed as a
//! borrowed [`Schema`] for encoding. Used by converters, benches and tests.

use std::ops::Range;

use glam::{DVec3, Mat3, Vec3};

use super::schema::{
  AabbColumns, ChildInfoColumns, Double3Columns, Float3Columns, Float3x3Columns, MaterialColumns,
  ProjectionRecord, RangeColumns, Schema, SphereColumns, SubMeshColumns, SubMeshProjectionColumns,
  TextureInfoColumns, TriangleColumns, VertexColumns,
};
use super::{F16Bits, FormatVersion, MAX_DEVIATION_CHANNELS, NO_INDEX};
use crate::types::{PrimitiveType, VertexAttributes};

/// One child record to append.
#[derive(Clone, Debug)]
pub struct ChildRecord {
  pub hash: [u32; 4],
  pub child_index: u8,
  pub child_mask: u8,
  pub tolerance: i8,
  pub position_bits: u8,
  pub byte_size: u32,
  pub offset: DVec3,
  pub scale: f32,
  pub bounds_min: Vec3,
  pub bounds_max: Vec3,
  pub sphere_center: Vec3,
  pub sphere_radius: f32,
  /// Range into the projection group.
  pub projections: Range<u32>,
  /// Object ids found below this child; appended to the shared pool.
  pub descendant_object_ids: Vec<u32>,
}

impl Default for ChildRecord {
  fn default() -> Self {
    Self {
      hash: [0; 4],
      child_index: 0,
      child_mask: 0,
      tolerance: 0,
      position_bits: 16,
      byte_size: 0,
      offset: DVec3::ZERO,
      scale: 1.0,
      bounds_min: Vec3::ZERO,
      bounds_max: Vec3::ONE,
      sphere_center: Vec3::splat(0.5),
      sphere_radius: 3f32.sqrt() * 0.5,
      projections: 0..0,
      descendant_object_ids: Vec::new(),
    }
  }
}

/// Every attribute one vertex may carry; only enabled columns are stored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VertexRecord {
  pub position: [f32; 3],
  pub normal: [i8; 3],
  pub color: [u8; 4],
  pub tex_coord: [F16Bits; 2],
  pub projected_pos: [f32; 2],
  pub deviation: [F16Bits; MAX_DEVIATION_CHANNELS],
  pub intensity: u16,
  pub classification: u8,
}

impl VertexRecord {
  pub fn at(position: [f32; 3]) -> Self {
    Self {
      position,
      ..Default::default()
    }
  }
}

/// One submesh to append with its vertices and local indices.
#[derive(Clone, Debug)]
pub struct SubMeshInput {
  pub child_index: u8,
  pub object_id: u32,
  pub material_index: u32,
  pub material_type: u8,
  pub primitive_type: PrimitiveType,
  pub attributes: VertexAttributes,
  pub num_deviation_channels: u8,
  pub vertices: Vec<VertexRecord>,
  /// Indices local to this submesh's vertices. Empty for non-indexed.
  pub indices: Vec<u32>,
  /// One entry per triangle when topology flags are enabled.
  pub triangle_flags: Vec<u8>,
}

impl Default for SubMeshInput {
  fn default() -> Self {
    Self {
      child_index: 0,
      object_id: NO_INDEX,
      material_index: NO_INDEX,
      material_type: 0,
      primitive_type: PrimitiveType::Triangles,
      attributes: VertexAttributes::empty(),
      num_deviation_channels: 0,
      vertices: Vec::new(),
      indices: Vec::new(),
      triangle_flags: Vec::new(),
    }
  }
}

type Columns<T, const N: usize> = [Vec<T>; N];

/// Owned columns for every field group.
#[derive(Clone, Debug, Default)]
pub struct OwnedSchema {
  position32: bool,
  vertex_columns: VertexAttributes,
  triangle_flags_enabled: bool,
  descendants_enabled: bool,

  child_hash: Columns<u32, 4>,
  child_index: Vec<u8>,
  child_mask: Vec<u8>,
  tolerance: Vec<i8>,
  position_bits: Vec<u8>,
  total_byte_size: Vec<u32>,
  offset: Columns<f64, 3>,
  scale: Vec<f32>,
  bounds_min: Columns<f32, 3>,
  bounds_max: Columns<f32, 3>,
  sphere_center: Columns<f32, 3>,
  sphere_radius: Vec<f32>,
  projection_range: Columns<u32, 2>,
  descendant_range: Columns<u32, 2>,
  descendant_object_ids: Vec<u32>,

  proj_object_id: Vec<u32>,
  proj_material_type: Vec<u8>,
  proj_primitive_type: Vec<u8>,
  proj_attributes: Vec<u16>,
  proj_num_indices: Vec<u32>,
  proj_num_vertices: Vec<u32>,
  proj_num_texture_bytes: Vec<u32>,
  proj_deviation_channels: Vec<u8>,
  proj_has_material: Vec<u8>,

  sm_child_index: Vec<u8>,
  sm_material_type: Vec<u8>,
  sm_primitive_type: Vec<u8>,
  sm_deviation_channels: Vec<u8>,
  sm_attributes: Vec<u16>,
  sm_object_id: Vec<u32>,
  sm_material_index: Vec<u32>,
  sm_vertices: Columns<u32, 2>,
  sm_indices: Columns<u32, 2>,

  mat_color: Columns<u8, 4>,
  mat_texture_index: Vec<u32>,
  mat_uv: [Columns<f32, 3>; 3],

  tex_width: Vec<u16>,
  tex_height: Vec<u16>,
  tex_format: Vec<u8>,
  tex_range: Columns<u32, 2>,
  texture_data: Vec<u8>,

  position16: Columns<u16, 3>,
  position: Columns<f32, 3>,
  normal: Columns<i8, 3>,
  color: Columns<u8, 4>,
  tex_coord: Columns<F16Bits, 2>,
  projected_pos: Columns<f32, 2>,
  deviation: Columns<F16Bits, MAX_DEVIATION_CHANNELS>,
  intensity: Vec<u16>,
  classification: Vec<u8>,
  triangle_flags: Vec<u8>,
  vertex_index: Vec<u32>,
}

impl OwnedSchema {
  /// Empty schema storing the given vertex columns.
  ///
  /// `position32` selects float positions; otherwise positions are rounded
  /// into 16-bit columns.
  pub fn new(vertex_columns: VertexAttributes, position32: bool) -> Self {
    Self {
      position32,
      vertex_columns,
      ..Default::default()
    }
  }

  /// Also store per-triangle topology flags.
  pub fn with_triangle_flags(mut self) -> Self {
    self.triangle_flags_enabled = true;
    self
  }

  /// Also store per-child descendant object id ranges.
  pub fn with_descendants(mut self) -> Self {
    self.descendants_enabled = true;
    self
  }

  pub fn push_child(&mut self, child: ChildRecord) {
    for (column, word) in self.child_hash.iter_mut().zip(child.hash) {
      column.push(word);
    }
    self.child_index.push(child.child_index);
    self.child_mask.push(child.child_mask);
    self.tolerance.push(child.tolerance);
    self.position_bits.push(child.position_bits);
    self.total_byte_size.push(child.byte_size);
    push3(&mut self.offset, child.offset.to_array());
    self.scale.push(child.scale);
    push3(&mut self.bounds_min, child.bounds_min.to_array());
    push3(&mut self.bounds_max, child.bounds_max.to_array());
    push3(&mut self.sphere_center, child.sphere_center.to_array());
    self.sphere_radius.push(child.sphere_radius);
    self.projection_range[0].push(child.projections.start);
    self.projection_range[1].push(child.projections.end);
    let mut descendants = child.descendant_object_ids;
    descendants.sort_unstable();
    descendants.dedup();
    self.descendant_range[0].push(self.descendant_object_ids.len() as u32);
    self.descendant_object_ids.extend(descendants);
    self.descendant_range[1].push(self.descendant_object_ids.len() as u32);
  }

  /// Append a projection, returning its index.
  pub fn push_projection(&mut self, projection: ProjectionRecord) -> u32 {
    let index = self.proj_object_id.len() as u32;
    self.proj_object_id.push(projection.object_id);
    self.proj_material_type.push(projection.material_type);
    self.proj_primitive_type.push(projection.primitive_type as u8);
    self.proj_attributes.push(projection.attributes.bits());
    self.proj_num_indices.push(projection.num_indices);
    self.proj_num_vertices.push(projection.num_vertices);
    self.proj_num_texture_bytes.push(projection.num_texture_bytes);
    self.proj_deviation_channels.push(projection.num_deviation_channels);
    self.proj_has_material.push(projection.has_material as u8);
    index
  }

  /// Append a material, returning its index.
  pub fn push_material(&mut self, color: [u8; 4], texture_index: u32, uv_transform: Mat3) -> u32 {
    let index = self.mat_texture_index.len() as u32;
    for (column, value) in self.mat_color.iter_mut().zip(color) {
      column.push(value);
    }
    self.mat_texture_index.push(texture_index);
    let cols = uv_transform.to_cols_array_2d();
    for (columns, col) in self.mat_uv.iter_mut().zip(cols) {
      push3(columns, col);
    }
    index
  }

  /// Append a texture with its encoded bytes, returning its index.
  pub fn push_texture(&mut self, width: u16, height: u16, format: u8, data: &[u8]) -> u32 {
    let index = self.tex_width.len() as u32;
    self.tex_width.push(width);
    self.tex_height.push(height);
    self.tex_format.push(format);
    self.tex_range[0].push(self.texture_data.len() as u32);
    self.texture_data.extend_from_slice(data);
    self.tex_range[1].push(self.texture_data.len() as u32);
    index
  }

  /// Append a submesh and its vertices, returning its index.
  pub fn push_sub_mesh(&mut self, input: SubMeshInput) -> u32 {
    let index = self.sm_child_index.len() as u32;
    let vertex_begin = self.position[0].len() as u32;
    let index_begin = self.vertex_index.len() as u32;

    self.sm_child_index.push(input.child_index);
    self.sm_material_type.push(input.material_type);
    self.sm_primitive_type.push(input.primitive_type as u8);
    self.sm_deviation_channels.push(input.num_deviation_channels);
    self.sm_attributes.push(input.attributes.bits());
    self.sm_object_id.push(input.object_id);
    self.sm_material_index.push(input.material_index);

    for vertex in &input.vertices {
      self.push_vertex(vertex);
    }
    self.vertex_index.extend_from_slice(&input.indices);
    if self.triangle_flags_enabled && input.primitive_type == PrimitiveType::Triangles {
      let elements = if input.indices.is_empty() {
        input.vertices.len()
      } else {
        input.indices.len()
      };
      for t in 0..elements / 3 {
        self.triangle_flags.push(input.triangle_flags.get(t).copied().unwrap_or(0));
      }
    }

    self.sm_vertices[0].push(vertex_begin);
    self.sm_vertices[1].push(self.position[0].len() as u32);
    self.sm_indices[0].push(index_begin);
    self.sm_indices[1].push(self.vertex_index.len() as u32);
    index
  }

  fn push_vertex(&mut self, v: &VertexRecord) {
    push3(&mut self.position, v.position);
    push3(
      &mut self.position16,
      v.position.map(|c| c.round().clamp(0.0, u16::MAX as f32) as u16),
    );
    push_n(&mut self.normal, v.normal);
    push_n(&mut self.color, v.color);
    push_n(&mut self.tex_coord, v.tex_coord);
    push_n(&mut self.projected_pos, v.projected_pos);
    push_n(&mut self.deviation, v.deviation);
    self.intensity.push(v.intensity);
    self.classification.push(v.classification);
  }

  pub fn vertex_count(&self) -> usize {
    self.position[0].len()
  }

  /// Borrow the columns as a schema of `version`.
  pub fn as_schema(&self, version: FormatVersion) -> Schema<'_> {
    let has = |attribute| self.vertex_columns.contains(attribute);
    let child_info = ChildInfoColumns {
      len: self.child_index.len(),
      hash: version.has_hash_ids().then(|| slices(&self.child_hash)),
      child_index: &self.child_index,
      child_mask: &self.child_mask,
      tolerance: &self.tolerance,
      position_bits: Some(&self.position_bits),
      total_byte_size: &self.total_byte_size,
      offset: Double3Columns {
        x: &self.offset[0],
        y: &self.offset[1],
        z: &self.offset[2],
      },
      scale: &self.scale,
      bounds: AabbColumns {
        min: float3(&self.bounds_min),
        max: float3(&self.bounds_max),
      },
      sphere: SphereColumns {
        center: float3(&self.sphere_center),
        radius: &self.sphere_radius,
      },
      sub_mesh_projections: range(&self.projection_range),
      descendant_object_ids: (self.descendants_enabled && version == FormatVersion::Current)
        .then(|| range(&self.descendant_range)),
    };

    Schema {
      version,
      child_info,
      sub_mesh_projection: SubMeshProjectionColumns {
        len: self.proj_object_id.len(),
        object_id: &self.proj_object_id,
        material_type: &self.proj_material_type,
        primitive_type: &self.proj_primitive_type,
        attributes: &self.proj_attributes,
        num_indices: &self.proj_num_indices,
        num_vertices: &self.proj_num_vertices,
        num_texture_bytes: Some(&self.proj_num_texture_bytes),
        num_deviation_channels: Some(&self.proj_deviation_channels),
        has_material: Some(&self.proj_has_material),
      },
      sub_mesh: SubMeshColumns {
        len: self.sm_child_index.len(),
        child_index: &self.sm_child_index,
        material_type: &self.sm_material_type,
        primitive_type: &self.sm_primitive_type,
        num_deviation_channels: Some(&self.sm_deviation_channels),
        attributes: &self.sm_attributes,
        object_id: &self.sm_object_id,
        material_index: &self.sm_material_index,
        vertices: range(&self.sm_vertices),
        indices: range(&self.sm_indices),
      },
      material: MaterialColumns {
        len: self.mat_texture_index.len(),
        color: slices(&self.mat_color),
        texture_index: Some(&self.mat_texture_index),
        uv_transform: Some(Float3x3Columns {
          cols: [
            float3(&self.mat_uv[0]),
            float3(&self.mat_uv[1]),
            float3(&self.mat_uv[2]),
          ],
        }),
      },
      texture_info: TextureInfoColumns {
        len: self.tex_width.len(),
        width: &self.tex_width,
        height: &self.tex_height,
        format: &self.tex_format,
        data: range(&self.tex_range),
      },
      texture_data: &self.texture_data,
      vertex: VertexColumns {
        len: self.vertex_count(),
        position16: (!self.position32).then(|| slices(&self.position16)),
        position32: self.position32.then(|| slices(&self.position)),
        normal: has(VertexAttributes::NORMAL).then(|| slices(&self.normal)),
        color: has(VertexAttributes::COLOR).then(|| slices(&self.color)),
        tex_coord: has(VertexAttributes::TEX_COORD).then(|| slices(&self.tex_coord)),
        projected_pos: has(VertexAttributes::PROJECTED_POS).then(|| slices(&self.projected_pos)),
        deviation: has(VertexAttributes::DEVIATION).then(|| slices(&self.deviation)),
        intensity: has(VertexAttributes::INTENSITY).then_some(&self.intensity[..]),
        classification: has(VertexAttributes::CLASSIFICATION).then_some(&self.classification[..]),
      },
      triangle: TriangleColumns {
        len: if self.triangle_flags_enabled {
          self.triangle_flags.len()
        } else {
          0
        },
        flags: self.triangle_flags_enabled.then_some(&self.triangle_flags[..]),
      },
      vertex_index: &self.vertex_index,
      descendant_object_ids: &self.descendant_object_ids,
    }
  }
}

fn push3<T: Copy>(columns: &mut Columns<T, 3>, values: [T; 3]) {
  push_n(columns, values);
}

fn push_n<T: Copy, const N: usize>(columns: &mut Columns<T, N>, values: [T; N]) {
  for (column, value) in columns.iter_mut().zip(values) {
    column.push(value);
  }
}

fn slices<T, const N: usize>(columns: &Columns<T, N>) -> [&[T]; N] {
  std::array::from_fn(|i| &columns[i][..])
}

fn float3(columns: &Columns<f32, 3>) -> Float3Columns<'_> {
  Float3Columns {
    x: &columns[0],
    y: &columns[1],
    z: &columns[2],
  }
}

fn range(columns: &Columns<u32, 2>) -> RangeColumns<'_> {
  RangeColumns {
    begin: &columns[0],
    end: &columns[1],
  }
}
