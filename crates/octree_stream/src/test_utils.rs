//! Test utilities shared across modules.
//!
//! Builds small synthetic nodes with known contents so each stage (decode,
//! geometry, pipeline, octree) can be checked against hand-computed values.

use glam::{DVec3, Mat3, Vec3};

use crate::format::schema::ProjectionRecord;
use crate::format::{
  ChildRecord, FormatVersion, NodeBuffer, OwnedSchema, SchemaDecoder, SubMeshInput, VertexRecord,
  NO_INDEX,
};
use crate::types::{PrimitiveType, VertexAttributes};

/// Object ids used by [`sample_node`].
pub const OBJECT_A: u32 = 3;
pub const OBJECT_B: u32 = 7;
pub const OBJECT_C: u32 = 9;

/// A node with two children (octants 0 and 3), one material, one texture and
/// four submeshes:
///
/// | # | octant | object | material | topology  | vertices | indices |
/// |---|--------|--------|----------|-----------|----------|---------|
/// | 0 | 0      | B      | 0        | triangles | 4        | 6       |
/// | 1 | 0      | A      | none     | triangles | 3        | 3       |
/// | 2 | 3      | C      | none     | points    | 5        | 0       |
/// | 3 | 0      | A      | none     | triangles | 3        | 3       |
pub fn sample_node() -> OwnedSchema {
  let mut node = OwnedSchema::new(VertexAttributes::NORMAL | VertexAttributes::COLOR, false)
    .with_triangle_flags()
    .with_descendants();

  let triangles = VertexAttributes::NORMAL | VertexAttributes::COLOR;
  node.push_projection(projection(OBJECT_A, PrimitiveType::Triangles, triangles, 6, 6));
  node.push_projection(projection(OBJECT_B, PrimitiveType::Triangles, triangles, 6, 4));
  node.push_projection(projection(OBJECT_C, PrimitiveType::Points, VertexAttributes::COLOR, 0, 5));

  node.push_child(ChildRecord {
    hash: [0xdead_beef, 0, 1, 0x0123_4567],
    child_index: 0,
    child_mask: 0b0000_0011,
    tolerance: -2,
    byte_size: 4096,
    offset: DVec3::new(100.0, 0.0, 0.0),
    scale: 0.5,
    bounds_min: Vec3::ZERO,
    bounds_max: Vec3::splat(8.0),
    sphere_center: Vec3::splat(4.0),
    sphere_radius: 48f32.sqrt(),
    projections: 0..2,
    descendant_object_ids: vec![OBJECT_B, OBJECT_A],
    ..Default::default()
  });
  node.push_child(ChildRecord {
    hash: [1, 2, 3, 4],
    child_index: 3,
    child_mask: 0,
    tolerance: -2,
    byte_size: 512,
    bounds_min: Vec3::new(8.0, 8.0, 0.0),
    bounds_max: Vec3::new(16.0, 16.0, 8.0),
    sphere_center: Vec3::new(12.0, 12.0, 4.0),
    sphere_radius: 48f32.sqrt(),
    projections: 2..3,
    descendant_object_ids: vec![OBJECT_C],
    ..Default::default()
  });

  node.push_texture(2, 2, 0, &[0x7f; 16]);
  node.push_material([255, 0, 0, 255], 0, Mat3::IDENTITY);

  node.push_sub_mesh(SubMeshInput {
    child_index: 0,
    object_id: OBJECT_B,
    material_index: 0,
    attributes: triangles,
    vertices: quad([0.0, 0.0, 0.0], 4.0),
    indices: vec![0, 1, 2, 0, 2, 3],
    triangle_flags: vec![0b011, 0b110],
    ..Default::default()
  });
  node.push_sub_mesh(SubMeshInput {
    child_index: 0,
    object_id: OBJECT_A,
    attributes: triangles,
    vertices: triangle([1.0, 1.0, 1.0]),
    indices: vec![0, 1, 2],
    ..Default::default()
  });
  node.push_sub_mesh(SubMeshInput {
    child_index: 3,
    object_id: OBJECT_C,
    primitive_type: PrimitiveType::Points,
    attributes: VertexAttributes::COLOR,
    vertices: (0..5)
      .map(|i| VertexRecord {
        position: [8.0 + i as f32, 9.0, 1.0],
        color: [0, 0, 255, 255],
        ..Default::default()
      })
      .collect(),
    ..Default::default()
  });
  node.push_sub_mesh(SubMeshInput {
    child_index: 0,
    object_id: OBJECT_A,
    attributes: triangles,
    vertices: triangle([2.0, 2.0, 2.0]),
    indices: vec![0, 1, 2],
    ..Default::default()
  });
  node
}

/// Encode [`sample_node`] with `version`'s layout.
pub fn sample_buffer(version: FormatVersion) -> NodeBuffer {
  let node = sample_node();
  SchemaDecoder::new(version)
    .encode(&node.as_schema(version))
    .expect("sample node encodes")
}

/// Node with no children and no geometry.
pub fn empty_buffer(version: FormatVersion) -> NodeBuffer {
  let node = OwnedSchema::new(VertexAttributes::empty(), false);
  SchemaDecoder::new(version)
    .encode(&node.as_schema(version))
    .expect("empty node encodes")
}

pub fn projection(
  object_id: u32,
  primitive_type: PrimitiveType,
  attributes: VertexAttributes,
  num_indices: u32,
  num_vertices: u32,
) -> ProjectionRecord {
  ProjectionRecord {
    object_id,
    material_type: 0,
    primitive_type,
    attributes,
    num_indices,
    num_vertices,
    num_texture_bytes: 0,
    num_deviation_channels: 0,
    has_material: false,
  }
}

/// Axis-aligned quad in the XY plane, counter-clockwise.
pub fn quad(origin: [f32; 3], size: f32) -> Vec<VertexRecord> {
  let [x, y, z] = origin;
  [[x, y, z], [x + size, y, z], [x + size, y + size, z], [x, y + size, z]]
    .into_iter()
    .map(|position| VertexRecord {
      position,
      normal: [0, 0, 127],
      color: [255, 255, 255, 255],
      ..Default::default()
    })
    .collect()
}

/// Unit right triangle at `origin`.
pub fn triangle(origin: [f32; 3]) -> Vec<VertexRecord> {
  let [x, y, z] = origin;
  [[x, y, z], [x + 1.0, y, z], [x, y + 1.0, z]]
    .into_iter()
    .map(|position| VertexRecord {
      position,
      normal: [0, 0, 127],
      color: [0, 255, 0, 255],
      ..Default::default()
    })
    .collect()
}

/// Object ids used by [`full_attribute_node`].
pub const LINE_OBJECT: u32 = 4;
pub const MESH_OBJECT: u32 = 5;
pub const POINT_OBJECT: u32 = 6;

/// Every vertex column enabled, each vertex holding distinct values.
pub const ALL_ATTRIBUTES: VertexAttributes = VertexAttributes::all();

/// Vertex `i` with every attribute derived from `i`. Positions are whole
/// numbers so 16-bit quantization keeps them exact.
pub fn rich_vertex(i: usize) -> VertexRecord {
  let n = i as u16;
  VertexRecord {
    position: [i as f32, 2.0 * i as f32, 3.0 * i as f32],
    normal: [i as i8, -(i as i8), 1],
    color: [i as u8, i as u8 + 1, i as u8 + 2, 255],
    tex_coord: [0x3c00 + n, 0x4000 - n],
    projected_pos: [i as f32 * 0.25, -(i as f32)],
    deviation: [n, n + 1, n + 2, n + 3],
    intensity: n * 100,
    classification: (i % 7) as u8,
  }
}

fn rich_vertices(first: usize, count: usize) -> Vec<VertexRecord> {
  (first..first + count).map(rich_vertex).collect()
}

/// Mixed-topology node with every optional column present, triangle flags and
/// descendant ids:
///
/// | # | octant | object | topology  | vertices | indices | flags         |
/// |---|--------|--------|-----------|----------|---------|---------------|
/// | 0 | 1      | line   | lines     | 4        | 4       |               |
/// | 1 | 0      | mesh   | triangles | 4        | 6       | 0b101, 0b010  |
/// | 2 | 1      | point  | points    | 3        | 0       |               |
/// | 3 | 0      | mesh   | triangles | 3        | 0       | 0b111         |
/// | 4 | 2      | none   | triangles | 3        | 3       | 0b001         |
///
/// Submesh 1 references the only material (textured, UV transform); the mesh
/// submeshes carry two deviation channels.
pub fn full_attribute_node(position32: bool) -> OwnedSchema {
  let mut node = OwnedSchema::new(ALL_ATTRIBUTES, position32)
    .with_triangle_flags()
    .with_descendants();

  node.push_texture(4, 2, 3, &[1, 2, 3, 4, 5, 6, 7, 8]);
  node.push_material([10, 20, 30, 40], 0, Mat3::from_scale(glam::Vec2::new(2.0, 0.5)));

  let sub_meshes = [
    SubMeshInput {
      child_index: 1,
      object_id: LINE_OBJECT,
      primitive_type: PrimitiveType::Lines,
      attributes: VertexAttributes::COLOR,
      vertices: rich_vertices(0, 4),
      indices: vec![0, 1, 2, 3],
      ..Default::default()
    },
    SubMeshInput {
      child_index: 0,
      object_id: MESH_OBJECT,
      material_index: 0,
      attributes: ALL_ATTRIBUTES,
      num_deviation_channels: 2,
      vertices: rich_vertices(4, 4),
      indices: vec![0, 1, 2, 0, 2, 3],
      triangle_flags: vec![0b101, 0b010],
      ..Default::default()
    },
    SubMeshInput {
      child_index: 1,
      object_id: POINT_OBJECT,
      primitive_type: PrimitiveType::Points,
      attributes: VertexAttributes::COLOR
        | VertexAttributes::INTENSITY
        | VertexAttributes::CLASSIFICATION,
      vertices: rich_vertices(8, 3),
      ..Default::default()
    },
    SubMeshInput {
      child_index: 0,
      object_id: MESH_OBJECT,
      attributes: ALL_ATTRIBUTES,
      num_deviation_channels: 2,
      vertices: rich_vertices(11, 3),
      triangle_flags: vec![0b111],
      ..Default::default()
    },
    SubMeshInput {
      child_index: 2,
      attributes: VertexAttributes::NORMAL,
      vertices: rich_vertices(14, 3),
      indices: vec![2, 1, 0],
      triangle_flags: vec![0b001],
      ..Default::default()
    },
  ];
  for input in &sub_meshes {
    node.push_projection(projection_for(input));
  }
  node.push_child(ChildRecord {
    hash: [9, 8, 7, 6],
    child_index: 5,
    child_mask: 0b0000_0111,
    tolerance: 1,
    position_bits: 12,
    byte_size: 2048,
    offset: DVec3::new(-5.0e6, 1.0e6, 250.5),
    scale: 0.25,
    bounds_min: Vec3::new(1.0, 2.0, 3.0),
    bounds_max: Vec3::new(4.0, 5.0, 6.0),
    sphere_center: Vec3::new(2.5, 3.5, 4.5),
    sphere_radius: 2.6,
    projections: 0..sub_meshes.len() as u32,
    descendant_object_ids: vec![POINT_OBJECT, LINE_OBJECT, MESH_OBJECT],
  });
  for input in sub_meshes {
    node.push_sub_mesh(input);
  }
  node
}

/// The projection a converter would write for `input`.
pub fn projection_for(input: &SubMeshInput) -> ProjectionRecord {
  ProjectionRecord {
    object_id: input.object_id,
    material_type: input.material_type,
    primitive_type: input.primitive_type,
    attributes: input.attributes,
    num_indices: input.indices.len() as u32,
    num_vertices: input.vertices.len() as u32,
    num_texture_bytes: 0,
    num_deviation_channels: input.num_deviation_channels,
    has_material: input.material_index != NO_INDEX,
  }
}

/// Node whose only child record sits in octant 0 with just its own octant 0
/// occupied; the other octant of the pair is absent from the child table.
pub fn single_child_buffer(version: FormatVersion) -> NodeBuffer {
  let mut node = OwnedSchema::new(VertexAttributes::empty(), false);
  node.push_projection(projection(OBJECT_A, PrimitiveType::Triangles, VertexAttributes::empty(), 3, 3));
  node.push_child(ChildRecord {
    hash: [5, 6, 7, 8],
    child_index: 0,
    child_mask: 0b0000_0001,
    byte_size: 256,
    projections: 0..1,
    ..Default::default()
  });
  node.push_sub_mesh(SubMeshInput {
    child_index: 0,
    object_id: OBJECT_A,
    vertices: triangle([0.0, 0.0, 0.0]),
    indices: vec![0, 1, 2],
    ..Default::default()
  });
  SchemaDecoder::new(version)
    .encode(&node.as_schema(version))
    .expect("single child node encodes")
}
