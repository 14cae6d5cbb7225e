use super::*;
use crate::format::{ChildRecord, OwnedSchema, SubMeshInput};
use crate::test_utils::{projection, sample_node, triangle};

fn invalid_range(err: DecodeError) -> &'static str {
  match err {
    DecodeError::InvalidRange { what, .. } => what,
    other => panic!("expected InvalidRange, got {other:?}"),
  }
}

#[test]
fn test_sample_node_is_valid() {
  let node = sample_node();
  for version in FormatVersion::ALL {
    assert_eq!(node.as_schema(version).validate(), Ok(()));
  }
}

/// Positions read back from either encoding.
#[test]
fn test_position_accessor() {
  let node = sample_node();
  let schema = node.as_schema(FormatVersion::Current);
  assert_eq!(schema.position(1), Some(Vec3::new(4.0, 0.0, 0.0)));

  let empty = Schema::empty(FormatVersion::Lts);
  assert_eq!(empty.vertex.position16, None);
}

#[test]
fn test_local_index_outside_sub_mesh() {
  let mut node = OwnedSchema::new(VertexAttributes::empty(), false);
  node.push_sub_mesh(SubMeshInput {
    vertices: triangle([0.0, 0.0, 0.0]),
    indices: vec![0, 1, 3],
    ..Default::default()
  });
  let err = node.as_schema(FormatVersion::Lts).validate().unwrap_err();
  assert_eq!(invalid_range(err), "local vertex index");
}

#[test]
fn test_dangling_material() {
  let mut node = OwnedSchema::new(VertexAttributes::empty(), false);
  node.push_sub_mesh(SubMeshInput {
    material_index: 2,
    vertices: triangle([0.0, 0.0, 0.0]),
    indices: vec![0, 1, 2],
    ..Default::default()
  });
  let err = node.as_schema(FormatVersion::Lts).validate().unwrap_err();
  assert_eq!(
    err,
    DecodeError::InvalidRange {
      what: "material",
      begin: 2,
      end: 3,
      limit: 0
    }
  );
}

#[test]
fn test_child_octant_out_of_range() {
  let mut node = OwnedSchema::new(VertexAttributes::empty(), false);
  node.push_child(ChildRecord {
    child_index: 8,
    ..Default::default()
  });
  let err = node.as_schema(FormatVersion::Previous).validate().unwrap_err();
  assert_eq!(invalid_range(err), "child index");
}

#[test]
fn test_projection_range_past_group() {
  let mut node = OwnedSchema::new(VertexAttributes::empty(), false);
  node.push_child(ChildRecord {
    projections: 0..2,
    ..Default::default()
  });
  let err = node.as_schema(FormatVersion::Current).validate().unwrap_err();
  assert_eq!(invalid_range(err), "sub mesh projection");
}

#[test]
fn test_too_many_deviation_channels() {
  let mut node = OwnedSchema::new(VertexAttributes::DEVIATION, false);
  node.push_sub_mesh(SubMeshInput {
    num_deviation_channels: 5,
    vertices: triangle([0.0, 0.0, 0.0]),
    indices: vec![0, 1, 2],
    ..Default::default()
  });
  let err = node.as_schema(FormatVersion::Previous).validate().unwrap_err();
  assert_eq!(invalid_range(err), "deviation channel");
}

#[test]
fn test_texture_index_checked_only_when_present() {
  let mut node = OwnedSchema::new(VertexAttributes::empty(), false);
  node.push_material([0; 4], 4, Mat3::IDENTITY);
  node.push_material([0; 4], NO_INDEX, Mat3::IDENTITY);
  let err = node.as_schema(FormatVersion::Current).validate().unwrap_err();
  assert_eq!(invalid_range(err), "texture");
}

#[test]
fn test_child_info_accessors() {
  let node = sample_node();
  let schema = node.as_schema(FormatVersion::Current);
  let children = &schema.child_info;
  assert_eq!(children.position_bits(1), 16);
  assert_eq!(children.offset.get(0), DVec3::new(100.0, 0.0, 0.0));
  assert_eq!(children.bounds.max.get(1), Vec3::new(16.0, 16.0, 8.0));
  assert_eq!(children.sub_mesh_projections.get(1), 2..3);
  assert_eq!(
    schema.material.uv_transform.map(|uv| uv.get(0)),
    Some(Mat3::IDENTITY)
  );
}

/// The triangle group holds exactly one entry per triangle of every
/// triangle submesh.
#[test]
fn test_triangle_column_length_checked() {
  let node = sample_node();
  let mut schema = node.as_schema(FormatVersion::Previous);
  let flags = schema.triangle.flags.expect("flags stored");
  assert_eq!(flags.len(), 4);

  schema.triangle.flags = Some(&flags[..3]);
  schema.triangle.len = 3;
  assert_eq!(
    schema.validate(),
    Err(DecodeError::ColumnLength { expected: 4, actual: 3 })
  );

  // Without the flag column the group size is not checked.
  schema.triangle.flags = None;
  assert_eq!(schema.validate(), Ok(()));
}

#[test]
fn test_triangle_count_by_topology() {
  let mut node = OwnedSchema::new(VertexAttributes::empty(), false);
  node.push_sub_mesh(SubMeshInput {
    primitive_type: PrimitiveType::Lines,
    vertices: triangle([0.0, 0.0, 0.0]),
    indices: vec![0, 1, 1, 2, 2, 0],
    ..Default::default()
  });
  let mut vertices = triangle([0.0, 0.0, 0.0]);
  vertices.extend(triangle([1.0, 0.0, 0.0]));
  node.push_sub_mesh(SubMeshInput {
    vertices,
    ..Default::default()
  });
  node.push_sub_mesh(SubMeshInput {
    vertices: triangle([2.0, 0.0, 0.0]),
    indices: vec![0, 1, 2, 2, 1, 0, 0, 2, 1],
    ..Default::default()
  });
  let schema = node.as_schema(FormatVersion::Current);
  let counts: Vec<usize> = (0..3).map(|i| schema.sub_mesh.get(i).triangle_count()).collect();
  assert_eq!(counts, [0, 2, 3]);
}

#[test]
fn test_projection_deviation_channels_checked() {
  let mut node = OwnedSchema::new(VertexAttributes::DEVIATION, false);
  node.push_projection(ProjectionRecord {
    num_deviation_channels: MAX_DEVIATION_CHANNELS as u8 + 1,
    ..projection(1, PrimitiveType::Points, VertexAttributes::DEVIATION, 0, 1)
  });
  let err = node.as_schema(FormatVersion::Current).validate().unwrap_err();
  assert_eq!(invalid_range(err), "projection deviation channel");
}
