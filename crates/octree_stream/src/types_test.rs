use super::*;

#[test]
fn test_primitive_from_raw() {
  assert_eq!(PrimitiveType::from_raw(0), PrimitiveType::Points);
  assert_eq!(PrimitiveType::from_raw(1), PrimitiveType::Lines);
  assert_eq!(PrimitiveType::from_raw(2), PrimitiveType::Triangles);
}

#[test]
fn test_primitive_count() {
  assert_eq!(PrimitiveType::Triangles.primitive_count(9), 3);
  assert_eq!(PrimitiveType::Lines.primitive_count(9), 4);
  assert_eq!(PrimitiveType::Points.primitive_count(9), 9);
}

/// The synthetic root claims all 8 octants.
#[test]
fn test_root_descriptor() {
  let bounds = DAabb3::new(DVec3::ZERO, DVec3::splat(64.0));
  let root = NodeData::root("root", 1024, bounds, 4);

  assert_eq!(root.id, "root");
  assert_eq!(root.byte_size, 1024);
  assert_eq!(root.sphere.center, DVec3::splat(32.0));
  for octant in 0..OCTANT_COUNT as u8 {
    assert!(root.has_child(octant));
  }
}

#[test]
fn test_has_child_reads_mask_bits() {
  let mut node = NodeData::root("n", 0, DAabb3::new(DVec3::ZERO, DVec3::ONE), 0);
  node.child_mask = 0b1000_0010;
  assert!(node.has_child(1));
  assert!(node.has_child(7));
  assert!(!node.has_child(0));
}

/// Without descendant ids every object may occur.
#[test]
fn test_may_contain_object() {
  let mut node = NodeData::root("n", 0, DAabb3::new(DVec3::ZERO, DVec3::ONE), 0);
  assert!(node.may_contain_object(42));

  node.descendant_object_ids = Some(vec![3, 7, 9]);
  assert!(node.may_contain_object(7));
  assert!(!node.may_contain_object(8));
}

#[test]
fn test_vertex_attribute_bits() {
  let attributes = VertexAttributes::from_bits_truncate(0b1000_0000_0000_0011);
  assert_eq!(attributes, VertexAttributes::NORMAL | VertexAttributes::COLOR);
}
