//! Child descriptors and pre-download cost prediction.

use std::collections::BTreeMap;
use std::ops::Range;

use super::layout::{group_layout, LayoutKey};
use super::{available_attributes, deviation_channels, keeps, ObjectFilter};
use crate::format::{Schema, NO_INDEX};
use crate::octree::bounds::{BoundingSphere, DAabb3};
use crate::types::{NodeData, PrimitiveType, VertexAttributes, OCTANT_COUNT};

/// What the child pass needs to know about the node being decoded.
#[derive(Clone, Copy, Debug)]
pub struct ParentInfo<'p> {
  /// Prefix of hierarchical child ids (legacy formats).
  pub id: &'p str,
  /// Primitives the parent itself draws per octant, from its own geometry.
  pub primitives_per_octant: [u64; OCTANT_COUNT],
}

impl<'p> ParentInfo<'p> {
  pub fn new(id: &'p str, primitives_per_octant: [u64; OCTANT_COUNT]) -> Self {
    Self {
      id,
      primitives_per_octant,
    }
  }
}

/// Predicted cost of downloading and drawing a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CostPrediction {
  pub primitives: u64,
  pub vertices: u64,
  pub gpu_bytes: u64,
}

/// Running totals of the projections that will share one draw group.
#[derive(Default)]
struct PredictedGroup {
  vertices: u64,
  elements: u64,
  indexed: bool,
  has_materials: bool,
  has_object_ids: bool,
}

/// Sum the projections in `range`, skipping filtered objects.
///
/// Projections are grouped the way the build groups submeshes, so each group
/// gets the same [`group_layout`] stride and index width the real geometry
/// will have. The child octant is unknown before download: a predicted group
/// spanning several octants may pick 32-bit indices where each real group
/// fits in 16 bits, so the prediction never undercounts.
pub fn aggregate_sub_mesh_projections(
  schema: &Schema<'_>,
  range: Range<usize>,
  filter: ObjectFilter<'_>,
) -> CostPrediction {
  let projections = &schema.sub_mesh_projection;
  let available = available_attributes(&schema.vertex);
  let position32 = schema.vertex.position32.is_some();

  let mut prediction = CostPrediction::default();
  let mut texture_bytes = 0u64;
  let mut groups: BTreeMap<(u8, PrimitiveType, VertexAttributes, u8), PredictedGroup> =
    BTreeMap::new();
  for i in range {
    let projection = projections.get(i);
    if projection.num_vertices == 0 || !keeps(filter, projection.object_id) {
      continue;
    }
    let attributes = projection.attributes & available;
    let channels = deviation_channels(attributes, projection.num_deviation_channels);
    let elements = if projection.num_indices > 0 {
      projection.num_indices
    } else {
      projection.num_vertices
    };

    prediction.primitives += projection.primitive_type.primitive_count(elements) as u64;
    prediction.vertices += projection.num_vertices as u64;
    texture_bytes += projection.num_texture_bytes as u64;

    let key = (projection.material_type, projection.primitive_type, attributes, channels);
    let group = groups.entry(key).or_default();
    group.vertices += projection.num_vertices as u64;
    group.elements += elements as u64;
    group.indexed |= projection.num_indices > 0;
    group.has_materials |= projection.has_material;
    group.has_object_ids |= projection.object_id != NO_INDEX;
  }

  prediction.gpu_bytes = texture_bytes;
  for ((_, _, attributes, num_deviation_channels), group) in groups {
    let layout = group_layout(&LayoutKey {
      attributes,
      num_deviation_channels,
      position32,
      has_materials: group.has_materials,
      has_object_ids: group.has_object_ids,
    });
    prediction.gpu_bytes += group.vertices * layout.vertex_stride() as u64;
    if group.indexed {
      let index_size = if group.vertices < 1 << 16 { 2 } else { 4 };
      prediction.gpu_bytes += group.elements * index_size;
    }
  }
  prediction
}

/// Build a [`NodeData`] for every child record that survives `filter`.
///
/// A child whose descendant object ids are all filtered out is dropped
/// without being downloaded. `primitives_delta` is the predicted primitive
/// count minus what the parent draws in the same octant; it may be negative.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "geometry::children"))]
pub fn get_children(
  schema: &Schema<'_>,
  parent: &ParentInfo<'_>,
  filter: ObjectFilter<'_>,
) -> Vec<NodeData> {
  let children = &schema.child_info;
  let mut out = Vec::with_capacity(children.len);

  for i in 0..children.len {
    let descendant_object_ids = schema.descendant_object_ids(i).map(|ids| {
      let mut ids = ids.to_vec();
      ids.sort_unstable();
      ids.dedup();
      ids
    });
    if let (Some(keep), Some(ids)) = (filter, &descendant_object_ids) {
      if !ids.is_empty() && !ids.iter().any(|&id| keep(id)) {
        continue;
      }
    }

    let child_index = children.child_index[i];
    let offset = children.offset.get(i);
    let bounds = DAabb3 {
      min: offset + children.bounds.min.get(i).as_dvec3(),
      max: offset + children.bounds.max.get(i).as_dvec3(),
    };
    let sphere = BoundingSphere::new(
      offset + children.sphere.center.get(i).as_dvec3(),
      children.sphere.radius[i] as f64,
    );
    let prediction =
      aggregate_sub_mesh_projections(schema, children.sub_mesh_projections.get(i), filter);
    let parent_primitives = parent.primitives_per_octant[child_index as usize & 7];

    out.push(NodeData {
      id: child_id(schema, i, parent.id),
      child_index,
      child_mask: children.child_mask[i],
      tolerance: children.tolerance[i],
      byte_size: children.total_byte_size[i],
      position_bits: children.position_bits(i),
      offset,
      scale: children.scale[i],
      bounds,
      sphere,
      primitives: prediction.primitives,
      primitives_delta: prediction.primitives as i64 - parent_primitives as i64,
      gpu_bytes: prediction.gpu_bytes,
      descendant_object_ids,
    });
  }
  out
}

/// Content hash in the current format, else parent path plus the octant's
/// radix-32 digit.
fn child_id(schema: &Schema<'_>, i: usize, parent_id: &str) -> String {
  if schema.version.has_hash_ids() {
    if let Some(hash) = schema.child_info.hash_hex(i) {
      return hash;
    }
  }
  let octant = schema.child_info.child_index[i] as u32;
  let mut id = String::with_capacity(parent_id.len() + 1);
  id.push_str(parent_id);
  id.push(char::from_digit(octant, 32).unwrap_or('0'));
  id
}

#[cfg(test)]
#[path = "children_test.rs"]
mod children_test;
