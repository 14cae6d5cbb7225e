//! Synchronous decode of one node: schema, geometry, then children.

use crate::format::{DecodeError, FormatVersion, NodeBuffer, SchemaDecoder};
use crate::geometry::{get_children, get_geometry, NodeGeometry, ParentInfo};
use crate::highlight::{HighlightTable, FILTERED};
use crate::types::NodeData;

use super::messages::DecodeOptions;

/// Output of [`decode_node`].
#[derive(Debug)]
pub struct DecodedNode {
  pub children: Vec<NodeData>,
  pub geometry: NodeGeometry,
}

/// Decode `buffer` and build its geometry and child descriptors.
///
/// When `highlights` is given its lock is held, blocking, for the whole build
/// so the node sees one consistent table. Children are built after the
/// geometry so their primitive delta can use what this node draws per octant.
pub fn decode_node(
  buffer: &NodeBuffer,
  version: FormatVersion,
  node_id: &str,
  options: &DecodeOptions,
  highlights: Option<&HighlightTable>,
) -> Result<DecodedNode, DecodeError> {
  let schema = SchemaDecoder::new(version).decode(buffer)?;

  let guard = highlights.map(HighlightTable::lock_blocking);
  let table: &[u8] = guard.as_deref().unwrap_or_default();

  let keep = |object_id: u32| {
    if options.is_hidden(object_id) {
      return false;
    }
    !options.filter_highlighted || table.get(object_id as usize) != Some(&FILTERED)
  };
  let filtering = !options.hidden_objects.is_empty() || (options.filter_highlighted && table.contains(&FILTERED));
  let filter: Option<&dyn Fn(u32) -> bool> = if filtering { Some(&keep) } else { None };

  let geometry = get_geometry(&schema, filter, table);
  let parent = ParentInfo::new(node_id, geometry.primitives_per_octant());
  let children = get_children(&schema, &parent, filter);
  drop(guard);

  Ok(DecodedNode { children, geometry })
}
