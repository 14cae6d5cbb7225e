//! GeometryBuilder - turns a decoded [`Schema`] into child descriptors and
//! renderer-ready geometry.
//!
//! Two independent passes:
//!
//! - [`get_children`]: one [`NodeData`](crate::types::NodeData) per child
//!   record, with a cost prediction aggregated from its submesh projections.
//! - [`get_geometry`]: draw groups with interleaved vertex buffers, index
//!   buffers, per-octant [`DrawRange`]s and per-object [`ObjectRange`]s.
//!
//! Both take an optional object filter. Geometry without an object id is
//! never filtered.

pub mod build;
pub mod children;
pub mod layout;
pub mod types;

pub use build::get_geometry;
pub use children::{aggregate_sub_mesh_projections, get_children, CostPrediction, ParentInfo};
pub use layout::{
  group_layout, AttributeDescriptor, AttributeFormat, BufferLayout, BufferRole, ComponentType,
  GroupLayout, LayoutKey, VertexSemantic,
};
pub use types::{
  DrawRange, GroupKey, IndexBuffer, Material, NodeGeometry, ObjectRange, SubMesh,
  TextureDescriptor, VertexBuffer,
};

use crate::format::schema::VertexColumns;
use crate::format::{MAX_DEVIATION_CHANNELS, NO_INDEX};
use crate::types::VertexAttributes;

/// Object-level predicate: `true` keeps the object.
pub type ObjectFilter<'f> = Option<&'f dyn Fn(u32) -> bool>;

/// Whether geometry of `object_id` survives `filter`.
#[inline]
pub(crate) fn keeps(filter: ObjectFilter<'_>, object_id: u32) -> bool {
  object_id == NO_INDEX || filter.map_or(true, |keep| keep(object_id))
}

/// Optional attributes the node actually stores columns for.
pub(crate) fn available_attributes(vertex: &VertexColumns<'_>) -> VertexAttributes {
  let mut available = VertexAttributes::empty();
  available.set(VertexAttributes::NORMAL, vertex.normal.is_some());
  available.set(VertexAttributes::COLOR, vertex.color.is_some());
  available.set(VertexAttributes::TEX_COORD, vertex.tex_coord.is_some());
  available.set(VertexAttributes::PROJECTED_POS, vertex.projected_pos.is_some());
  available.set(VertexAttributes::DEVIATION, vertex.deviation.is_some());
  available.set(VertexAttributes::INTENSITY, vertex.intensity.is_some());
  available.set(VertexAttributes::CLASSIFICATION, vertex.classification.is_some());
  available
}

/// Deviation channels a group stores: none unless the attribute survives.
pub(crate) fn deviation_channels(attributes: VertexAttributes, declared: u8) -> u8 {
  if attributes.contains(VertexAttributes::DEVIATION) {
    declared.min(MAX_DEVIATION_CHANNELS as u8)
  } else {
    0
  }
}
