//! LTS node layout - the oldest format still served.
//!
//! ```text
//! sizes: child_info, sub_mesh_projection, sub_mesh, material, vertex, vertex_index
//! flags: normal, color
//! ```
//!
//! Positions are always 16-bit quantized at 16 bits per channel. Ids are
//! hierarchical paths derived from the parent id.

use super::schema::Schema;
use super::{ColumnVisitor, DecodeError, FormatVersion, NodeLayout};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LtsLayout;

impl NodeLayout for LtsLayout {
  const VERSION: FormatVersion = FormatVersion::Lts;

  fn visit<'a, V: ColumnVisitor<'a>>(v: &mut V, s: &mut Schema<'a>) -> Result<(), DecodeError> {
    let mut sizes = [
      s.child_info.len,
      s.sub_mesh_projection.len,
      s.sub_mesh.len,
      s.material.len,
      s.vertex.len,
      s.vertex_index.len(),
    ];
    let mut flags = [s.vertex.normal.is_some(), s.vertex.color.is_some()];
    v.header(&mut sizes, &mut flags)?;
    let [children, projections, sub_meshes, materials, vertices, indices] = sizes;
    let [has_normal, has_color] = flags;

    let child = &mut s.child_info;
    child.len = children;
    v.column(children, &mut child.child_index)?;
    v.column(children, &mut child.child_mask)?;
    v.column(children, &mut child.tolerance)?;
    v.column(children, &mut child.total_byte_size)?;
    child.offset.visit(v, children)?;
    v.column(children, &mut child.scale)?;
    child.bounds.visit(v, children)?;
    child.sphere.visit(v, children)?;
    child.sub_mesh_projections.visit(v, children)?;

    let projection = &mut s.sub_mesh_projection;
    projection.len = projections;
    v.column(projections, &mut projection.object_id)?;
    v.column(projections, &mut projection.material_type)?;
    v.column(projections, &mut projection.primitive_type)?;
    v.column(projections, &mut projection.attributes)?;
    v.column(projections, &mut projection.num_indices)?;
    v.column(projections, &mut projection.num_vertices)?;

    let sub_mesh = &mut s.sub_mesh;
    sub_mesh.len = sub_meshes;
    v.column(sub_meshes, &mut sub_mesh.child_index)?;
    v.column(sub_meshes, &mut sub_mesh.material_type)?;
    v.column(sub_meshes, &mut sub_mesh.primitive_type)?;
    v.column(sub_meshes, &mut sub_mesh.attributes)?;
    v.column(sub_meshes, &mut sub_mesh.object_id)?;
    v.column(sub_meshes, &mut sub_mesh.material_index)?;
    sub_mesh.vertices.visit(v, sub_meshes)?;
    sub_mesh.indices.visit(v, sub_meshes)?;

    s.material.len = materials;
    v.columns(materials, &mut s.material.color)?;

    let vertex = &mut s.vertex;
    vertex.len = vertices;
    v.optional(true, vertices, &mut vertex.position16)?;
    v.optional(has_normal, vertices, &mut vertex.normal)?;
    v.optional(has_color, vertices, &mut vertex.color)?;

    v.column(indices, &mut s.vertex_index)
  }
}
