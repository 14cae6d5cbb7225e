//! Current node layout.
//!
//! ```text
//! sizes: child_info, sub_mesh_projection, sub_mesh, material, texture_info,
//!        texture_data, vertex, triangle, vertex_index, descendant_object_ids
//! flags: position32, normal, color, tex_coord, projected_pos, deviation,
//!        intensity, classification, triangle_flags, descendant_ranges
//! ```
//!
//! Children are identified by a 128-bit content hash stored first in the
//! child group. The descendant object id pool follows the child group so a
//! client can filter children before touching the mesh data. Materials carry
//! a UV transform.

use super::schema::{Float3x3Columns, RangeColumns, Schema};
use super::{ColumnVisitor, DecodeError, FormatVersion, NodeLayout};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CurrentLayout;

impl NodeLayout for CurrentLayout {
  const VERSION: FormatVersion = FormatVersion::Current;

  fn visit<'a, V: ColumnVisitor<'a>>(v: &mut V, s: &mut Schema<'a>) -> Result<(), DecodeError> {
    let mut sizes = [
      s.child_info.len,
      s.sub_mesh_projection.len,
      s.sub_mesh.len,
      s.material.len,
      s.texture_info.len,
      s.texture_data.len(),
      s.vertex.len,
      s.triangle.len,
      s.vertex_index.len(),
      s.descendant_object_ids.len(),
    ];
    let mut flags = [
      s.vertex.position32.is_some(),
      s.vertex.normal.is_some(),
      s.vertex.color.is_some(),
      s.vertex.tex_coord.is_some(),
      s.vertex.projected_pos.is_some(),
      s.vertex.deviation.is_some(),
      s.vertex.intensity.is_some(),
      s.vertex.classification.is_some(),
      s.triangle.flags.is_some(),
      s.child_info.descendant_object_ids.is_some(),
    ];
    v.header(&mut sizes, &mut flags)?;
    let [
      children,
      projections,
      sub_meshes,
      materials,
      textures,
      texture_bytes,
      vertices,
      triangles,
      indices,
      descendants,
    ] = sizes;
    let [
      has_position32,
      has_normal,
      has_color,
      has_tex_coord,
      has_projected_pos,
      has_deviation,
      has_intensity,
      has_classification,
      has_triangle_flags,
      has_descendants,
    ] = flags;

    let child = &mut s.child_info;
    child.len = children;
    v.optional(true, children, &mut child.hash)?;
    v.column(children, &mut child.child_index)?;
    v.column(children, &mut child.child_mask)?;
    v.column(children, &mut child.tolerance)?;
    v.optional_column(true, children, &mut child.position_bits)?;
    v.column(children, &mut child.total_byte_size)?;
    child.offset.visit(v, children)?;
    v.column(children, &mut child.scale)?;
    child.bounds.visit(v, children)?;
    child.sphere.visit(v, children)?;
    child.sub_mesh_projections.visit(v, children)?;
    RangeColumns::visit_optional(&mut child.descendant_object_ids, v, has_descendants, children)?;
    v.column(descendants, &mut s.descendant_object_ids)?;

    let projection = &mut s.sub_mesh_projection;
    projection.len = projections;
    v.column(projections, &mut projection.object_id)?;
    v.column(projections, &mut projection.material_type)?;
    v.column(projections, &mut projection.primitive_type)?;
    v.column(projections, &mut projection.attributes)?;
    v.column(projections, &mut projection.num_indices)?;
    v.column(projections, &mut projection.num_vertices)?;
    v.optional_column(true, projections, &mut projection.num_texture_bytes)?;
    v.optional_column(true, projections, &mut projection.num_deviation_channels)?;
    v.optional_column(true, projections, &mut projection.has_material)?;

    let sub_mesh = &mut s.sub_mesh;
    sub_mesh.len = sub_meshes;
    v.column(sub_meshes, &mut sub_mesh.child_index)?;
    v.column(sub_meshes, &mut sub_mesh.material_type)?;
    v.column(sub_meshes, &mut sub_mesh.primitive_type)?;
    v.optional_column(true, sub_meshes, &mut sub_mesh.num_deviation_channels)?;
    v.column(sub_meshes, &mut sub_mesh.attributes)?;
    v.column(sub_meshes, &mut sub_mesh.object_id)?;
    v.column(sub_meshes, &mut sub_mesh.material_index)?;
    sub_mesh.vertices.visit(v, sub_meshes)?;
    sub_mesh.indices.visit(v, sub_meshes)?;

    let material = &mut s.material;
    material.len = materials;
    v.columns(materials, &mut material.color)?;
    v.optional_column(true, materials, &mut material.texture_index)?;
    let mut uv_transform = material.uv_transform.unwrap_or_else(Float3x3Columns::default);
    uv_transform.visit(v, materials)?;
    material.uv_transform = Some(uv_transform);

    let texture = &mut s.texture_info;
    texture.len = textures;
    v.column(textures, &mut texture.width)?;
    v.column(textures, &mut texture.height)?;
    v.column(textures, &mut texture.format)?;
    texture.data.visit(v, textures)?;
    v.column(texture_bytes, &mut s.texture_data)?;

    let vertex = &mut s.vertex;
    vertex.len = vertices;
    v.optional(!has_position32, vertices, &mut vertex.position16)?;
    v.optional(has_position32, vertices, &mut vertex.position32)?;
    v.optional(has_normal, vertices, &mut vertex.normal)?;
    v.optional(has_color, vertices, &mut vertex.color)?;
    v.optional(has_tex_coord, vertices, &mut vertex.tex_coord)?;
    v.optional(has_projected_pos, vertices, &mut vertex.projected_pos)?;
    v.optional(has_deviation, vertices, &mut vertex.deviation)?;
    v.optional_column(has_intensity, vertices, &mut vertex.intensity)?;
    v.optional_column(has_classification, vertices, &mut vertex.classification)?;

    s.triangle.len = triangles;
    v.optional_column(has_triangle_flags, triangles, &mut s.triangle.flags)?;

    v.column(indices, &mut s.vertex_index)
  }
}
