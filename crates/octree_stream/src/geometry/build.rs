//! Draw-group construction.
//!
//! Submeshes surviving the filter are grouped by [`GroupKey`]. Inside a group
//! members are ordered by (octant, object id) so draw ranges come out
//! ascending by octant and object ranges ascending by object id, with
//! consecutive members of the same object merged into one range.

use std::collections::{BTreeMap, HashMap};

use bytemuck::Pod;

use super::layout::{group_layout, BufferLayout, LayoutKey, VertexSemantic};
use super::types::{
  DrawRange, GroupKey, IndexBuffer, Material, NodeGeometry, ObjectRange, SubMesh,
  TextureDescriptor, VertexBuffer,
};
use super::{available_attributes, deviation_channels, keeps, ObjectFilter};
use crate::format::schema::SubMeshRecord;
use crate::format::{Schema, NO_INDEX};
use crate::types::PrimitiveType;

/// Build renderer geometry for every submesh that survives `filter`.
///
/// `highlights` is the highlight table indexed by object id; the caller holds
/// its lock for the whole call so one node never sees a torn table.
#[cfg_attr(feature = "trace_spans", tracing::instrument(skip_all, name = "geometry::build"))]
pub fn get_geometry(schema: &Schema<'_>, filter: ObjectFilter<'_>, highlights: &[u8]) -> NodeGeometry {
  let available = available_attributes(&schema.vertex);

  let mut groups: BTreeMap<GroupKey, Vec<Member>> = BTreeMap::new();
  // Triangle flags are stored per triangle submesh in file order, filtered
  // or not.
  let mut next_triangle = 0usize;
  for i in 0..schema.sub_mesh.len {
    let record = schema.sub_mesh.get(i);
    let first_triangle = next_triangle;
    next_triangle += record.triangle_count();
    if record.vertices.is_empty() || !keeps(filter, record.object_id) {
      continue;
    }
    let attributes = record.attributes & available;
    let key = GroupKey {
      material_type: record.material_type,
      primitive_type: record.primitive_type,
      attributes,
      num_deviation_channels: deviation_channels(attributes, record.num_deviation_channels),
      child_index: record.child_index,
    };
    groups.entry(key).or_default().push(Member { record, first_triangle });
  }

  let mut materials = MaterialTable::default();
  let sub_meshes = groups
    .into_iter()
    .map(|(key, members)| build_group(schema, key, members, &mut materials, highlights))
    .collect();

  NodeGeometry {
    sub_meshes,
    materials: materials.materials,
    textures: materials.textures,
  }
}

/// A submesh placed in a group, with its offset into the triangle group.
struct Member {
  record: SubMeshRecord,
  first_triangle: usize,
}

fn build_group(
  schema: &Schema<'_>,
  key: GroupKey,
  mut members: Vec<Member>,
  materials: &mut MaterialTable,
  highlights: &[u8],
) -> SubMesh {
  members.sort_by_key(|m| (m.record.child_index, m.record.object_id));

  let layout = group_layout(&LayoutKey {
    attributes: key.attributes,
    num_deviation_channels: key.num_deviation_channels,
    position32: schema.vertex.position32.is_some(),
    has_materials: members.iter().any(|m| m.record.has_material()),
    has_object_ids: members.iter().any(|m| m.record.has_object_id()),
  });

  let vertex_count: usize = members.iter().map(|m| m.record.vertices.len()).sum();
  let indexed = members.iter().any(|m| !m.record.indices.is_empty());
  let triangles = key.primitive_type == PrimitiveType::Triangles;
  let triangle_ranges = triangles && schema.version.has_triangle_ranges();
  let flags_column = schema.triangle.flags.filter(|_| triangles);

  let mut buffers: Vec<VertexBuffer> = layout
    .buffers
    .iter()
    .map(|buffer| VertexBuffer {
      layout: buffer.clone(),
      data: vec![0; buffer.stride as usize * vertex_count],
    })
    .collect();
  let mut indices: Vec<u32> = Vec::new();
  let mut triangle_flags = flags_column.map(|_| Vec::new());
  let mut draw_ranges: Vec<DrawRange> = Vec::new();
  let mut object_ranges: Vec<ObjectRange> = Vec::new();

  let mut next_vertex = 0u32;
  for Member { record: member, first_triangle } in &members {
    let base = next_vertex;
    let material = if member.has_material() {
      materials.resolve(schema, member.material_index)
    } else {
      NO_INDEX
    };
    let highlight = if member.has_object_id() {
      highlights.get(member.object_id as usize).copied().unwrap_or(0)
    } else {
      0
    };

    let element_begin = if indexed { indices.len() as u32 } else { base };
    for (dst, src) in member.vertices.clone().enumerate() {
      let attrs = VertexInputs {
        src,
        material,
        highlight,
        channels: key.num_deviation_channels,
      };
      for buffer in &mut buffers {
        let stride = buffer.layout.stride as usize;
        let vertex = &mut buffer.data[(base as usize + dst) * stride..][..stride];
        write_vertex(schema, &buffer.layout, &attrs, vertex);
      }
    }
    next_vertex += member.vertices.len() as u32;

    if indexed {
      if member.indices.is_empty() {
        indices.extend(base..next_vertex);
      } else {
        indices.extend(schema.vertex_index[member.indices.clone()].iter().map(|&i| base + i));
      }
    }
    if let (Some(flags), Some(column)) = (triangle_flags.as_mut(), flags_column) {
      let span = *first_triangle..*first_triangle + member.triangle_count();
      match column.get(span.clone()) {
        Some(stored) => flags.extend_from_slice(stored),
        None => flags.resize(flags.len() + span.len(), 0),
      }
    }
    let element_end = if indexed { indices.len() as u32 } else { next_vertex };

    match draw_ranges.last_mut() {
      Some(range) if range.child_index == member.child_index => {
        range.count = element_end - range.first;
      }
      _ => draw_ranges.push(DrawRange {
        child_index: member.child_index,
        first: element_begin,
        byte_offset: 0,
        count: element_end - element_begin,
      }),
    }

    if member.has_object_id() {
      let triangles = triangle_ranges.then(|| element_begin / 3..element_end / 3);
      match object_ranges.last_mut() {
        Some(range) if range.object_id == member.object_id && range.vertices.end == base => {
          range.vertices.end = next_vertex;
          if let (Some(merged), Some(added)) = (range.triangles.as_mut(), triangles) {
            merged.end = added.end;
          }
        }
        _ => object_ranges.push(ObjectRange {
          object_id: member.object_id,
          vertices: base..next_vertex,
          triangles,
        }),
      }
    }
  }

  let indices = if !indexed {
    IndexBuffer::None { count: next_vertex }
  } else if vertex_count < 1 << 16 {
    IndexBuffer::U16(indices.into_iter().map(|i| i as u16).collect())
  } else {
    IndexBuffer::U32(indices)
  };
  let element_size = if indices.is_indexed() {
    indices.element_size()
  } else {
    layout.buffers[0].stride
  };
  for range in &mut draw_ranges {
    range.byte_offset = range.first * element_size;
  }

  SubMesh {
    key,
    layout,
    vertex_buffers: buffers,
    vertex_count: next_vertex,
    indices,
    triangle_flags,
    draw_ranges,
    object_ranges,
  }
}

/// Per-vertex values that do not come from a vertex column.
struct VertexInputs {
  src: usize,
  material: u32,
  highlight: u8,
  channels: u8,
}

/// Fill one vertex of one interleaved buffer. Attributes whose column is
/// absent stay zero.
fn write_vertex(schema: &Schema<'_>, layout: &BufferLayout, inputs: &VertexInputs, vertex: &mut [u8]) {
  let columns = &schema.vertex;
  let i = inputs.src;
  for attribute in &layout.attributes {
    let at = attribute.offset as usize;
    match attribute.format.semantic {
      VertexSemantic::Position => {
        if let Some([x, y, z]) = columns.position32 {
          put(vertex, at, &[x[i], y[i], z[i]]);
        } else if let Some([x, y, z]) = columns.position16 {
          put(vertex, at, &[x[i], y[i], z[i]]);
        }
      }
      VertexSemantic::Normal => {
        if let Some([x, y, z]) = columns.normal {
          put(vertex, at, &[x[i], y[i], z[i]]);
        }
      }
      VertexSemantic::Color => {
        if let Some([r, g, b, a]) = columns.color {
          put(vertex, at, &[r[i], g[i], b[i], a[i]]);
        }
      }
      VertexSemantic::TexCoord => {
        if let Some([u, v]) = columns.tex_coord {
          put(vertex, at, &[u[i], v[i]]);
        }
      }
      VertexSemantic::ProjectedPos => {
        if let Some([x, y]) = columns.projected_pos {
          put(vertex, at, &[x[i], y[i]]);
        }
      }
      VertexSemantic::Deviation => {
        if let Some(channels) = columns.deviation {
          for (c, channel) in channels.iter().take(inputs.channels as usize).enumerate() {
            put(vertex, at + c * 2, &[channel[i]]);
          }
        }
      }
      VertexSemantic::Intensity => {
        if let Some(intensity) = columns.intensity {
          put(vertex, at, &[intensity[i]]);
        }
      }
      VertexSemantic::Classification => {
        if let Some(classification) = columns.classification {
          put(vertex, at, &[classification[i]]);
        }
      }
      VertexSemantic::MaterialIndex => put(vertex, at, &[inputs.material]),
      VertexSemantic::Highlight => put(vertex, at, &[inputs.highlight]),
    }
  }
}

#[inline]
fn put<T: Pod>(vertex: &mut [u8], at: usize, values: &[T]) {
  let bytes: &[u8] = bytemuck::cast_slice(values);
  vertex[at..at + bytes.len()].copy_from_slice(bytes);
}

/// Compacts the node's material and texture tables to what is referenced.
#[derive(Default)]
struct MaterialTable {
  material_remap: HashMap<u32, u32>,
  texture_remap: HashMap<u32, u32>,
  materials: Vec<Material>,
  textures: Vec<TextureDescriptor>,
}

impl MaterialTable {
  /// Compact index of source material `index`, decoding it on first use.
  fn resolve(&mut self, schema: &Schema<'_>, index: u32) -> u32 {
    if let Some(&compact) = self.material_remap.get(&index) {
      return compact;
    }
    let i = index as usize;
    let source = &schema.material;
    let texture = source
      .texture_index
      .map(|textures| textures[i])
      .filter(|&t| t != NO_INDEX)
      .map(|t| self.resolve_texture(schema, t));
    let material = Material {
      color: [source.color[0][i], source.color[1][i], source.color[2][i], source.color[3][i]],
      texture,
      uv_transform: source.uv_transform.map(|uv| uv.get(i)),
    };

    let compact = self.materials.len() as u32;
    self.materials.push(material);
    self.material_remap.insert(index, compact);
    compact
  }

  fn resolve_texture(&mut self, schema: &Schema<'_>, index: u32) -> u32 {
    if let Some(&compact) = self.texture_remap.get(&index) {
      return compact;
    }
    let i = index as usize;
    let info = &schema.texture_info;
    let texture = TextureDescriptor {
      width: info.width[i],
      height: info.height[i],
      format: info.format[i],
      data: schema.texture_data[info.data.get(i)].to_vec(),
    };

    let compact = self.textures.len() as u32;
    self.textures.push(texture);
    self.texture_remap.insert(index, compact);
    compact
  }
}

#[cfg(test)]
#[path = "build_test.rs"]
mod build_test;
