use super::*;

/// Every combination of optional attributes, channel counts and flags.
fn all_keys() -> impl Iterator<Item = LayoutKey> {
  (0..=VertexAttributes::all().bits()).flat_map(|bits| {
    let attributes = VertexAttributes::from_bits_truncate(bits);
    (0..=4u8).flat_map(move |channels| {
      (0..8u8).map(move |switches| LayoutKey {
        attributes,
        num_deviation_channels: channels,
        position32: switches & 1 != 0,
        has_materials: switches & 2 != 0,
        has_object_ids: switches & 4 != 0,
      })
    })
  })
}

/// Stride is a multiple of the largest component in its buffer.
#[test]
fn test_stride_multiple_of_largest_component() {
  for key in all_keys() {
    for buffer in &group_layout(&key).buffers {
      let largest = buffer
        .attributes
        .iter()
        .map(|a| a.format.component.byte_size())
        .max()
        .unwrap_or(1);
      assert_eq!(buffer.stride % largest, 0, "{key:?} {buffer:?}");
    }
  }
}

/// No two attributes in one buffer share a byte, and all fit the stride.
#[test]
fn test_attributes_do_not_overlap() {
  for key in all_keys() {
    for buffer in &group_layout(&key).buffers {
      let mut spans: Vec<_> = buffer.attributes.iter().map(|a| a.span()).collect();
      spans.sort_by_key(|span| span.start);
      for pair in spans.windows(2) {
        assert!(pair[0].end <= pair[1].start, "{key:?} overlaps: {spans:?}");
      }
      if let Some(last) = spans.last() {
        assert!(last.end <= buffer.stride);
      }
    }
  }
}

/// Every attribute starts at a multiple of its component size.
#[test]
fn test_offsets_are_aligned() {
  for key in all_keys() {
    for buffer in &group_layout(&key).buffers {
      for attribute in &buffer.attributes {
        assert_eq!(attribute.offset % attribute.format.component.byte_size(), 0);
      }
    }
  }
}

/// Descending component size means a point cloud with color and intensity
/// packs into 6 bytes with no hole.
#[test]
fn test_descending_size_packs_tightly() {
  let key = LayoutKey {
    attributes: VertexAttributes::INTENSITY | VertexAttributes::COLOR,
    ..Default::default()
  };
  let layout = group_layout(&key);
  let attributes = layout.buffer(BufferRole::Attributes).unwrap();

  assert_eq!(attributes.find(VertexSemantic::Intensity).unwrap().offset, 0);
  assert_eq!(attributes.find(VertexSemantic::Color).unwrap().offset, 2);
  assert_eq!(attributes.stride, 6);
}

#[test]
fn test_position_only() {
  let layout = group_layout(&LayoutKey::default());
  assert_eq!(layout.buffers.len(), 1);
  assert_eq!(layout.vertex_stride(), 6);

  let layout = group_layout(&LayoutKey {
    position32: true,
    ..Default::default()
  });
  assert_eq!(layout.vertex_stride(), 12);
}

/// Object ids add a separate one-byte highlight buffer.
#[test]
fn test_highlight_buffer() {
  let layout = group_layout(&LayoutKey {
    has_object_ids: true,
    ..Default::default()
  });
  let highlight = layout.buffer(BufferRole::Highlight).unwrap();
  assert_eq!(highlight.stride, 1);
  assert!(layout.buffer(BufferRole::Attributes).is_none());
}

/// Deviation without channels stores nothing.
#[test]
fn test_zero_deviation_channels() {
  let layout = group_layout(&LayoutKey {
    attributes: VertexAttributes::DEVIATION,
    num_deviation_channels: 0,
    ..Default::default()
  });
  assert!(layout.buffer(BufferRole::Attributes).is_none());
}
