//! BufferWriter - serializes a schema with the same padding rules the reader
//! expects.

use std::mem::align_of;

use bytemuck::Pod;

use super::{ColumnVisitor, DecodeError, NodeBuffer};

/// Append-only byte sink mirroring [`BufferReader`](super::BufferReader).
#[derive(Debug, Default)]
pub struct BufferWriter {
  bytes: Vec<u8>,
}

impl BufferWriter {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn position(&self) -> usize {
    self.bytes.len()
  }

  /// Zero-pad up to a multiple of `align`.
  pub fn align_to(&mut self, align: usize) {
    let padded = self.bytes.len().next_multiple_of(align);
    self.bytes.resize(padded, 0);
  }

  pub fn write<T: Pod>(&mut self, values: &[T]) {
    self.align_to(align_of::<T>());
    self.bytes.extend_from_slice(bytemuck::cast_slice(values));
  }

  pub fn finish(self) -> NodeBuffer {
    NodeBuffer::from_bytes(&self.bytes)
  }
}

impl<'a> ColumnVisitor<'a> for BufferWriter {
  fn header(&mut self, sizes: &mut [usize], flags: &mut [bool]) -> Result<(), DecodeError> {
    let raw_sizes = sizes
      .iter()
      .map(|&size| u32::try_from(size).map_err(|_| DecodeError::Overflow))
      .collect::<Result<Vec<u32>, _>>()?;
    self.write(&raw_sizes);
    let raw_flags: Vec<u8> = flags.iter().map(|&flag| flag as u8).collect();
    self.write(&raw_flags);
    Ok(())
  }

  fn column<T: Pod>(&mut self, count: usize, slot: &mut &'a [T]) -> Result<(), DecodeError> {
    if slot.len() != count {
      return Err(DecodeError::ColumnLength {
        expected: count,
        actual: slot.len(),
      });
    }
    self.write(*slot);
    Ok(())
  }
}
