//! BufferReader - aligned, zero-copy cursor over a node buffer.

use std::mem::{align_of, size_of};

use bytemuck::Pod;

use super::{ColumnVisitor, DecodeError, F16Bits};

/// Cursor handing out typed views into a byte buffer without copying.
///
/// Before each typed read the cursor is padded to the element type's
/// alignment, measured from the start of the buffer. The buffer itself must
/// start at an address aligned for the widest element read from it (see
/// [`NodeBuffer`](super::NodeBuffer)); otherwise reads fail with
/// [`DecodeError::Misaligned`].
#[derive(Clone, Debug)]
pub struct BufferReader<'a> {
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> BufferReader<'a> {
  pub fn new(bytes: &'a [u8]) -> Self {
    Self { bytes, pos: 0 }
  }

  /// Current cursor position in bytes.
  #[inline]
  pub fn position(&self) -> usize {
    self.pos
  }

  #[inline]
  pub fn remaining(&self) -> usize {
    self.bytes.len() - self.pos
  }

  #[inline]
  pub fn is_eof(&self) -> bool {
    self.pos == self.bytes.len()
  }

  /// Pad the cursor up to a multiple of `align`.
  pub fn align_to(&mut self, align: usize) -> Result<(), DecodeError> {
    let padded = self.pos.next_multiple_of(align);
    if padded > self.bytes.len() {
      return Err(DecodeError::Truncated {
        offset: self.pos,
        needed: padded - self.pos,
        available: self.remaining(),
      });
    }
    self.pos = padded;
    Ok(())
  }

  /// Read `count` elements of `T` as a borrowed slice.
  pub fn read<T: Pod>(&mut self, count: usize) -> Result<&'a [T], DecodeError> {
    self.align_to(align_of::<T>())?;
    let needed = count
      .checked_mul(size_of::<T>())
      .ok_or(DecodeError::Overflow)?;
    if needed > self.remaining() {
      return Err(DecodeError::Truncated {
        offset: self.pos,
        needed,
        available: self.remaining(),
      });
    }
    let bytes = &self.bytes[self.pos..self.pos + needed];
    let view = bytemuck::try_cast_slice(bytes)
      .map_err(|_| DecodeError::Misaligned { offset: self.pos })?;
    self.pos += needed;
    Ok(view)
  }

  pub fn read_u8(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
    self.read(count)
  }

  pub fn read_u16(&mut self, count: usize) -> Result<&'a [u16], DecodeError> {
    self.read(count)
  }

  pub fn read_u32(&mut self, count: usize) -> Result<&'a [u32], DecodeError> {
    self.read(count)
  }

  pub fn read_i8(&mut self, count: usize) -> Result<&'a [i8], DecodeError> {
    self.read(count)
  }

  pub fn read_i16(&mut self, count: usize) -> Result<&'a [i16], DecodeError> {
    self.read(count)
  }

  pub fn read_i32(&mut self, count: usize) -> Result<&'a [i32], DecodeError> {
    self.read(count)
  }

  /// Half floats are returned as raw bits.
  pub fn read_f16(&mut self, count: usize) -> Result<&'a [F16Bits], DecodeError> {
    self.read(count)
  }

  pub fn read_f32(&mut self, count: usize) -> Result<&'a [f32], DecodeError> {
    self.read(count)
  }

  pub fn read_f64(&mut self, count: usize) -> Result<&'a [f64], DecodeError> {
    self.read(count)
  }

  /// End-of-buffer check: every byte must have been consumed.
  pub fn finish(self) -> Result<(), DecodeError> {
    if self.is_eof() {
      Ok(())
    } else {
      Err(DecodeError::TrailingBytes {
        consumed: self.pos,
        len: self.bytes.len(),
      })
    }
  }
}

impl<'a> ColumnVisitor<'a> for BufferReader<'a> {
  fn header(&mut self, sizes: &mut [usize], flags: &mut [bool]) -> Result<(), DecodeError> {
    let raw_sizes = self.read_u32(sizes.len())?;
    for (size, raw) in sizes.iter_mut().zip(raw_sizes) {
      *size = *raw as usize;
    }
    let raw_flags = self.read_u8(flags.len())?;
    for (flag, raw) in flags.iter_mut().zip(raw_flags) {
      *flag = *raw != 0;
    }
    Ok(())
  }

  fn column<T: Pod>(&mut self, count: usize, slot: &mut &'a [T]) -> Result<(), DecodeError> {
    *slot = self.read(count)?;
    Ok(())
  }
}
