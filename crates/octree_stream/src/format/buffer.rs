//! NodeBuffer - owned byte storage with 8-byte alignment.
//!
//! Column views are handed out by casting slices of the buffer in place, so the
//! storage must be aligned for the widest element type (f64). A plain
//! `Vec<u8>` only guarantees byte alignment; backing the bytes with `u64`
//! words makes every column offset that is aligned relative to the start of
//! the buffer also aligned in memory.

/// Owned, 8-byte-aligned byte buffer holding one node file.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct NodeBuffer {
  words: Vec<u64>,
  len: usize,
}

impl NodeBuffer {
  /// Zero-filled buffer of `len` bytes, used to pre-size downloads.
  pub fn zeroed(len: usize) -> Self {
    Self {
      words: vec![0u64; len.div_ceil(8)],
      len,
    }
  }

  /// Copy `bytes` into a freshly aligned buffer.
  pub fn from_bytes(bytes: &[u8]) -> Self {
    let mut buffer = Self::zeroed(bytes.len());
    buffer.as_bytes_mut().copy_from_slice(bytes);
    buffer
  }

  /// Number of valid bytes.
  #[inline]
  pub fn len(&self) -> usize {
    self.len
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  #[inline]
  pub fn as_bytes(&self) -> &[u8] {
    &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
  }

  #[inline]
  pub fn as_bytes_mut(&mut self) -> &mut [u8] {
    &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
  }

  /// Resize to `new_len` bytes. Newly exposed bytes are zero.
  pub fn resize(&mut self, new_len: usize) {
    if new_len > self.len {
      let old_len = self.len;
      self.words.resize(new_len.div_ceil(8), 0);
      self.len = new_len;
      self.as_bytes_mut()[old_len..].fill(0);
    } else {
      self.len = new_len;
      self.words.truncate(new_len.div_ceil(8));
    }
  }

  /// Append bytes, growing the word storage geometrically.
  pub fn extend_from_slice(&mut self, bytes: &[u8]) {
    let start = self.len;
    let needed_words = (start + bytes.len()).div_ceil(8);
    if needed_words > self.words.capacity() {
      self.words.reserve(needed_words.max(self.words.capacity() * 2) - self.words.len());
    }
    self.resize(start + bytes.len());
    self.as_bytes_mut()[start..].copy_from_slice(bytes);
  }
}

impl std::fmt::Debug for NodeBuffer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "NodeBuffer({} bytes)", self.len)
  }
}

impl From<&[u8]> for NodeBuffer {
  fn from(bytes: &[u8]) -> Self {
    Self::from_bytes(bytes)
  }
}
