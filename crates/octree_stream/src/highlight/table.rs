//! HighlightTable - per-object highlight bytes behind a [`HighlightMutex`].

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};

use super::HighlightMutex;

/// No highlight.
pub const NO_HIGHLIGHT: u8 = 0;
/// Object is filtered out of the build entirely.
pub const FILTERED: u8 = 0xFF;

/// Byte per object id, shared between the foreground (sole writer) and the
/// decode threads (readers for the duration of one node build).
pub struct HighlightTable {
  mutex: HighlightMutex,
  bytes: UnsafeCell<Vec<u8>>,
}

// SAFETY: `bytes` is only reached through a guard, and a guard only exists
// while `mutex` is held.
unsafe impl Sync for HighlightTable {}

impl HighlightTable {
  /// Table for `object_count` objects, all unhighlighted.
  pub fn new(object_count: usize) -> Self {
    Self {
      mutex: HighlightMutex::new(),
      bytes: UnsafeCell::new(vec![NO_HIGHLIGHT; object_count]),
    }
  }

  pub fn lock_spin(&self) -> HighlightGuard<'_> {
    self.mutex.lock_spin();
    HighlightGuard { table: self }
  }

  pub fn lock_blocking(&self) -> HighlightGuard<'_> {
    self.mutex.lock_blocking();
    HighlightGuard { table: self }
  }

  pub async fn lock_async(&self) -> HighlightGuard<'_> {
    self.mutex.lock_async().await;
    HighlightGuard { table: self }
  }

  pub fn try_lock(&self) -> Option<HighlightGuard<'_>> {
    self.mutex.try_lock().then(|| HighlightGuard { table: self })
  }
}

impl Default for HighlightTable {
  fn default() -> Self {
    Self::new(0)
  }
}

impl std::fmt::Debug for HighlightTable {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HighlightTable")
      .field("locked", &self.mutex.is_locked())
      .finish_non_exhaustive()
  }
}

/// Exclusive access to the table; unlocks on drop.
pub struct HighlightGuard<'a> {
  table: &'a HighlightTable,
}

impl HighlightGuard<'_> {
  /// Highlight byte of `object_id`, [`NO_HIGHLIGHT`] past the end.
  pub fn get(&self, object_id: u32) -> u8 {
    self.deref().get(object_id as usize).copied().unwrap_or(NO_HIGHLIGHT)
  }

  /// Set one entry, growing the table if needed.
  pub fn set(&mut self, object_id: u32, value: u8) {
    let bytes = self.bytes_mut();
    let i = object_id as usize;
    if i >= bytes.len() {
      bytes.resize(i + 1, NO_HIGHLIGHT);
    }
    bytes[i] = value;
  }

  /// Whether the object survives the highlight-based filter.
  pub fn is_visible(&self, object_id: u32) -> bool {
    self.get(object_id) != FILTERED
  }

  /// Reset every entry.
  pub fn clear(&mut self) {
    self.bytes_mut().fill(NO_HIGHLIGHT);
  }

  fn bytes_mut(&mut self) -> &mut Vec<u8> {
    // SAFETY: the guard holds the lock and `&mut self` excludes other borrows
    // through this guard.
    unsafe { &mut *self.table.bytes.get() }
  }
}

impl Deref for HighlightGuard<'_> {
  type Target = [u8];

  fn deref(&self) -> &[u8] {
    // SAFETY: the guard holds the lock.
    unsafe { &*self.table.bytes.get() }
  }
}

impl DerefMut for HighlightGuard<'_> {
  fn deref_mut(&mut self) -> &mut [u8] {
    self.bytes_mut()
  }
}

impl Drop for HighlightGuard<'_> {
  fn drop(&mut self) {
    self.table.mutex.unlock();
  }
}
