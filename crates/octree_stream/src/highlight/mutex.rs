//! HighlightMutex - binary lock over one atomic cell with three acquire modes.
//!
//! | Mode            | Waits by                     | Used from                  |
//! |-----------------|------------------------------|----------------------------|
//! | `lock_spin`     | busy CAS loop                | foreground, short writes   |
//! | `lock_blocking` | CAS, then `Condvar` wait     | decode threads (rayon)     |
//! | `lock_async`    | CAS, then `Notify` await     | async tasks                |
//!
//! All modes contend on the same `AtomicU32`, so any mix of them excludes
//! each other. `unlock` wakes every parked waiter; each one retries the CAS
//! and the losers park again.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use tokio::sync::Notify;

const UNLOCKED: u32 = 0;
const LOCKED: u32 = 1;

#[derive(Debug, Default)]
pub struct HighlightMutex {
  cell: AtomicU32,
  /// Guards the gap between a blocking waiter's failed CAS and its park.
  parking: Mutex<()>,
  parked: Condvar,
  notify: Notify,
}

impl HighlightMutex {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn try_lock(&self) -> bool {
    self
      .cell
      .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
      .is_ok()
  }

  #[inline]
  pub fn is_locked(&self) -> bool {
    self.cell.load(Ordering::Relaxed) == LOCKED
  }

  /// Busy-wait. Only for short, mostly uncontended critical sections.
  pub fn lock_spin(&self) {
    while !self.try_lock() {
      while self.is_locked() {
        std::hint::spin_loop();
      }
    }
  }

  /// Block the calling thread until the lock is acquired.
  pub fn lock_blocking(&self) {
    if self.try_lock() {
      return;
    }
    let mut parking = self.parking.lock().unwrap_or_else(PoisonError::into_inner);
    while !self.try_lock() {
      parking = self
        .parked
        .wait(parking)
        .unwrap_or_else(PoisonError::into_inner);
    }
  }

  /// Acquire without blocking the executor thread.
  pub async fn lock_async(&self) {
    loop {
      if self.try_lock() {
        return;
      }
      let notified = self.notify.notified();
      tokio::pin!(notified);
      // Register before the retry so an unlock in between is not missed.
      notified.as_mut().enable();
      if self.try_lock() {
        return;
      }
      notified.await;
    }
  }

  /// Release the lock and wake every waiter.
  ///
  /// # Panics
  /// If the lock is not held.
  pub fn unlock(&self) {
    if self
      .cell
      .compare_exchange(LOCKED, UNLOCKED, Ordering::Release, Ordering::Relaxed)
      .is_err()
    {
      panic!("HighlightMutex::unlock called while not locked");
    }
    // A blocking waiter holds `parking` from its failed CAS until it parks.
    drop(self.parking.lock().unwrap_or_else(PoisonError::into_inner));
    self.parked.notify_all();
    self.notify.notify_waiters();
  }
}

#[cfg(test)]
#[path = "mutex_test.rs"]
mod mutex_test;
