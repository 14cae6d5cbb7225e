use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::*;
use crate::highlight::{HighlightTable, FILTERED, NO_HIGHLIGHT};

#[test]
fn test_try_lock_excludes() {
  let mutex = HighlightMutex::new();
  assert!(mutex.try_lock());
  assert!(mutex.is_locked());
  assert!(!mutex.try_lock());
  mutex.unlock();
  assert!(!mutex.is_locked());
}

/// Releasing a lock that is not held is a programming error.
#[test]
#[should_panic(expected = "not locked")]
fn test_unlock_unlocked_panics() {
  HighlightMutex::new().unlock();
}

/// Blocking lockers never overlap and never lose an increment.
#[test]
fn test_blocking_mutual_exclusion() {
  const THREADS: usize = 4;
  const ITERATIONS: u32 = 2_000;

  let table = Arc::new(HighlightTable::new(4));
  let inside = Arc::new(AtomicBool::new(false));

  let handles: Vec<_> = (0..THREADS)
    .map(|_| {
      let table = Arc::clone(&table);
      let inside = Arc::clone(&inside);
      thread::spawn(move || {
        for _ in 0..ITERATIONS {
          let mut guard = table.lock_blocking();
          assert!(!inside.swap(true, Ordering::SeqCst), "two holders at once");
          let value = u32::from_ne_bytes(guard[..4].try_into().unwrap());
          guard[..4].copy_from_slice(&(value + 1).to_ne_bytes());
          inside.store(false, Ordering::SeqCst);
        }
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  let guard = table.lock_spin();
  assert_eq!(
    u32::from_ne_bytes(guard[..4].try_into().unwrap()),
    THREADS as u32 * ITERATIONS
  );
}

/// Spin and blocking lockers contend on the same cell.
#[test]
fn test_spin_and_blocking_mix() {
  let table = Arc::new(HighlightTable::new(1));
  let blocker = {
    let table = Arc::clone(&table);
    thread::spawn(move || {
      for _ in 0..500 {
        let mut guard = table.lock_blocking();
        guard[0] = guard[0].wrapping_add(1);
      }
    })
  };
  for _ in 0..500 {
    let mut guard = table.lock_spin();
    guard[0] = guard[0].wrapping_add(1);
  }
  blocker.join().unwrap();
  assert_eq!(table.lock_spin()[0], (1000u32 % 256) as u8);
}

/// An async waiter is woken when a blocking holder releases.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_waits_for_release() {
  let table = Arc::new(HighlightTable::new(2));
  let held = table.lock_spin();

  let waiter = {
    let table = Arc::clone(&table);
    tokio::spawn(async move {
      let guard = table.lock_async().await;
      guard[1]
    })
  };
  tokio::time::sleep(Duration::from_millis(20)).await;
  assert!(!waiter.is_finished());

  let mut held = held;
  held[1] = 7;
  drop(held);

  assert_eq!(waiter.await.unwrap(), 7);
}

#[test]
fn test_try_lock_guard_releases_on_drop() {
  let table = HighlightTable::new(1);
  let guard = table.try_lock().expect("free");
  assert!(table.try_lock().is_none());
  drop(guard);
  assert!(table.try_lock().is_some());
}

#[test]
fn test_guard_set_grows_table() {
  let table = HighlightTable::new(2);
  let mut guard = table.lock_spin();
  guard.set(9, FILTERED);
  assert_eq!(guard.len(), 10);
  assert!(!guard.is_visible(9));
  assert!(guard.is_visible(1));
  assert_eq!(guard.get(100), NO_HIGHLIGHT);
  guard.clear();
  assert!(guard.is_visible(9));
}
