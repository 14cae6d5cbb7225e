//! Counter of in-flight work, awaitable until it drains to zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
  count: AtomicUsize,
  idle: Notify,
}

/// Shared count of active downloads or load tasks.
#[derive(Clone, Debug, Default)]
pub struct ActiveCounter {
  inner: Arc<Inner>,
}

impl ActiveCounter {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn get(&self) -> usize {
    self.inner.count.load(Ordering::Acquire)
  }

  /// Count one unit of work until the guard drops.
  pub fn enter(&self) -> ActiveGuard {
    self.inner.count.fetch_add(1, Ordering::AcqRel);
    ActiveGuard {
      inner: Arc::clone(&self.inner),
    }
  }

  /// Resolve once the count is zero.
  pub async fn wait_idle(&self) {
    loop {
      let idle = self.inner.idle.notified();
      tokio::pin!(idle);
      idle.as_mut().enable();
      if self.get() == 0 {
        return;
      }
      idle.await;
    }
  }
}

/// Decrements its counter on drop.
#[derive(Debug)]
pub struct ActiveGuard {
  inner: Arc<Inner>,
}

impl Drop for ActiveGuard {
  fn drop(&mut self) {
    if self.inner.count.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.inner.idle.notify_waiters();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_guard_counts() {
    let counter = ActiveCounter::new();
    let a = counter.enter();
    let b = counter.enter();
    assert_eq!(counter.get(), 2);
    drop(a);
    assert_eq!(counter.get(), 1);
    drop(b);
    assert_eq!(counter.get(), 0);
  }

  #[tokio::test]
  async fn test_wait_idle_resolves_after_last_guard() {
    let counter = ActiveCounter::new();
    counter.wait_idle().await;

    let guard = counter.enter();
    let waiter = {
      let counter = counter.clone();
      tokio::spawn(async move { counter.wait_idle().await })
    };
    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());
    drop(guard);
    waiter.await.unwrap();
  }
}
