//! Rate limiting for node downloads.
//!
//! Prevents bursts of requests when the camera jumps by limiting how many
//! new downloads start per frame and how many may be in flight at once.

use serde::Deserialize;

/// Rate limiting configuration for node requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RequestBudget {
	/// Maximum new requests per frame (0 = unlimited).
	pub max_new_per_frame: usize,
	/// Maximum requests in flight (0 = unlimited).
	pub max_in_flight: usize,
}

impl RequestBudget {
	/// Default budget with reasonable limits.
	pub const DEFAULT: Self = Self {
		max_new_per_frame: 8,
		max_in_flight: 32,
	};

	/// Unlimited budget for testing or preloading.
	pub const UNLIMITED: Self = Self {
		max_new_per_frame: 0,
		max_in_flight: 0,
	};

	/// Check if another request may start this frame.
	#[inline]
	pub fn can_request(&self, issued_this_frame: usize, in_flight: usize) -> bool {
		(self.max_new_per_frame == 0 || issued_this_frame < self.max_new_per_frame)
			&& (self.max_in_flight == 0 || in_flight < self.max_in_flight)
	}
}

impl Default for RequestBudget {
	fn default() -> Self {
		Self::DEFAULT
	}
}

/// Statistics from one frame update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
	/// Nodes evaluated by the traversal.
	pub nodes_visited: usize,
	/// Visited nodes not culled.
	pub nodes_visible: usize,
	/// Downloads started.
	pub requests_issued: usize,
	/// Requests waiting for budget.
	pub requests_deferred: usize,
	/// In-flight downloads cancelled by disposal.
	pub requests_aborted: usize,
	/// Nodes that became ready.
	pub ready: usize,
	/// Requests that failed.
	pub failed: usize,
	/// Nodes collapsed back from a loaded or loading state.
	pub disposed: usize,
}

impl FrameStats {
	/// Whether anything changed state this frame.
	#[inline]
	pub fn has_activity(&self) -> bool {
		self.requests_issued + self.requests_aborted + self.ready + self.failed + self.disposed > 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_budget() {
		let budget = RequestBudget::default();
		assert_eq!(budget.max_new_per_frame, 8);
		assert_eq!(budget.max_in_flight, 32);
	}

	#[test]
	fn test_can_request() {
		let budget = RequestBudget {
			max_new_per_frame: 2,
			max_in_flight: 3,
		};
		assert!(budget.can_request(0, 0));
		assert!(budget.can_request(1, 2));
		assert!(!budget.can_request(2, 0));
		assert!(!budget.can_request(0, 3));
	}

	#[test]
	fn test_unlimited_budget_always_allows() {
		let budget = RequestBudget::UNLIMITED;
		assert!(budget.can_request(1000, 1000));
	}

	#[test]
	fn test_stats_activity() {
		assert!(!FrameStats::default().has_activity());
		let stats = FrameStats {
			nodes_visited: 10,
			..Default::default()
		};
		assert!(!stats.has_activity());
		let stats = FrameStats {
			ready: 1,
			..Default::default()
		};
		assert!(stats.has_activity());
	}
}
