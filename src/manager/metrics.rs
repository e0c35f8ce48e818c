//! Per-manager refresh counters, readable without the `metrics` feature.

// std
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Point-in-time copy of [`RefreshMetrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshCounts {
	/// Refreshes that acquired the single-flight guard.
	pub attempts: u64,
	/// Refreshes that ended with a usable token, including one stored by a concurrent caller.
	pub successes: u64,
	/// Refreshes that ended with an error.
	pub failures: u64,
}

/// Refresh counters shared by every clone of a manager's `Arc`.
#[derive(Debug, Default)]
pub struct RefreshMetrics {
	attempts: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
}
impl RefreshMetrics {
	/// Reads all counters.
	pub fn snapshot(&self) -> RefreshCounts {
		RefreshCounts {
			attempts: self.attempts.load(Relaxed),
			successes: self.successes.load(Relaxed),
			failures: self.failures.load(Relaxed),
		}
	}

	pub(crate) fn record<T, E>(&self, result: &Result<T, E>) {
		self.attempts.fetch_add(1, Relaxed);

		let counter = if result.is_ok() { &self.successes } else { &self.failures };

		counter.fetch_add(1, Relaxed);
	}
}
