//! Stale-response guard for overlapping fetches of the same view.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic ticket counter, one per view. `begin` issues a ticket before the
/// fetch; `accept` is true only for the most recently issued ticket, so a
/// slow response that lands after a newer fetch began is discarded instead of
/// overwriting fresher data.
#[derive(Debug, Default)]
pub struct RefreshTracker {
    latest: AtomicU64,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the ticket for a fetch that is about to start.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether a response carrying `ticket` is still the latest.
    pub fn accept(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}
