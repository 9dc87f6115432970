//! Process-wide order id allocation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing order ids starting from a configured
/// value. There is no reset.
///
/// Shared by reference (usually behind an `Arc`) between every component
/// that places orders, so ids never repeat within a process.
#[derive(Debug)]
pub struct OrderIdAllocator {
    next: AtomicU64,
}

impl OrderIdAllocator {
    #[must_use]
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }

    /// Returns the next id and advances the counter.
    pub fn allocate(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
