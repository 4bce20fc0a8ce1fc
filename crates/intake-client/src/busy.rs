//! Double-submission guard.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Flag held while a page action is in flight.
///
/// Not a queue: a second action while busy is refused, not deferred.
#[derive(Debug, Clone, Default)]
pub struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl BusyGuard {
    /// Creates an idle guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the guard busy, or returns `None` if it already is.
    pub fn try_acquire(&self) -> Option<BusyToken> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyToken { busy: Arc::clone(&self.busy) })
    }

    /// Whether an action is in flight; the submit control is disabled while true.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the guard on drop.
#[derive(Debug)]
pub struct BusyToken {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyToken {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
