use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Allows a single refresh-all run at a time
#[derive(Debug, Default)]
pub struct RefreshGuard {
    running: Arc<AtomicBool>,
}

/// Held for the duration of a refresh-all run; releases the guard on drop
#[derive(Debug)]
pub struct RefreshPermit {
    running: Arc<AtomicBool>,
}

impl RefreshGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard, or `None` when a run is already in progress
    pub fn try_acquire(&self) -> Option<RefreshPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshPermit {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
