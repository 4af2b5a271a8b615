//! Processing gate: at most one batch in flight per uploader.

use std::sync::atomic::{AtomicBool, Ordering};

/// Message of the `error` event for a selection made while a batch is uploading.
pub const BUSY_MESSAGE: &str = "file(s) uploading, try later.";

/// Flag guarding batch admission.
///
/// `try_start` claims the gate for a new selection; it reopens when the batch
/// completes, or when the selection turns out to accept nothing.
#[derive(Debug, Default)]
pub struct ProcessingGate {
    active: AtomicBool,
}

impl ProcessingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate. Returns false if a batch is already in flight.
    pub fn try_start(&self) -> bool {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_start_is_rejected_until_finish() {
        let gate = ProcessingGate::new();
        assert!(!gate.is_active());

        assert!(gate.try_start());
        assert!(gate.is_active());
        assert!(!gate.try_start());

        gate.finish();
        assert!(!gate.is_active());
        assert!(gate.try_start());
    }
}
