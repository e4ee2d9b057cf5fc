//! Single-flight guard for generation requests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// At most one generation request may be outstanding.
///
/// A failed acquire means the caller drops its trigger; nothing is queued.
#[derive(Debug, Clone, Default)]
pub struct GenerationGate {
    in_flight: Arc<AtomicBool>,
}

impl GenerationGate {
    /// Create an open gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or `None` if a request is already outstanding
    pub fn try_acquire(&self) -> Option<GatePermit> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GatePermit {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    /// Whether a permit is currently held
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Held for the duration of one request; the gate reopens when it drops.
#[derive(Debug)]
#[must_use = "the gate reopens as soon as the permit is dropped"]
pub struct GatePermit {
    in_flight: Arc<AtomicBool>,
}

impl GatePermit {
    pub fn release(self) {}
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}
