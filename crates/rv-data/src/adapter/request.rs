//! Staleness guard for overlapping fetches

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Hands out tickets; only the most recent ticket is current
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    generation: Arc<AtomicU64>,
}

/// Proof of when a fetch was started
#[derive(Debug, Clone)]
pub struct RequestTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding every earlier ticket
    pub fn begin(&self) -> RequestTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket {
            generation,
            current: self.generation.clone(),
        }
    }

    /// Supersede every outstanding ticket without starting a request
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

impl RequestTicket {
    /// Whether no later request has been started since this one
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
