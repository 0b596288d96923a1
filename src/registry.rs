//! Count of job monitors currently outstanding.
//!
//! The host owns one `JobRegistry` and hands a clone to every monitor it
//! builds. The count answers "is background work still being watched?".

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Shared pending-job counter. Clones share the same count.
#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    pending: Arc<AtomicUsize>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement, saturating at zero.
    pub fn decrement(&self) {
        let result = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if result.is_err() {
            tracing::warn!("Pending job count decremented below zero, ignored");
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn has_pending(&self) -> bool {
        self.pending() > 0
    }

    /// Count one monitor in; the returned guard counts it out exactly once.
    pub fn register(&self) -> Registration {
        self.increment();
        Registration {
            registry: Some(self.clone()),
        }
    }
}

/// Proof that one monitor is counted in the registry.
///
/// Released explicitly with [`Registration::release`] or implicitly on drop;
/// either way the count goes down once.
#[derive(Debug)]
pub struct Registration {
    registry: Option<JobRegistry>,
}

impl Registration {
    pub fn release(mut self) {
        self.release_once();
    }

    pub fn is_active(&self) -> bool {
        self.registry.is_some()
    }

    fn release_once(&mut self) {
        if let Some(registry) = self.registry.take() {
            registry.decrement();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release_once();
    }
}
