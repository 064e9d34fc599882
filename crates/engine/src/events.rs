//! Detector lifecycle events and the listener registry.
//!
//! Listeners are plain callbacks invoked inline on the updating thread.
//! Delivery walks a snapshot of the listener list taken outside the lock,
//! so a callback may subscribe or unsubscribe re-entrantly; changes take
//! effect from the next emit. Each callback runs inside its own panic
//! boundary: a misbehaving subscriber is logged and skipped, and never
//! blocks delivery to the rest or aborts a detection pass.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::error;

use pm_arb_core::Venue;

use crate::opportunity::ArbitrageOpportunity;

/// Lifecycle events published by the detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ArbEvent {
    /// A venue book for a pair was stored and a detection pass ran.
    MarketUpdate { pair_id: String, venue: Venue },
    /// A new opportunity entered the registry.
    OpportunityDetected(ArbitrageOpportunity),
    /// A registry entry aged past its validity window.
    OpportunityExpired(ArbitrageOpportunity),
    /// An entry was removed via `mark_executed`.
    OpportunityExecuted(ArbitrageOpportunity),
}

/// Handle returned by `on_event`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

type Callback = Arc<dyn Fn(&ArbEvent) + Send + Sync>;

/// Listener registry with per-callback panic isolation.
#[derive(Default)]
pub(crate) struct EventBus {
    listeners: RwLock<Vec<(u64, Callback)>>,
    next_handle: AtomicU64,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(&self, callback: Callback) -> ListenerHandle {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push((id, callback));
        ListenerHandle(id)
    }

    /// Removes a listener. Returns false for an unknown or stale handle.
    pub(crate) fn unsubscribe(&self, handle: ListenerHandle) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != handle.0);
        listeners.len() != before
    }

    /// Delivers `event` to every listener, isolating panics per callback.
    ///
    /// The listener list is cloned up front and the lock released before any
    /// callback runs, so callbacks are free to call `subscribe` or
    /// `unsubscribe` themselves.
    pub(crate) fn emit(&self, event: &ArbEvent) {
        let listeners: Vec<(u64, Callback)> = self.listeners.read().clone();
        for (id, callback) in &listeners {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                error!(listener = id, "event subscriber panicked; skipping");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.listeners.read().len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}
