//! # Event Dispatcher
//!
//! In-memory implementation of the bus. Suitable for single-node operation;
//! the delivery loop that feeds `dispatch` from persisted event records
//! lives with the event aggregator.

use crate::events::EventDelivery;
use crate::listener::{BusError, ListenerError, NamespaceListener, SystemEvents};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// In-memory, namespace-partitioned event bus.
///
/// Listeners are held per namespace and invoked in registration order. The
/// listener table lock is never held across a callback: dispatch snapshots
/// the namespace's listeners first, then awaits each one.
pub struct InMemoryEventBus {
    /// Registered listeners by namespace.
    listeners: RwLock<HashMap<String, Vec<Arc<dyn NamespaceListener>>>>,

    /// Total events handed to `dispatch`.
    events_dispatched: AtomicU64,

    /// Cleared on shutdown; registrations are refused afterwards.
    accepting: AtomicBool,
}

impl InMemoryEventBus {
    /// Create a new bus with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            events_dispatched: AtomicU64::new(0),
            accepting: AtomicBool::new(true),
        }
    }

    /// Deliver one event to every listener registered for its namespace.
    ///
    /// A [`ListenerError::Fatal`] return stops delivery immediately and
    /// propagates to the caller; remaining listeners are not invoked.
    pub async fn dispatch(&self, event: EventDelivery) -> Result<(), ListenerError> {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);

        // Snapshot so no lock is held across a callback.
        let targets: Vec<Arc<dyn NamespaceListener>> = self
            .listeners
            .read()
            .get(&event.namespace)
            .cloned()
            .unwrap_or_default();

        if targets.is_empty() {
            // Dropping the final outcome of a tracked action is worth more
            // noise than dropping a progress notification.
            if event.event_type.is_terminal_outcome() {
                warn!(
                    namespace = %event.namespace,
                    event_type = ?event.event_type,
                    "No listeners for namespace, terminal outcome dropped"
                );
            } else {
                debug!(
                    namespace = %event.namespace,
                    event_type = ?event.event_type,
                    "No listeners for namespace, event dropped"
                );
            }
            return Ok(());
        }

        for listener in targets {
            if let Err(e) = listener.on_event(event.clone()).await {
                warn!(
                    namespace = %event.namespace,
                    event_id = %event.id,
                    error = %e,
                    "Listener returned fatal error, stopping delivery"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Number of listeners registered for a namespace.
    #[must_use]
    pub fn listener_count(&self, namespace: &str) -> usize {
        self.listeners
            .read()
            .get(namespace)
            .map_or(0, Vec::len)
    }

    /// Total events handed to `dispatch` since construction.
    #[must_use]
    pub fn events_dispatched(&self) -> u64 {
        self.events_dispatched.load(Ordering::Relaxed)
    }

    /// Refuse further listener registrations.
    ///
    /// Existing listeners keep receiving events; this only fences new
    /// registrations during process exit.
    pub fn shutdown(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemEvents for InMemoryEventBus {
    fn add_namespace_listener(
        &self,
        namespace: &str,
        listener: Arc<dyn NamespaceListener>,
    ) -> Result<(), BusError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(BusError::ShuttingDown);
        }

        self.listeners
            .write()
            .entry(namespace.to_string())
            .or_default()
            .push(listener);

        debug!(namespace = %namespace, "Namespace listener registered");
        Ok(())
    }
}
