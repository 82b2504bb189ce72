//! The process-wide table of blocked callers, partitioned by namespace.
//!
//! One coarse mutex guards the whole two-level map. Contention is one lock
//! acquisition per event and per register/remove, and the single lock rules
//! out double-resolution races between registration and matching.

use crate::domain::error::BridgeError;
use crate::domain::request::{InflightOutcome, InflightRequest, RequestKind};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;
use uuid::Uuid;

/// namespace → (id → inflight)
type InflightTable = HashMap<String, HashMap<Uuid, Arc<InflightRequest>>>;

/// Thread-safe registry of currently-blocked requests.
///
/// Within a namespace ids are unique across kinds; callers are trusted to
/// pick distinct ids per request, and exact duplicates are rejected.
pub struct InflightRegistry {
    table: Mutex<InflightTable>,
}

impl InflightRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new inflight request.
    ///
    /// `on_first_inflight` runs under the lock the first time a namespace
    /// is seen, before anything is inserted; its failure aborts the
    /// registration so the namespace row is only ever created with a
    /// listener attached. A namespace row, once created, survives until
    /// process exit, so the hook fires at most once per namespace.
    pub fn add(
        &self,
        namespace: &str,
        id: Uuid,
        kind: RequestKind,
        on_first_inflight: impl FnOnce() -> Result<(), BridgeError>,
    ) -> Result<(Arc<InflightRequest>, oneshot::Receiver<InflightOutcome>), BridgeError> {
        let mut table = self.table.lock();

        if !table.contains_key(namespace) {
            on_first_inflight()?;
        }
        let row = table.entry(namespace.to_string()).or_default();

        if row.contains_key(&id) {
            return Err(BridgeError::DuplicateInflight {
                namespace: namespace.to_string(),
                id,
            });
        }

        let (inflight, receiver) = InflightRequest::new(namespace, id, kind);
        row.insert(id, Arc::clone(&inflight));
        Ok((inflight, receiver))
    }

    /// Look up an inflight by namespace, kind, and id.
    ///
    /// The stored kind must equal the requested kind; an id registered
    /// under a different kind is invisible to this lookup. That is what
    /// lets the matcher probe several kinds for one event without
    /// aliasing.
    #[must_use]
    pub fn get(
        &self,
        namespace: &str,
        kind: RequestKind,
        id: &Uuid,
    ) -> Option<Arc<InflightRequest>> {
        let table = self.table.lock();
        match table.get(namespace).and_then(|row| row.get(id)) {
            Some(inflight) if inflight.kind() == kind => Some(Arc::clone(inflight)),
            _ => None,
        }
    }

    /// Remove an inflight. Idempotent; removing an absent id is a no-op.
    pub fn remove(&self, namespace: &str, id: &Uuid) {
        let mut table = self.table.lock();
        if let Some(row) = table.get_mut(namespace) {
            row.remove(id);
        }
    }

    /// Whether a namespace currently has no inflight requests.
    ///
    /// The event callback's fast path: when this is true the event cannot
    /// match and no store read is needed.
    #[must_use]
    pub fn namespace_is_idle(&self, namespace: &str) -> bool {
        self.table
            .lock()
            .get(namespace)
            .map_or(true, HashMap::is_empty)
    }

    /// Number of inflight requests in a namespace.
    #[must_use]
    pub fn inflight_count(&self, namespace: &str) -> usize {
        self.table.lock().get(namespace).map_or(0, HashMap::len)
    }
}

impl Default for InflightRegistry {
    fn default() -> Self {
        Self::new()
    }
}
