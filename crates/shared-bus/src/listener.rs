//! # Listener Contract
//!
//! The subscription side of the bus: subsystems register a callback per
//! namespace and receive every event delivered in that namespace.

use crate::events::EventDelivery;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors a listener callback may return.
///
/// Application-level mismatches (unknown event, entity not found) are NOT
/// errors; the callback swallows them and returns `Ok(())` so delivery to
/// unrelated namespaces is unaffected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ListenerError {
    /// The listener cannot continue; the bus must stop delivering.
    #[error("fatal listener failure: {0}")]
    Fatal(String),
}

/// Errors from listener registration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// The bus is shutting down and no longer accepts listeners.
    #[error("event bus is shutting down")]
    ShuttingDown,

    /// The registration was rejected.
    #[error("listener registration rejected: {0}")]
    Rejected(String),
}

/// A callback invoked for every event delivered in one namespace.
#[async_trait]
pub trait NamespaceListener: Send + Sync {
    /// Handle one delivered event.
    async fn on_event(&self, event: EventDelivery) -> Result<(), ListenerError>;
}

/// The registration surface subsystems use to attach namespace listeners.
///
/// Registration is synchronous; there is no detach. A listener registered
/// for a namespace receives events until the process exits.
pub trait SystemEvents: Send + Sync {
    /// Register `listener` for all events delivered in `namespace`.
    fn add_namespace_listener(
        &self,
        namespace: &str,
        listener: Arc<dyn NamespaceListener>,
    ) -> Result<(), BusError>;
}
