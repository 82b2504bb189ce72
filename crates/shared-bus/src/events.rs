//! # Event Records
//!
//! Defines the event types delivered through the shared bus. Events are
//! thin notifications: a type, a namespace, and a reference to the entity
//! the event is about. Consumers hydrate the entity themselves.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All event types the node emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A transaction was submitted to the blockchain.
    TransactionSubmitted,
    /// A message completed aggregation and is confirmed network-wide.
    MessageConfirmed,
    /// A message failed validation and was rejected.
    MessageRejected,
    /// A token pool was confirmed by its connector.
    PoolConfirmed,
    /// A token pool was rejected by its connector.
    PoolRejected,
    /// A token transfer was confirmed on-chain.
    TransferConfirmed,
    /// The operation backing a token transfer failed.
    TransferOpFailed,
    /// A namespace definition was confirmed network-wide.
    NamespaceConfirmed,
}

impl EventType {
    /// Whether this event is the final outcome of some tracked action,
    /// as opposed to a progress notification.
    #[must_use]
    pub fn is_terminal_outcome(&self) -> bool {
        match self {
            Self::MessageConfirmed
            | Self::MessageRejected
            | Self::PoolConfirmed
            | Self::PoolRejected
            | Self::TransferConfirmed
            | Self::TransferOpFailed => true,
            Self::TransactionSubmitted | Self::NamespaceConfirmed => false,
        }
    }
}

/// One event as delivered to a namespace listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDelivery {
    /// Unique id of the event record itself.
    pub id: Uuid,
    /// What happened.
    pub event_type: EventType,
    /// Namespace the event occurred in.
    pub namespace: String,
    /// Id of the entity the event refers to (message, pool, transfer,
    /// or operation, depending on `event_type`).
    pub reference: Uuid,
}

impl EventDelivery {
    /// Create a new event record with a fresh event id.
    #[must_use]
    pub fn new(event_type: EventType, namespace: &str, reference: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type,
            namespace: namespace.to_string(),
            reference,
        }
    }
}
