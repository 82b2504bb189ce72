//! Match rules: which event types resolve which request kinds.
//!
//! The rules are pure functions over the event type and the hydrated
//! entity; the service layer owns store access and resolver dispatch.

use crate::domain::request::RequestKind;
use shared_bus::EventType;
use shared_types::{Message, TokenPool, TokenTransfer};
use uuid::Uuid;

/// Which store read an event requires before it can be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationSource {
    /// Event references a message.
    Message,
    /// Event references a token pool.
    Pool,
    /// Event references a token transfer.
    Transfer,
    /// Event references an operation whose inputs name the transfer.
    Operation,
}

/// The store read an event type requires, or `None` for event types the
/// bridge ignores outright.
#[must_use]
pub fn hydration_source(event_type: EventType) -> Option<HydrationSource> {
    match event_type {
        EventType::MessageConfirmed | EventType::MessageRejected => Some(HydrationSource::Message),
        EventType::PoolConfirmed | EventType::PoolRejected => Some(HydrationSource::Pool),
        EventType::TransferConfirmed => Some(HydrationSource::Transfer),
        EventType::TransferOpFailed => Some(HydrationSource::Operation),
        EventType::TransactionSubmitted | EventType::NamespaceConfirmed => None,
    }
}

/// A hydrated entity, borrowed for the duration of matching.
///
/// For `TransferOpFailed` events the transfer is the one decoded from the
/// failed operation's inputs, not a stored row.
#[derive(Debug, Clone, Copy)]
pub enum EventEntity<'a> {
    /// A message row.
    Message(&'a Message),
    /// A token pool row.
    Pool(&'a TokenPool),
    /// A token transfer.
    Transfer(&'a TokenTransfer),
}

/// How a matched inflight is to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Deliver the confirmed message.
    DeliverMessage,
    /// Deliver the message as a correlated reply, data inlined.
    DeliverReply,
    /// Deliver the confirmed token pool.
    DeliverPool,
    /// Deliver the confirmed token transfer.
    DeliverTransfer,
    /// Fail the waiter: the message was rejected.
    RejectMessage,
    /// Fail the waiter: the pool was rejected.
    RejectPool,
    /// Fail the waiter: the transfer's operation failed.
    FailTransfer,
}

/// One lookup to attempt against the inflight registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchProbe {
    /// Request kind to probe.
    pub kind: RequestKind,
    /// Inflight id to probe for.
    pub key: Uuid,
    /// Resolution to apply on a hit.
    pub outcome: MatchOutcome,
}

/// The probes an event yields against its hydrated entity.
///
/// `MessageConfirmed` is the only event that can yield two probes: the
/// message's correlation id may resolve a reply-waiter while the message's
/// own id resolves a confirm-waiter. Both are attempted independently.
#[must_use]
pub fn probes_for(event_type: EventType, entity: &EventEntity<'_>) -> Vec<MatchProbe> {
    match (event_type, entity) {
        (EventType::MessageConfirmed, EventEntity::Message(msg)) => {
            let mut probes = Vec::with_capacity(2);
            if let Some(correlation_id) = msg.header.correlation_id {
                probes.push(MatchProbe {
                    kind: RequestKind::MessageReply,
                    key: correlation_id,
                    outcome: MatchOutcome::DeliverReply,
                });
            }
            probes.push(MatchProbe {
                kind: RequestKind::MessageConfirm,
                key: msg.header.id,
                outcome: MatchOutcome::DeliverMessage,
            });
            probes
        }
        (EventType::MessageRejected, EventEntity::Message(msg)) => vec![MatchProbe {
            kind: RequestKind::MessageConfirm,
            key: msg.header.id,
            outcome: MatchOutcome::RejectMessage,
        }],
        (EventType::PoolConfirmed, EventEntity::Pool(pool)) => vec![MatchProbe {
            kind: RequestKind::TokenPoolConfirm,
            key: pool.id,
            outcome: MatchOutcome::DeliverPool,
        }],
        (EventType::PoolRejected, EventEntity::Pool(pool)) => vec![MatchProbe {
            kind: RequestKind::TokenPoolConfirm,
            key: pool.id,
            outcome: MatchOutcome::RejectPool,
        }],
        (EventType::TransferConfirmed, EventEntity::Transfer(transfer)) => vec![MatchProbe {
            kind: RequestKind::TokenTransferConfirm,
            key: transfer.local_id,
            outcome: MatchOutcome::DeliverTransfer,
        }],
        (EventType::TransferOpFailed, EventEntity::Transfer(transfer)) => vec![MatchProbe {
            kind: RequestKind::TokenTransferConfirm,
            key: transfer.local_id,
            outcome: MatchOutcome::FailTransfer,
        }],
        _ => Vec::new(),
    }
}
