//! Inflight request state: one entry per blocked caller, with a set-once
//! response slot the resolver delivers into.

use crate::domain::error::BridgeError;
use parking_lot::Mutex;
use shared_types::{Message, MessageInOut, TokenPool, TokenTransfer};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;
use uuid::Uuid;

/// What a blocked caller is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// Confirmation of a message this node sent.
    MessageConfirm,
    /// A reply correlated to a message this node sent.
    MessageReply,
    /// Confirmation of a token pool this node created.
    TokenPoolConfirm,
    /// Confirmation of a token transfer this node submitted.
    TokenTransferConfirm,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MessageConfirm => "message_confirm",
            Self::MessageReply => "message_reply",
            Self::TokenPoolConfirm => "token_pool_confirm",
            Self::TokenTransferConfirm => "token_transfer_confirm",
        };
        f.write_str(s)
    }
}

/// The payload variants a resolution can carry, tagged by request kind so
/// the waiter wrappers narrow without casting.
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    /// A confirmed message.
    Message(Message),
    /// A correlated reply with its data inlined.
    Reply(MessageInOut),
    /// A confirmed token pool.
    TokenPool(TokenPool),
    /// A confirmed token transfer.
    TokenTransfer(TokenTransfer),
}

impl ResponsePayload {
    /// The request kind this payload satisfies.
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Message(_) => RequestKind::MessageConfirm,
            Self::Reply(_) => RequestKind::MessageReply,
            Self::TokenPool(_) => RequestKind::TokenPoolConfirm,
            Self::TokenTransfer(_) => RequestKind::TokenTransferConfirm,
        }
    }
}

/// A successful resolution.
///
/// `id` is the resolving entity's identifier, which may differ from the
/// inflight id: a reply resolution carries the reply message's id, not the
/// id of the message being replied to.
#[derive(Debug)]
pub struct InflightResponse {
    /// Id of the entity that resolved the request.
    pub id: Uuid,
    /// The resolved payload.
    pub payload: ResponsePayload,
}

/// What travels through the response slot: a payload or a typed error
/// (rejection, failure).
pub type InflightOutcome = Result<InflightResponse, BridgeError>;

/// One blocked caller.
///
/// The response slot is a oneshot sender behind a take-once holder: the
/// first resolution consumes it, every later match finds it empty and is
/// dropped. Only the originating waiter holds the receiving end.
pub struct InflightRequest {
    id: Uuid,
    namespace: String,
    kind: RequestKind,
    start_time: Instant,
    slot: Mutex<Option<oneshot::Sender<InflightOutcome>>>,
}

impl InflightRequest {
    /// Create an inflight entry and the receiver its waiter blocks on.
    pub(crate) fn new(
        namespace: &str,
        id: Uuid,
        kind: RequestKind,
    ) -> (Arc<Self>, oneshot::Receiver<InflightOutcome>) {
        let (tx, rx) = oneshot::channel();
        let inflight = Arc::new(Self {
            id,
            namespace: namespace.to_string(),
            kind,
            start_time: Instant::now(),
            slot: Mutex::new(Some(tx)),
        });
        (inflight, rx)
    }

    /// The id being awaited.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The namespace the request was registered in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// What the caller is waiting for.
    #[must_use]
    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Milliseconds since registration.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Deliver an outcome to the waiter.
    ///
    /// Never blocks. Returns `false` when the outcome was dropped: the slot
    /// was already consumed by an earlier resolution, or the waiter has
    /// given up and released its receiver.
    pub fn resolve(&self, outcome: InflightOutcome) -> bool {
        let sender = self.slot.lock().take();
        match sender {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    debug!(
                        namespace = %self.namespace,
                        id = %self.id,
                        kind = %self.kind,
                        "Waiter gone, resolution dropped"
                    );
                    return false;
                }
                true
            }
            None => {
                debug!(
                    namespace = %self.namespace,
                    id = %self.id,
                    kind = %self.kind,
                    "Already resolved, duplicate resolution dropped"
                );
                false
            }
        }
    }
}
