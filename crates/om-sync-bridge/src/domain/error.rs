//! Bridge error types.

use shared_types::StoreError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced to bridge callers.
///
/// Rejection and failure variants are delivered through the response slot;
/// the rest are returned synchronously from the `wait_for_*` entry points.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The caller's deadline elapsed before any resolution arrived.
    #[error("request '{id}' timed out after {elapsed_ms}ms")]
    RequestTimeout {
        /// The inflight id that was being awaited.
        id: Uuid,
        /// How long the caller was blocked.
        elapsed_ms: u64,
    },

    /// The awaited message was rejected by the network.
    #[error("message '{0}' was rejected")]
    MessageRejected(Uuid),

    /// The awaited token pool was rejected by its connector.
    #[error("token pool '{0}' was rejected")]
    TokenPoolRejected(Uuid),

    /// The operation backing the awaited token transfer failed.
    #[error("token transfer '{0}' failed")]
    TokenTransferFailed(Uuid),

    /// A request with this id is already blocked in this namespace.
    #[error("request '{id}' is already inflight in namespace '{namespace}'")]
    DuplicateInflight {
        /// Namespace of the colliding registration.
        namespace: String,
        /// The colliding id.
        id: Uuid,
    },

    /// The event listener for a namespace could not be attached.
    #[error("failed to attach event listener for namespace '{namespace}': {reason}")]
    ListenerAttach {
        /// Namespace the attach was for.
        namespace: String,
        /// Why the bus refused.
        reason: String,
    },

    /// A store read failed.
    #[error(transparent)]
    Database(#[from] StoreError),

    /// An invariant the bridge relies on did not hold.
    #[error("internal error: {0}")]
    Internal(String),
}
