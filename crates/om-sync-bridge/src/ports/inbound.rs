//! Inbound port: the blocking API exposed to action handlers.

use crate::domain::error::BridgeError;
use async_trait::async_trait;
use shared_types::{Message, MessageInOut, TokenPool, TokenTransfer};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// The caller-supplied action whose confirmation is being awaited.
///
/// The future is lazy: the bridge awaits it only after the inflight request
/// is registered, so an event raised synchronously by the action still
/// finds the registration. If the action fails, its error is returned to
/// the caller unchanged and the registration is removed.
pub type RequestSender = Pin<Box<dyn Future<Output = Result<(), BridgeError>> + Send>>;

/// Box a send action for the `wait_for_*` entry points.
pub fn send_action<F>(fut: F) -> RequestSender
where
    F: Future<Output = Result<(), BridgeError>> + Send + 'static,
{
    Box::pin(fut)
}

/// Per-call deadline and cancellation, carried by every `wait_for_*` call.
///
/// A context may override the bridge's configured request timeout with its
/// own deadline, and may carry a cancel signal for callers that abandon a
/// wait early (a closed HTTP connection, a shutting-down handler). Either
/// signal resolves the wait promptly with a
/// [`BridgeError::RequestTimeout`]; cleanup runs the same way on every
/// path.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Duration>,
    cancel: Option<watch::Receiver<bool>>,
}

impl RequestContext {
    /// A context with no deadline or cancel signal of its own; the
    /// bridge's configured request timeout applies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose wait gives up after `deadline`, overriding the
    /// bridge's configured request timeout.
    #[must_use]
    pub fn with_deadline(deadline: Duration) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: None,
        }
    }

    /// A context the caller can cancel through the returned handle.
    #[must_use]
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (signal, cancel) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancel: Some(cancel),
            },
            CancelHandle { signal },
        )
    }

    /// Set a deadline on this context.
    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The deadline this call runs under.
    pub(crate) fn effective_deadline(&self, default: Duration) -> Duration {
        self.deadline.unwrap_or(default)
    }

    /// Resolves when the caller cancels. Never resolves for contexts
    /// without a cancel signal, or when the handle is dropped without
    /// cancelling.
    pub(crate) async fn cancelled(&mut self) {
        if let Some(cancel) = &mut self.cancel {
            if cancel.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

/// Cancels the wait tied to a [`RequestContext`].
#[derive(Debug)]
pub struct CancelHandle {
    signal: watch::Sender<bool>,
}

impl CancelHandle {
    /// Abort the associated wait; it returns a timeout error promptly.
    pub fn cancel(&self) {
        let _ = self.signal.send(true);
    }
}

/// The bridge API: run an action and block until its asynchronous,
/// network-confirmed outcome arrives, or until the caller's deadline or
/// cancellation.
#[async_trait]
pub trait SyncAsyncApi: Send + Sync {
    /// Wait for confirmation of the message with the supplied id.
    async fn wait_for_message(
        &self,
        ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        send: RequestSender,
    ) -> Result<Message, BridgeError>;

    /// Wait for a reply correlated to the outbound message with the
    /// supplied id. The returned reply carries its data inlined.
    async fn wait_for_reply(
        &self,
        ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        send: RequestSender,
    ) -> Result<MessageInOut, BridgeError>;

    /// Wait for confirmation of the token pool with the supplied id.
    async fn wait_for_token_pool(
        &self,
        ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        send: RequestSender,
    ) -> Result<TokenPool, BridgeError>;

    /// Wait for confirmation of the token transfer with the supplied
    /// local id.
    async fn wait_for_token_transfer(
        &self,
        ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        send: RequestSender,
    ) -> Result<TokenTransfer, BridgeError>;
}
