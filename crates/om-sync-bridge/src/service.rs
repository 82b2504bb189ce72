//! Sync/Async Bridge service implementation.
//!
//! Ties the inflight registry, match rules, and resolvers together behind
//! the [`SyncAsyncApi`] entry points and the bus-facing event callback.

use crate::domain::config::BridgeConfig;
use crate::domain::error::BridgeError;
use crate::domain::matcher::{self, EventEntity, HydrationSource, MatchOutcome};
use crate::domain::registry::InflightRegistry;
use crate::domain::request::{
    InflightOutcome, InflightRequest, InflightResponse, RequestKind, ResponsePayload,
};
use crate::domain::stats::{BridgeStats, BridgeStatsSnapshot};
use crate::ports::inbound::{RequestContext, RequestSender, SyncAsyncApi};
use crate::ports::outbound::{DatabaseGateway, MessageDataReader};
use async_trait::async_trait;
use shared_bus::{EventDelivery, ListenerError, NamespaceListener, SystemEvents};
use shared_types::{Message, MessageInOut, Operation, StoreError, TokenPool, TokenTransfer};
use std::sync::{Arc, OnceLock};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The sync/async correlation bridge.
///
/// Construct with [`SyncAsyncBridge::new`], then wire the event bus with
/// [`SyncAsyncBridge::attach`] once both sides exist. The two-phase init
/// breaks the construction cycle between the bridge (which registers
/// listeners on the bus) and the bus (whose events resolve the bridge's
/// waiters).
pub struct SyncAsyncBridge<D, M> {
    core: Arc<BridgeCore<D, M>>,
}

impl<D, M> Clone for SyncAsyncBridge<D, M> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

/// Shared state: the registry, the outbound gateways, and the bus handle.
/// Registered on the bus as the namespace listener.
struct BridgeCore<D, M> {
    config: BridgeConfig,
    database: Arc<D>,
    data: Arc<M>,
    registry: InflightRegistry,
    events: OnceLock<Arc<dyn SystemEvents>>,
    stats: Arc<BridgeStats>,
}

/// Removes the inflight entry when the wait ends, on every exit path:
/// resolution, timeout, send failure, caller cancellation, panic.
struct InflightGuard<'a> {
    registry: &'a InflightRegistry,
    namespace: &'a str,
    id: Uuid,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.registry.remove(self.namespace, &self.id);
    }
}

impl<D, M> SyncAsyncBridge<D, M>
where
    D: DatabaseGateway + 'static,
    M: MessageDataReader + 'static,
{
    /// Create a bridge over the given gateways. No listeners are attached
    /// until [`attach`](Self::attach) is called and a first request arrives.
    #[must_use]
    pub fn new(config: BridgeConfig, database: Arc<D>, data: Arc<M>) -> Self {
        Self {
            core: Arc::new(BridgeCore {
                config,
                database,
                data,
                registry: InflightRegistry::new(),
                events: OnceLock::new(),
                stats: Arc::new(BridgeStats::default()),
            }),
        }
    }

    /// Wire the event bus. Must be called before the first `wait_for_*`;
    /// a second call is ignored.
    pub fn attach(&self, events: Arc<dyn SystemEvents>) {
        if self.core.events.set(events).is_err() {
            warn!("Bridge already attached to an event bus, ignoring");
        }
    }

    /// Number of requests currently blocked in a namespace.
    #[must_use]
    pub fn pending_count(&self, namespace: &str) -> usize {
        self.core.registry.inflight_count(namespace)
    }

    /// Lifetime counters.
    #[must_use]
    pub fn stats(&self) -> BridgeStatsSnapshot {
        self.core.stats.snapshot()
    }

    /// Register, run the send action, and block until resolution, the
    /// caller's deadline, or the caller's cancel signal. The registration
    /// is visible to the matcher strictly before the send action runs.
    async fn send_and_wait(
        &self,
        mut ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        kind: RequestKind,
        send: RequestSender,
    ) -> Result<InflightResponse, BridgeError> {
        let core = &self.core;
        let listener: Arc<dyn NamespaceListener> = self.core.clone();

        let (inflight, receiver) = core.registry.add(namespace, id, kind, || {
            let events = core.events.get().ok_or_else(|| BridgeError::ListenerAttach {
                namespace: namespace.to_string(),
                reason: "bridge is not attached to an event bus".to_string(),
            })?;
            events
                .add_namespace_listener(namespace, listener)
                .map_err(|e| BridgeError::ListenerAttach {
                    namespace: namespace.to_string(),
                    reason: e.to_string(),
                })
        })?;

        core.stats.record_started();
        info!(namespace = %namespace, id = %id, kind = %kind, "Inflight request registered");

        let _guard = InflightGuard {
            registry: &core.registry,
            namespace,
            id,
        };

        send.await?;

        let deadline = ctx.effective_deadline(core.config.request_timeout);
        tokio::select! {
            _ = sleep(deadline) => {
                let elapsed_ms = inflight.elapsed_ms();
                core.stats.record_timed_out();
                info!(
                    namespace = %namespace,
                    id = %id,
                    elapsed_ms,
                    "Inflight request timed out"
                );
                Err(BridgeError::RequestTimeout { id, elapsed_ms })
            }
            _ = ctx.cancelled() => {
                let elapsed_ms = inflight.elapsed_ms();
                core.stats.record_cancelled();
                info!(
                    namespace = %namespace,
                    id = %id,
                    elapsed_ms,
                    "Inflight request cancelled by caller"
                );
                Err(BridgeError::RequestTimeout { id, elapsed_ms })
            }
            received = receiver => match received {
                Err(_closed) => Err(BridgeError::Internal(
                    "response slot closed without a resolution".to_string(),
                )),
                Ok(outcome) => {
                    match &outcome {
                        Ok(response) => {
                            core.stats.record_resolved();
                            info!(
                                namespace = %namespace,
                                id = %id,
                                reply = %response.id,
                                elapsed_ms = inflight.elapsed_ms(),
                                "Inflight request resolved"
                            );
                        }
                        Err(e) => {
                            core.stats.record_rejected();
                            info!(
                                namespace = %namespace,
                                id = %id,
                                elapsed_ms = inflight.elapsed_ms(),
                                error = %e,
                                "Inflight request resolved with error"
                            );
                        }
                    }
                    outcome
                }
            }
        }
    }
}

#[async_trait]
impl<D, M> SyncAsyncApi for SyncAsyncBridge<D, M>
where
    D: DatabaseGateway + 'static,
    M: MessageDataReader + 'static,
{
    async fn wait_for_message(
        &self,
        ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        send: RequestSender,
    ) -> Result<Message, BridgeError> {
        let response = self
            .send_and_wait(ctx, namespace, id, RequestKind::MessageConfirm, send)
            .await?;
        match response.payload {
            ResponsePayload::Message(msg) => Ok(msg),
            other => Err(mismatch(RequestKind::MessageConfirm, &other)),
        }
    }

    async fn wait_for_reply(
        &self,
        ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        send: RequestSender,
    ) -> Result<MessageInOut, BridgeError> {
        let response = self
            .send_and_wait(ctx, namespace, id, RequestKind::MessageReply, send)
            .await?;
        match response.payload {
            ResponsePayload::Reply(reply) => Ok(reply),
            other => Err(mismatch(RequestKind::MessageReply, &other)),
        }
    }

    async fn wait_for_token_pool(
        &self,
        ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        send: RequestSender,
    ) -> Result<TokenPool, BridgeError> {
        let response = self
            .send_and_wait(ctx, namespace, id, RequestKind::TokenPoolConfirm, send)
            .await?;
        match response.payload {
            ResponsePayload::TokenPool(pool) => Ok(pool),
            other => Err(mismatch(RequestKind::TokenPoolConfirm, &other)),
        }
    }

    async fn wait_for_token_transfer(
        &self,
        ctx: RequestContext,
        namespace: &str,
        id: Uuid,
        send: RequestSender,
    ) -> Result<TokenTransfer, BridgeError> {
        let response = self
            .send_and_wait(ctx, namespace, id, RequestKind::TokenTransferConfirm, send)
            .await?;
        match response.payload {
            ResponsePayload::TokenTransfer(transfer) => Ok(transfer),
            other => Err(mismatch(RequestKind::TokenTransferConfirm, &other)),
        }
    }
}

fn mismatch(expected: RequestKind, got: &ResponsePayload) -> BridgeError {
    BridgeError::Internal(format!(
        "expected {} payload, got {}",
        expected,
        got.kind()
    ))
}

impl<D, M> BridgeCore<D, M>
where
    D: DatabaseGateway + 'static,
    M: MessageDataReader + 'static,
{
    async fn message_from_event(
        &self,
        event: &EventDelivery,
    ) -> Result<Option<Message>, StoreError> {
        let msg = self.database.get_message_by_id(&event.reference).await?;
        if msg.is_none() {
            // Events can race ahead of store commit visibility; the waiter
            // falls back to its timeout.
            error!(
                reference = %event.reference,
                event_type = ?event.event_type,
                event_id = %event.id,
                "Unable to resolve message for event"
            );
        }
        Ok(msg)
    }

    async fn pool_from_event(
        &self,
        event: &EventDelivery,
    ) -> Result<Option<TokenPool>, StoreError> {
        let pool = self.database.get_token_pool_by_id(&event.reference).await?;
        if pool.is_none() {
            error!(
                reference = %event.reference,
                event_type = ?event.event_type,
                event_id = %event.id,
                "Unable to resolve token pool for event"
            );
        }
        Ok(pool)
    }

    async fn transfer_from_event(
        &self,
        event: &EventDelivery,
    ) -> Result<Option<TokenTransfer>, StoreError> {
        let transfer = self.database.get_token_transfer(&event.reference).await?;
        if transfer.is_none() {
            error!(
                reference = %event.reference,
                event_type = ?event.event_type,
                event_id = %event.id,
                "Unable to resolve token transfer for event"
            );
        }
        Ok(transfer)
    }

    async fn operation_from_event(
        &self,
        event: &EventDelivery,
    ) -> Result<Option<Operation>, StoreError> {
        let op = self.database.get_operation_by_id(&event.reference).await?;
        if op.is_none() {
            error!(
                reference = %event.reference,
                event_type = ?event.event_type,
                event_id = %event.id,
                "Unable to resolve operation for event"
            );
        }
        Ok(op)
    }

    /// Probe the registry for every rule hit and spawn a resolver per
    /// match. Each resolver runs on its own task so a slow data read never
    /// blocks event delivery; the registry lock is released before any
    /// resolution work begins.
    fn dispatch_matches(&self, event: &EventDelivery, entity: &EventEntity<'_>) {
        for probe in matcher::probes_for(event.event_type, entity) {
            let Some(inflight) = self
                .registry
                .get(&event.namespace, probe.kind, &probe.key)
            else {
                continue;
            };
            self.spawn_resolver(inflight, probe.outcome, entity);
        }
    }

    fn spawn_resolver(
        &self,
        inflight: Arc<InflightRequest>,
        outcome: MatchOutcome,
        entity: &EventEntity<'_>,
    ) {
        let stats = Arc::clone(&self.stats);
        match (outcome, entity) {
            (MatchOutcome::DeliverMessage, EventEntity::Message(msg)) => {
                let msg = (*msg).clone();
                tokio::spawn(async move {
                    resolve_confirmed(&stats, &inflight, msg);
                });
            }
            (MatchOutcome::DeliverReply, EventEntity::Message(msg)) => {
                let msg = (*msg).clone();
                let data = Arc::clone(&self.data);
                tokio::spawn(async move {
                    resolve_reply(data, &stats, &inflight, msg).await;
                });
            }
            (MatchOutcome::RejectMessage, EventEntity::Message(msg)) => {
                let message_id = msg.header.id;
                tokio::spawn(async move {
                    resolve_rejected(&stats, &inflight, message_id);
                });
            }
            (MatchOutcome::DeliverPool, EventEntity::Pool(pool)) => {
                let pool = (*pool).clone();
                tokio::spawn(async move {
                    resolve_pool_confirmed(&stats, &inflight, pool);
                });
            }
            (MatchOutcome::RejectPool, EventEntity::Pool(pool)) => {
                let pool_id = pool.id;
                tokio::spawn(async move {
                    resolve_pool_rejected(&stats, &inflight, pool_id);
                });
            }
            (MatchOutcome::DeliverTransfer, EventEntity::Transfer(transfer)) => {
                let transfer = (*transfer).clone();
                tokio::spawn(async move {
                    resolve_transfer_confirmed(&stats, &inflight, transfer);
                });
            }
            (MatchOutcome::FailTransfer, EventEntity::Transfer(transfer)) => {
                let transfer_id = transfer.local_id;
                tokio::spawn(async move {
                    resolve_transfer_failed(&stats, &inflight, transfer_id);
                });
            }
            // probes_for never pairs an outcome with the wrong entity
            _ => debug!(?outcome, "Unmatched resolver dispatch ignored"),
        }
    }
}

#[async_trait]
impl<D, M> NamespaceListener for BridgeCore<D, M>
where
    D: DatabaseGateway + 'static,
    M: MessageDataReader + 'static,
{
    async fn on_event(&self, event: EventDelivery) -> Result<(), ListenerError> {
        // No inflights in this namespace means no possible match; skip the
        // store reads entirely.
        if self.registry.namespace_is_idle(&event.namespace) {
            return Ok(());
        }

        let Some(source) = matcher::hydration_source(event.event_type) else {
            return Ok(());
        };

        match source {
            HydrationSource::Message => {
                let Some(msg) = self.message_from_event(&event).await.map_err(fatal)? else {
                    return Ok(());
                };
                self.dispatch_matches(&event, &EventEntity::Message(&msg));
            }
            HydrationSource::Pool => {
                let Some(pool) = self.pool_from_event(&event).await.map_err(fatal)? else {
                    return Ok(());
                };
                self.dispatch_matches(&event, &EventEntity::Pool(&pool));
            }
            HydrationSource::Transfer => {
                let Some(transfer) = self.transfer_from_event(&event).await.map_err(fatal)?
                else {
                    return Ok(());
                };
                self.dispatch_matches(&event, &EventEntity::Transfer(&transfer));
            }
            HydrationSource::Operation => {
                let Some(op) = self.operation_from_event(&event).await.map_err(fatal)? else {
                    return Ok(());
                };
                let transfer = match op.token_transfer_inputs() {
                    Ok(transfer) => transfer,
                    Err(e) => {
                        warn!(
                            operation = %op.id,
                            error = %e,
                            "Failed to decode token transfer inputs for failed operation"
                        );
                        return Ok(());
                    }
                };
                self.dispatch_matches(&event, &EventEntity::Transfer(&transfer));
            }
        }
        Ok(())
    }
}

/// Store failures are the one thing the callback cannot recover from.
fn fatal(e: StoreError) -> ListenerError {
    ListenerError::Fatal(e.to_string())
}

// Resolvers. Each runs on its own task; delivery through the slot is
// at-most-once and removal stays with the waiter that registered.

fn deliver(stats: &BridgeStats, inflight: &InflightRequest, outcome: InflightOutcome) {
    if !inflight.resolve(outcome) {
        stats.record_dropped();
    }
}

fn resolve_confirmed(stats: &BridgeStats, inflight: &InflightRequest, msg: Message) {
    debug!(
        request = %inflight.id(),
        message = %msg.header.id,
        "Resolving message confirmation"
    );
    let id = msg.header.id;
    deliver(
        stats,
        inflight,
        Ok(InflightResponse {
            id,
            payload: ResponsePayload::Message(msg),
        }),
    );
}

async fn resolve_reply<M: MessageDataReader>(
    data: Arc<M>,
    stats: &BridgeStats,
    inflight: &InflightRequest,
    msg: Message,
) {
    debug!(
        request = %inflight.id(),
        message = %msg.header.id,
        "Resolving reply request"
    );
    let rows = match data.get_message_data(&msg).await {
        Ok(rows) => rows,
        Err(e) => {
            // A partial reply is worse than a timeout.
            error!(
                request = %inflight.id(),
                message = %msg.header.id,
                error = %e,
                "Failed to read reply data, dropping resolution"
            );
            stats.record_dropped();
            return;
        }
    };
    let id = msg.header.id;
    deliver(
        stats,
        inflight,
        Ok(InflightResponse {
            id,
            payload: ResponsePayload::Reply(MessageInOut::with_inline_data(msg, rows)),
        }),
    );
}

fn resolve_rejected(stats: &BridgeStats, inflight: &InflightRequest, message_id: Uuid) {
    let err = BridgeError::MessageRejected(message_id);
    error!(request = %inflight.id(), error = %err, "Resolving message confirmation with error");
    deliver(stats, inflight, Err(err));
}

fn resolve_pool_confirmed(stats: &BridgeStats, inflight: &InflightRequest, pool: TokenPool) {
    debug!(
        request = %inflight.id(),
        pool = %pool.id,
        "Resolving token pool confirmation"
    );
    let id = pool.id;
    deliver(
        stats,
        inflight,
        Ok(InflightResponse {
            id,
            payload: ResponsePayload::TokenPool(pool),
        }),
    );
}

fn resolve_pool_rejected(stats: &BridgeStats, inflight: &InflightRequest, pool_id: Uuid) {
    let err = BridgeError::TokenPoolRejected(pool_id);
    error!(request = %inflight.id(), error = %err, "Resolving token pool confirmation with error");
    deliver(stats, inflight, Err(err));
}

fn resolve_transfer_confirmed(
    stats: &BridgeStats,
    inflight: &InflightRequest,
    transfer: TokenTransfer,
) {
    debug!(
        request = %inflight.id(),
        transfer = %transfer.local_id,
        "Resolving token transfer confirmation"
    );
    let id = transfer.local_id;
    deliver(
        stats,
        inflight,
        Ok(InflightResponse {
            id,
            payload: ResponsePayload::TokenTransfer(transfer),
        }),
    );
}

fn resolve_transfer_failed(stats: &BridgeStats, inflight: &InflightRequest, transfer_id: Uuid) {
    let err = BridgeError::TokenTransferFailed(transfer_id);
    warn!(request = %inflight.id(), error = %err, "Resolving token transfer confirmation with error");
    deliver(stats, inflight, Err(err));
}
