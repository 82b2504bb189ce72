//! End-to-end bridge scenarios over the real in-memory event bus.

use crate::harness::{self, InMemoryDatabase};
use om_sync_bridge::{
    send_action, BridgeConfig, BridgeError, RequestContext, SyncAsyncApi, SyncAsyncBridge,
};
use shared_bus::{EventDelivery, EventType, InMemoryEventBus};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type Bridge = SyncAsyncBridge<InMemoryDatabase, InMemoryDatabase>;

fn setup(timeout_ms: u64) -> (Bridge, Arc<InMemoryEventBus>, Arc<InMemoryDatabase>) {
    let database = Arc::new(InMemoryDatabase::new());
    let bridge = SyncAsyncBridge::new(
        BridgeConfig {
            request_timeout: Duration::from_millis(timeout_ms),
        },
        Arc::clone(&database),
        Arc::clone(&database),
    );
    let bus = Arc::new(InMemoryEventBus::new());
    bridge.attach(bus.clone());
    (bridge, bus, database)
}

/// Spawn a waiter whose send action reports back once registration is done,
/// so the test can fire events without racing the registration.
macro_rules! spawn_waiter {
    ($bridge:expr, $method:ident, $ns:expr, $id:expr) => {{
        let bridge = $bridge.clone();
        let id = $id;
        let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            bridge
                .$method(
                    RequestContext::new(),
                    $ns,
                    id,
                    send_action(async move {
                        let _ = ready_tx.send(());
                        Ok(())
                    }),
                )
                .await
        });
        ready_rx.await.unwrap();
        handle
    }};
}

#[tokio::test]
async fn test_message_confirmation_end_to_end() {
    let (bridge, bus, database) = setup(1_000);
    let msg_id = Uuid::now_v7();
    database.insert_message(harness::message_with("ns1", msg_id, None));

    let waiter = spawn_waiter!(bridge, wait_for_message, "ns1", msg_id);

    bus.dispatch(EventDelivery::new(
        EventType::MessageConfirmed,
        "ns1",
        msg_id,
    ))
    .await
    .unwrap();

    let msg = waiter.await.unwrap().unwrap();
    assert_eq!(msg.header.id, msg_id);
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_reply_correlation_inlines_data() {
    let (bridge, bus, database) = setup(1_000);
    let outbound_id = Uuid::now_v7();
    let reply_id = Uuid::now_v7();

    let row = harness::data_item("ns1", serde_json::json!({"status": "accepted"}));
    let mut reply = harness::message_with("ns1", reply_id, Some(outbound_id));
    reply.data.push(row.as_data_ref());
    database.insert_data(row);
    database.insert_message(reply);

    let waiter = spawn_waiter!(bridge, wait_for_reply, "ns1", outbound_id);

    bus.dispatch(EventDelivery::new(
        EventType::MessageConfirmed,
        "ns1",
        reply_id,
    ))
    .await
    .unwrap();

    let reply = waiter.await.unwrap().unwrap();
    // The resolution id is the reply message's id, not the outbound id.
    assert_eq!(reply.message.header.id, reply_id);
    assert_eq!(reply.message.header.correlation_id, Some(outbound_id));
    assert_eq!(reply.data.len(), 1);
    assert_eq!(reply.data[0].value, serde_json::json!({"status": "accepted"}));
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_pool_rejection_surfaces_typed_error() {
    let (bridge, bus, database) = setup(1_000);
    let pool_id = Uuid::now_v7();
    database.insert_pool(harness::pool_with("ns1", pool_id));

    let waiter = spawn_waiter!(bridge, wait_for_token_pool, "ns1", pool_id);

    bus.dispatch(EventDelivery::new(EventType::PoolRejected, "ns1", pool_id))
        .await
        .unwrap();

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(BridgeError::TokenPoolRejected(id)) if id == pool_id));
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_timeout_leaves_no_entry() {
    // The call's own 50ms deadline fires, not the bridge-wide timeout.
    let (bridge, _bus, _database) = setup(30_000);
    let transfer_id = Uuid::now_v7();

    let result = bridge
        .wait_for_token_transfer(
            RequestContext::with_deadline(Duration::from_millis(50)),
            "ns1",
            transfer_id,
            send_action(async { Ok(()) }),
        )
        .await;

    match result {
        Err(BridgeError::RequestTimeout { id, elapsed_ms }) => {
            assert_eq!(id, transfer_id);
            assert!(elapsed_ms >= 40);
            assert!(elapsed_ms < 30_000);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_concurrent_callers_carry_independent_deadlines() {
    let (bridge, bus, database) = setup(30_000);
    let short_id = Uuid::now_v7();
    let long_id = Uuid::now_v7();
    database.insert_message(harness::message_with("ns1", long_id, None));

    let short_bridge = bridge.clone();
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();
    let short_waiter = tokio::spawn(async move {
        short_bridge
            .wait_for_message(
                RequestContext::with_deadline(Duration::from_millis(50)),
                "ns1",
                short_id,
                send_action(async move {
                    let _ = ready_tx.send(());
                    Ok(())
                }),
            )
            .await
    });
    ready_rx.await.unwrap();
    let long_waiter = spawn_waiter!(bridge, wait_for_message, "ns1", long_id);

    // The short caller's deadline fires on its own; the other caller is
    // untouched and still resolvable.
    let result = short_waiter.await.unwrap();
    assert!(matches!(result, Err(BridgeError::RequestTimeout { id, .. }) if id == short_id));
    assert_eq!(bridge.pending_count("ns1"), 1);

    bus.dispatch(EventDelivery::new(
        EventType::MessageConfirmed,
        "ns1",
        long_id,
    ))
    .await
    .unwrap();
    let msg = long_waiter.await.unwrap().unwrap();
    assert_eq!(msg.header.id, long_id);
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_cancelled_caller_cleans_up() {
    let (bridge, bus, database) = setup(30_000);
    let msg_id = Uuid::now_v7();
    database.insert_message(harness::message_with("ns1", msg_id, None));

    let (ctx, cancel) = RequestContext::with_cancel();
    let waiter_bridge = bridge.clone();
    let (ready_tx, ready_rx) = tokio::sync::oneshot::channel::<()>();
    let waiter = tokio::spawn(async move {
        waiter_bridge
            .wait_for_message(
                ctx,
                "ns1",
                msg_id,
                send_action(async move {
                    let _ = ready_tx.send(());
                    Ok(())
                }),
            )
            .await
    });
    ready_rx.await.unwrap();

    cancel.cancel();
    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(BridgeError::RequestTimeout { id, .. }) if id == msg_id));
    assert_eq!(bridge.pending_count("ns1"), 0);

    // A resolution arriving after cancellation finds nothing and is dropped.
    bus.dispatch(EventDelivery::new(
        EventType::MessageConfirmed,
        "ns1",
        msg_id,
    ))
    .await
    .unwrap();
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_send_failure_returns_immediately() {
    let (bridge, _bus, _database) = setup(1_000);
    let msg_id = Uuid::now_v7();

    let result = bridge
        .wait_for_message(
            RequestContext::new(),
            "ns1",
            msg_id,
            send_action(async { Err(BridgeError::Internal("boom".to_string())) }),
        )
        .await;

    assert!(matches!(result, Err(BridgeError::Internal(msg)) if msg == "boom"));
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_racing_resolutions_resolve_exactly_once() {
    let (bridge, bus, database) = setup(1_000);
    let msg_id = Uuid::now_v7();
    database.insert_message(harness::message_with("ns1", msg_id, None));

    let waiter = spawn_waiter!(bridge, wait_for_message, "ns1", msg_id);

    // Confirmation and rejection race; the waiter sees exactly one of them.
    let confirm_bus = bus.clone();
    let reject_bus = bus.clone();
    let confirm = tokio::spawn(async move {
        confirm_bus
            .dispatch(EventDelivery::new(
                EventType::MessageConfirmed,
                "ns1",
                msg_id,
            ))
            .await
    });
    let reject = tokio::spawn(async move {
        reject_bus
            .dispatch(EventDelivery::new(
                EventType::MessageRejected,
                "ns1",
                msg_id,
            ))
            .await
    });
    confirm.await.unwrap().unwrap();
    reject.await.unwrap().unwrap();

    match waiter.await.unwrap() {
        Ok(msg) => assert_eq!(msg.header.id, msg_id),
        Err(BridgeError::MessageRejected(id)) => assert_eq!(id, msg_id),
        other => panic!("expected confirmation or rejection, got {other:?}"),
    }
    assert_eq!(bridge.pending_count("ns1"), 0);

    let stats = bridge.stats();
    assert_eq!(stats.resolved + stats.rejected, 1);
}

#[tokio::test]
async fn test_transfer_confirmation_end_to_end() {
    let (bridge, bus, database) = setup(1_000);
    let transfer_id = Uuid::now_v7();
    database.insert_transfer(harness::transfer_with(transfer_id));

    let waiter = spawn_waiter!(bridge, wait_for_token_transfer, "ns1", transfer_id);

    bus.dispatch(EventDelivery::new(
        EventType::TransferConfirmed,
        "ns1",
        transfer_id,
    ))
    .await
    .unwrap();

    let transfer = waiter.await.unwrap().unwrap();
    assert_eq!(transfer.local_id, transfer_id);
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_transfer_op_failure_resolves_by_decoded_inputs() {
    let (bridge, bus, database) = setup(1_000);
    let transfer_id = Uuid::now_v7();
    let transfer = harness::transfer_with(transfer_id);
    let operation = harness::failed_transfer_op("ns1", &transfer);
    let op_id = operation.id;
    database.insert_operation(operation);

    let waiter = spawn_waiter!(bridge, wait_for_token_transfer, "ns1", transfer_id);

    // The event references the operation; the transfer's local id comes
    // from the operation's stored inputs.
    bus.dispatch(EventDelivery::new(
        EventType::TransferOpFailed,
        "ns1",
        op_id,
    ))
    .await
    .unwrap();

    let result = waiter.await.unwrap();
    assert!(matches!(result, Err(BridgeError::TokenTransferFailed(id)) if id == transfer_id));
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_one_event_resolves_confirm_and_reply_waiters() {
    let (bridge, bus, database) = setup(1_000);
    let confirm_id = Uuid::now_v7();
    let reply_to_id = Uuid::now_v7();
    // One message that is both a tracked send (id) and a reply (correlation).
    database.insert_message(harness::message_with("ns1", confirm_id, Some(reply_to_id)));

    let confirm_waiter = spawn_waiter!(bridge, wait_for_message, "ns1", confirm_id);
    let reply_waiter = spawn_waiter!(bridge, wait_for_reply, "ns1", reply_to_id);
    assert_eq!(bridge.pending_count("ns1"), 2);

    bus.dispatch(EventDelivery::new(
        EventType::MessageConfirmed,
        "ns1",
        confirm_id,
    ))
    .await
    .unwrap();

    let confirmed = confirm_waiter.await.unwrap().unwrap();
    assert_eq!(confirmed.header.id, confirm_id);

    let reply = reply_waiter.await.unwrap().unwrap();
    assert_eq!(reply.message.header.id, confirm_id);

    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_event_raised_by_send_still_matches() {
    let (bridge, bus, database) = setup(1_000);
    let msg_id = Uuid::now_v7();
    database.insert_message(harness::message_with("ns1", msg_id, None));

    // The send action fires the confirmation synchronously, before the
    // waiter starts blocking; the registration is already visible.
    let send_bus = bus.clone();
    let msg = bridge
        .wait_for_message(
            RequestContext::new(),
            "ns1",
            msg_id,
            send_action(async move {
                send_bus
                    .dispatch(EventDelivery::new(
                        EventType::MessageConfirmed,
                        "ns1",
                        msg_id,
                    ))
                    .await
                    .map_err(|e| BridgeError::Internal(e.to_string()))
            }),
        )
        .await
        .unwrap();

    assert_eq!(msg.header.id, msg_id);
    assert_eq!(bridge.pending_count("ns1"), 0);
}

#[tokio::test]
async fn test_idle_namespace_performs_no_store_reads() {
    let (bridge, bus, database) = setup(50);

    // Attach the namespace listener by letting one request time out.
    let result = bridge
        .wait_for_message(
            RequestContext::new(),
            "ns1",
            Uuid::now_v7(),
            send_action(async { Ok(()) }),
        )
        .await;
    assert!(matches!(result, Err(BridgeError::RequestTimeout { .. })));
    assert_eq!(bus.listener_count("ns1"), 1);
    assert_eq!(database.read_count(), 0);

    // With nothing inflight, events cause no reads at all.
    for event_type in [
        EventType::MessageConfirmed,
        EventType::PoolRejected,
        EventType::TransferOpFailed,
    ] {
        bus.dispatch(EventDelivery::new(event_type, "ns1", Uuid::now_v7()))
            .await
            .unwrap();
    }
    assert_eq!(database.read_count(), 0);
}

#[tokio::test]
async fn test_ignored_event_types_touch_nothing() {
    let (bridge, bus, database) = setup(1_000);
    let msg_id = Uuid::now_v7();
    database.insert_message(harness::message_with("ns1", msg_id, None));

    let waiter = spawn_waiter!(bridge, wait_for_message, "ns1", msg_id);

    // Events the bridge does not track: no reads, waiter untouched.
    for event_type in [EventType::TransactionSubmitted, EventType::NamespaceConfirmed] {
        bus.dispatch(EventDelivery::new(event_type, "ns1", msg_id))
            .await
            .unwrap();
    }
    assert_eq!(database.read_count(), 0);
    assert_eq!(bridge.pending_count("ns1"), 1);

    bus.dispatch(EventDelivery::new(
        EventType::MessageConfirmed,
        "ns1",
        msg_id,
    ))
    .await
    .unwrap();
    waiter.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_namespaces_attach_independent_listeners() {
    let (bridge, bus, _database) = setup(50);

    for namespace in ["ns1", "ns1", "ns2"] {
        let result = bridge
            .wait_for_message(
                RequestContext::new(),
                namespace,
                Uuid::now_v7(),
                send_action(async { Ok(()) }),
            )
            .await;
        assert!(matches!(result, Err(BridgeError::RequestTimeout { .. })));
    }

    // One listener per namespace no matter how many requests came through.
    assert_eq!(bus.listener_count("ns1"), 1);
    assert_eq!(bus.listener_count("ns2"), 1);
}

#[tokio::test]
async fn test_event_in_other_namespace_does_not_resolve() {
    let (bridge, bus, database) = setup(1_000);
    let msg_id = Uuid::now_v7();
    database.insert_message(harness::message_with("ns2", msg_id, None));

    let waiter = spawn_waiter!(bridge, wait_for_message, "ns1", msg_id);

    // Same reference id, wrong namespace: nothing to resolve there.
    bus.dispatch(EventDelivery::new(
        EventType::MessageConfirmed,
        "ns2",
        msg_id,
    ))
    .await
    .unwrap();
    assert_eq!(bridge.pending_count("ns1"), 1);

    database.insert_message(harness::message_with("ns1", msg_id, None));
    bus.dispatch(EventDelivery::new(
        EventType::MessageConfirmed,
        "ns1",
        msg_id,
    ))
    .await
    .unwrap();
    waiter.await.unwrap().unwrap();
}
