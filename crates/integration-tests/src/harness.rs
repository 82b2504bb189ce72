//! Shared test harness: an in-memory database implementing the bridge's
//! outbound ports, plus entity builders.

use async_trait::async_trait;
use om_sync_bridge::{DatabaseGateway, MessageDataReader};
use parking_lot::RwLock;
use shared_types::{
    Data, Message, MessageHeader, Operation, OperationStatus, OperationType, StoreError,
    TokenPool, TokenTransfer, U256,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// In-memory stand-in for the durable stores.
///
/// Implements both the entity gateway and the data reader so one instance
/// backs the whole bridge. Every store read increments `read_count`, which
/// is what the no-inflight fast-path assertions observe.
#[derive(Default)]
pub struct InMemoryDatabase {
    messages: RwLock<HashMap<Uuid, Message>>,
    data: RwLock<HashMap<Uuid, Data>>,
    pools: RwLock<HashMap<Uuid, TokenPool>>,
    transfers: RwLock<HashMap<Uuid, TokenTransfer>>,
    operations: RwLock<HashMap<Uuid, Operation>>,
    reads: AtomicU64,
}

impl InMemoryDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_message(&self, message: Message) {
        self.messages.write().insert(message.header.id, message);
    }

    pub fn insert_data(&self, data: Data) {
        self.data.write().insert(data.id, data);
    }

    pub fn insert_pool(&self, pool: TokenPool) {
        self.pools.write().insert(pool.id, pool);
    }

    pub fn insert_transfer(&self, transfer: TokenTransfer) {
        self.transfers.write().insert(transfer.local_id, transfer);
    }

    pub fn insert_operation(&self, operation: Operation) {
        self.operations.write().insert(operation.id, operation);
    }

    /// Total store reads performed so far.
    #[must_use]
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn count_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl DatabaseGateway for InMemoryDatabase {
    async fn get_message_by_id(&self, id: &Uuid) -> Result<Option<Message>, StoreError> {
        self.count_read();
        Ok(self.messages.read().get(id).cloned())
    }

    async fn get_token_pool_by_id(&self, id: &Uuid) -> Result<Option<TokenPool>, StoreError> {
        self.count_read();
        Ok(self.pools.read().get(id).cloned())
    }

    async fn get_token_transfer(&self, id: &Uuid) -> Result<Option<TokenTransfer>, StoreError> {
        self.count_read();
        Ok(self.transfers.read().get(id).cloned())
    }

    async fn get_operation_by_id(&self, id: &Uuid) -> Result<Option<Operation>, StoreError> {
        self.count_read();
        Ok(self.operations.read().get(id).cloned())
    }
}

#[async_trait]
impl MessageDataReader for InMemoryDatabase {
    async fn get_message_data(&self, message: &Message) -> Result<Vec<Data>, StoreError> {
        self.count_read();
        let data = self.data.read();
        Ok(message
            .data
            .iter()
            .filter_map(|data_ref| data.get(&data_ref.id).cloned())
            .collect())
    }
}

// Entity builders.

/// A stored message with the given id and optional reply correlation.
#[must_use]
pub fn message_with(namespace: &str, id: Uuid, correlation_id: Option<Uuid>) -> Message {
    Message {
        header: MessageHeader {
            id,
            correlation_id,
            namespace: namespace.to_string(),
            author: "did:orgmesh:org/acme".to_string(),
            topics: vec!["default".to_string()],
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A data item with the given JSON value.
#[must_use]
pub fn data_item(namespace: &str, value: serde_json::Value) -> Data {
    Data {
        id: Uuid::now_v7(),
        namespace: namespace.to_string(),
        hash: [0u8; 32],
        value,
    }
}

/// A token pool with the given id.
#[must_use]
pub fn pool_with(namespace: &str, id: Uuid) -> TokenPool {
    TokenPool {
        id,
        namespace: namespace.to_string(),
        name: "pool1".to_string(),
        connector: "erc20".to_string(),
        ..Default::default()
    }
}

/// A token transfer with the given local id.
#[must_use]
pub fn transfer_with(local_id: Uuid) -> TokenTransfer {
    TokenTransfer {
        local_id,
        pool: Uuid::now_v7(),
        key: "0xsigner".to_string(),
        to: Some("0xrecipient".to_string()),
        amount: U256::from(10u64),
        ..Default::default()
    }
}

/// A failed operation whose inputs name the given transfer.
#[must_use]
pub fn failed_transfer_op(namespace: &str, transfer: &TokenTransfer) -> Operation {
    Operation {
        id: Uuid::now_v7(),
        namespace: namespace.to_string(),
        tx: Uuid::now_v7(),
        op_type: OperationType::TokenTransfer,
        status: OperationStatus::Failed,
        input: serde_json::to_value(transfer).unwrap_or_default(),
        error: Some("connector rejected the transfer".to_string()),
        created: 0,
    }
}
