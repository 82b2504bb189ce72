//! Outbound ports: what the bridge needs from the rest of the node.

use async_trait::async_trait;
use shared_types::{Data, Message, Operation, StoreError, TokenPool, TokenTransfer};
use uuid::Uuid;

/// Read access to the entity stores the bridge hydrates events from.
///
/// A missing entity is `Ok(None)`; errors are infrastructure failures.
#[async_trait]
pub trait DatabaseGateway: Send + Sync {
    /// Fetch a message by id.
    async fn get_message_by_id(&self, id: &Uuid) -> Result<Option<Message>, StoreError>;

    /// Fetch a token pool by id.
    async fn get_token_pool_by_id(&self, id: &Uuid) -> Result<Option<TokenPool>, StoreError>;

    /// Fetch a token transfer by its local id.
    async fn get_token_transfer(&self, id: &Uuid) -> Result<Option<TokenTransfer>, StoreError>;

    /// Fetch an operation by id.
    async fn get_operation_by_id(&self, id: &Uuid) -> Result<Option<Operation>, StoreError>;
}

/// Resolves a message's data references to their stored values.
#[async_trait]
pub trait MessageDataReader: Send + Sync {
    /// Load the data rows referenced by `message`, in reference order.
    async fn get_message_data(&self, message: &Message) -> Result<Vec<Data>, StoreError>;
}
