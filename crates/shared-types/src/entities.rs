//! # Core Domain Entities
//!
//! Defines the entities brokered between member organizations.
//!
//! ## Clusters
//!
//! - **Messaging**: `MessageHeader`, `Message`, `MessageInOut`, `Data`, `DataRef`
//! - **Tokens**: `TokenPool`, `TokenTransfer`
//! - **Transactions**: `Operation`

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export U256 from primitive-types for use across all subsystems
pub use primitive_types::U256;

/// A 32-byte content hash.
pub type Hash = [u8; 32];

// =============================================================================
// CLUSTER A: MESSAGING
// =============================================================================

/// Header fields of a message, set by the sending node before any data
/// is attached.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageHeader {
    /// Unique message identifier, assigned on creation.
    pub id: Uuid,
    /// For replies, the id of the message being replied to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    /// Namespace this message belongs to.
    pub namespace: String,
    /// Identity of the authoring organization.
    pub author: String,
    /// Ordering contexts the message is pinned to.
    pub topics: Vec<String>,
    /// Free-form routing tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Unix timestamp (ms) the message was created.
    pub created: u64,
}

/// Lifecycle state of a message as tracked by the local node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    /// Assembled locally, data not yet resolved.
    #[default]
    Staged,
    /// Data resolved, ready to send.
    Ready,
    /// Handed to the transport.
    Sent,
    /// Seen on-chain, awaiting aggregation.
    Pending,
    /// Confirmed by the network.
    Confirmed,
    /// Rejected by the network.
    Rejected,
}

/// A message as stored and exchanged, with data attached by reference.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Message {
    /// The message header.
    pub header: MessageHeader,
    /// Current lifecycle state.
    pub state: MessageState,
    /// References to the data items carried by this message.
    pub data: Vec<DataRef>,
}

/// A reference to a data item: its id plus the hash the sender committed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DataRef {
    /// Id of the referenced data item.
    pub id: Uuid,
    /// Content hash the referencing message committed to.
    pub hash: Hash,
}

/// A stored data item.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Data {
    /// Unique data identifier.
    pub id: Uuid,
    /// Namespace this data belongs to.
    pub namespace: String,
    /// Content hash of `value`.
    pub hash: Hash,
    /// The JSON value itself.
    pub value: serde_json::Value,
}

impl Data {
    /// The reference form of this data item.
    #[must_use]
    pub fn as_data_ref(&self) -> DataRef {
        DataRef {
            id: self.id,
            hash: self.hash,
        }
    }
}

/// A message with its data rows inlined, as returned to API callers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageInOut {
    /// The message itself.
    pub message: Message,
    /// The resolved data values, in reference order.
    pub data: Vec<Data>,
}

impl MessageInOut {
    /// Wrap a message with its resolved data rows.
    #[must_use]
    pub fn with_inline_data(message: Message, data: Vec<Data>) -> Self {
        Self { message, data }
    }
}

// =============================================================================
// CLUSTER B: TOKENS
// =============================================================================

/// Whether a pool holds fungible or non-fungible tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Interchangeable units with a divisible balance.
    #[default]
    Fungible,
    /// Individually identified tokens.
    NonFungible,
}

/// Lifecycle state of a token pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TokenPoolState {
    /// Announced, not yet confirmed by the network.
    #[default]
    Pending,
    /// Confirmed by the network.
    Confirmed,
}

/// A set of tokens of one type, as defined by the token connector.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenPool {
    /// Unique pool identifier, assigned by this node.
    pub id: Uuid,
    /// Namespace this pool belongs to.
    pub namespace: String,
    /// Human-readable pool name, unique within the namespace.
    pub name: String,
    /// Fungible or non-fungible.
    pub token_type: TokenType,
    /// Name of the token connector managing this pool.
    pub connector: String,
    /// Identifier the connector assigned on-chain.
    pub protocol_id: String,
    /// Current lifecycle state.
    pub state: TokenPoolState,
}

/// The kind of balance change a token transfer represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    /// Tokens created into an account.
    Mint,
    /// Tokens destroyed from an account.
    Burn,
    /// Tokens moved between accounts.
    #[default]
    Transfer,
}

/// A token transfer (mint, burn, or transfer) tracked by this node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TokenTransfer {
    /// Mint, burn, or transfer.
    #[serde(rename = "type")]
    pub transfer_type: TransferType,
    /// Id assigned by this node before network confirmation.
    pub local_id: Uuid,
    /// The pool the tokens belong to.
    pub pool: Uuid,
    /// Signing key that submitted the transfer.
    pub key: String,
    /// Source account, absent for mints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination account, absent for burns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Amount in base units.
    pub amount: U256,
    /// Identifier the connector assigned once the transfer landed on-chain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_id: Option<String>,
    /// Message attached to the transfer, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Uuid>,
}

// =============================================================================
// CLUSTER C: TRANSACTIONS
// =============================================================================

/// The kind of external action an operation tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// A token transfer submitted to a token connector.
    #[default]
    TokenTransfer,
    /// A token approval submitted to a token connector.
    TokenApproval,
    /// A payload upload to shared storage.
    SharedStorageUpload,
    /// A private payload send over data exchange.
    DataExchangeSend,
}

/// Outcome state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Submitted, outcome unknown.
    #[default]
    Pending,
    /// The external action succeeded.
    Succeeded,
    /// The external action failed.
    Failed,
}

/// One unit of external work performed on behalf of a transaction.
///
/// The inputs the operation was submitted with are retained as JSON so a
/// failure event can be traced back to the entity it was acting on.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Operation {
    /// Unique operation identifier.
    pub id: Uuid,
    /// Namespace this operation belongs to.
    pub namespace: String,
    /// The transaction this operation belongs to.
    pub tx: Uuid,
    /// The kind of external action.
    #[serde(rename = "type")]
    pub op_type: OperationType,
    /// Current outcome state.
    pub status: OperationStatus,
    /// The inputs the operation was submitted with.
    pub input: serde_json::Value,
    /// Failure detail, set when `status` is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Unix timestamp (ms) the operation was created.
    pub created: u64,
}

impl Operation {
    /// Decode the token transfer this operation was submitted for.
    ///
    /// Valid only for `OperationType::TokenTransfer` operations; the stored
    /// input JSON is the serialized transfer.
    pub fn token_transfer_inputs(&self) -> Result<TokenTransfer, serde_json::Error> {
        serde_json::from_value(self.input.clone())
    }
}
