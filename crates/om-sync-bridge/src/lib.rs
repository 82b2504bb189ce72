//! # Sync/Async Correlation Bridge
//!
//! Lets a blocked API caller wait synchronously for the network-confirmed
//! outcome of an action it triggered, where the outcome arrives later as an
//! event on the shared bus.
//!
//! ## Data Flow
//!
//! ```text
//! caller ──→ wait_for_*() ── register inflight ── run send action ──┐
//!                                                                   │ block
//!   [send action causes on-chain + network side effects]            │
//!                    │                                              │
//!                    ↓                                              │
//!              event bus ──→ on_event ──→ matcher ──→ resolver ─────┘
//!                                                    (oneshot slot)
//! ```
//!
//! ## Guarantees
//!
//! - The inflight entry is visible to the matcher before the send action
//!   runs, so an event raised synchronously by the action still matches.
//! - At most one resolution is ever delivered per inflight request; late
//!   or duplicate matches are dropped.
//! - Every call carries its own deadline and cancel signal through a
//!   [`RequestContext`]; both resolve the wait with a typed timeout error.
//! - Registration and removal are paired on every exit path: success,
//!   rejection, timeout, send failure, cancellation, panic.
//! - The event callback performs no store reads for namespaces with no
//!   inflight requests.

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::config::BridgeConfig;
pub use domain::error::BridgeError;
pub use domain::request::{InflightResponse, RequestKind, ResponsePayload};
pub use domain::stats::BridgeStatsSnapshot;
pub use ports::inbound::{send_action, CancelHandle, RequestContext, RequestSender, SyncAsyncApi};
pub use ports::outbound::{DatabaseGateway, MessageDataReader};
pub use service::SyncAsyncBridge;
