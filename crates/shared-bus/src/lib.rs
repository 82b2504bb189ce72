//! # Shared Bus - Event Delivery for Inter-Subsystem Communication
//!
//! Delivers persisted event records to subsystem callbacks, partitioned by
//! namespace.
//!
//! ## Delivery Model
//!
//! ```text
//! ┌──────────────┐                      ┌─────────────────────┐
//! │  Aggregator  │    dispatch(event)   │  InMemoryEventBus   │
//! │              │ ───────────────────→ │                     │
//! └──────────────┘                      └─────────────────────┘
//!                                            │ on_event()
//!                              ┌─────────────┴─────────────┐
//!                              ↓                           ↓
//!                    [listener for "ns1"]       [listener for "ns2"]
//! ```
//!
//! A subsystem registers a [`NamespaceListener`] for each namespace it cares
//! about via [`SystemEvents::add_namespace_listener`]; the bus invokes the
//! callback for every event delivered in that namespace. Listeners stay
//! registered for the process lifetime.
//!
//! ## Callback Contract
//!
//! A callback returns `Ok(())` for everything it can recover from, including
//! events it does not recognize. [`ListenerError::Fatal`] is reserved for
//! failures that must stop delivery entirely.

pub mod dispatcher;
pub mod events;
pub mod listener;

// Re-export main types
pub use dispatcher::InMemoryEventBus;
pub use events::{EventDelivery, EventType};
pub use listener::{BusError, ListenerError, NamespaceListener, SystemEvents};
