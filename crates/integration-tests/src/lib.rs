//! # Integration Tests Crate
//!
//! Verifies the sync/async bridge end-to-end over the real in-memory event
//! bus, with an in-memory database standing in for the durable stores.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! ├── src/
//! │   ├── lib.rs           # This file
//! │   ├── harness.rs       # In-memory database + entity builders
//! │   └── bridge_flows.rs  # End-to-end waiter/event scenarios
//! ```
//!
//! ## Covered Flows
//!
//! 1. **Waiter → send → event bus → resolver → waiter**: confirmation,
//!    reply correlation, rejection, and operation failure outcomes
//! 2. **Deadlines and cleanup**: timeout, send failure, and the registry
//!    being empty after every exit path
//! 3. **Concurrency**: racing confirmation/rejection events resolving a
//!    waiter exactly once, and one event resolving two independent waiters

pub mod harness;

#[cfg(test)]
mod bridge_flows;
