//! # Error Types
//!
//! Store-level errors shared across subsystems.

use thiserror::Error;

/// Errors surfaced by entity stores.
///
/// A missing entity is `Ok(None)` on the store interface, never an error;
/// these variants cover genuine infrastructure failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The underlying database failed.
    #[error("database error: {0}")]
    Database(String),

    /// A stored value could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}
