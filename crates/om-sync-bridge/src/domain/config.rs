//! Bridge configuration.

use std::time::Duration;

/// Default time a waiter blocks before giving up.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Tuning knobs for the bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long a `wait_for_*` call blocks before returning a timeout
    /// error, when the caller's request context carries no deadline of
    /// its own.
    pub request_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
