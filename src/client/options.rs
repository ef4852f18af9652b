//! Client timing and capacity options.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use camera_link::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_request_timeout(Duration::from_secs(5))
//!     .with_max_reconnect_attempts(10);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::events::DEFAULT_LOG_CAPACITY;
use crate::transport::heartbeat::DEFAULT_HEARTBEAT_INTERVAL;
use crate::transport::reconnect::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

// ============================================================================
// Constants
// ============================================================================

/// Default time a command waits for its reply.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time allowed to open the socket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// ClientOptions
// ============================================================================

/// Client configuration options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// How long `send` waits for a reply.
    pub request_timeout: Duration,

    /// How long a single socket open may take.
    pub connect_timeout: Duration,

    /// Keepalive period.
    pub heartbeat_interval: Duration,

    /// Delay before the first automatic reconnect; doubles per attempt.
    pub reconnect_base_delay: Duration,

    /// Automatic reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Number of event log entries kept.
    pub log_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with the default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_base_delay: DEFAULT_BASE_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_ATTEMPTS,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the reply timeout.
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the socket open timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the keepalive period.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Sets the base reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    /// Sets the reconnect attempt cap.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Sets the event log capacity.
    #[inline]
    #[must_use]
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
