//! Error types for the camera link client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use camera_link::{Client, Command, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     let reply = client.send(Command::status()).await?;
//!     println!("{}", reply.tag());
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::NotConnected`], [`Error::ConnectionLost`], [`Error::ConnectionTimeout`], [`Error::ReconnectExhausted`], [`Error::Transport`] |
//! | Correlation | [`Error::Timeout`], [`Error::DuplicateRequest`] |
//! | Protocol | [`Error::MalformedMessage`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// A command was issued while the client was not connected.
    ///
    /// No bytes are written to the transport in this case.
    #[error("Not connected to camera server")]
    NotConnected,

    /// The connection dropped while the request was outstanding.
    #[error("Connection lost")]
    ConnectionLost,

    /// The client did not reach the connected state in time.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Automatic reconnection gave up.
    ///
    /// Terminal until [`Client::connect`](crate::Client::connect) is called again.
    #[error("Reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted {
        /// Number of automatic attempts made.
        attempts: u32,
    },

    /// Low-level socket failure.
    ///
    /// Always followed by a close of the connection.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Correlation Errors
    // ========================================================================
    /// No reply with the expected tag arrived before the deadline.
    #[error("No '{tag}' reply within {timeout_ms}ms")]
    Timeout {
        /// Response tag that was awaited.
        tag: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Another request is already waiting for the same reply tag.
    #[error("A request awaiting '{tag}' is already in flight")]
    DuplicateRequest {
        /// Response tag that is already awaited.
        tag: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Inbound frame could not be parsed.
    ///
    /// Logged and dropped by the event loop, never returned from `send`.
    #[error("Malformed message: {message}")]
    MalformedMessage {
        /// Description of the parse failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a reconnect exhausted error.
    #[inline]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a reply timeout error.
    #[inline]
    pub fn timeout(tag: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            tag: tag.into(),
            timeout_ms,
        }
    }

    /// Creates a duplicate request error.
    #[inline]
    pub fn duplicate_request(tag: impl Into<String>) -> Self {
        Self::DuplicateRequest { tag: tag.into() }
    }

    /// Creates a malformed message error.
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ConnectionTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::ConnectionLost
                | Self::ConnectionTimeout { .. }
                | Self::ReconnectExhausted { .. }
                | Self::Transport { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry once the link is back.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::ConnectionLost
                | Self::ConnectionTimeout { .. }
                | Self::Timeout { .. }
                | Self::DuplicateRequest { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
