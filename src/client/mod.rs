//! Camera server client.
//!
//! This module provides the entry point for talking to a camera server.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Cloneable handle onto one persistent connection |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Timing and capacity options |
//! | [`ConnectionState`] | Connection lifecycle state |
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use camera_link::{Client, Command, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder()
//!     .endpoint("ws://127.0.0.1:8765")
//!     .build()?;
//!
//! client.connect().await?;
//! client.wait_connected(Duration::from_secs(5)).await?;
//! client.send(Command::single_shot("cam1")).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Timing and capacity options.
pub mod options;

/// Connection lifecycle state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::Client;
pub use options::{ClientOptions, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT};
pub use state::ConnectionState;
