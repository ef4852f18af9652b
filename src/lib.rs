//! Camera Link - persistent WebSocket client for a camera-control server.
//!
//! The server drives one or more cameras; this crate keeps a single
//! connection to it alive and turns its JSON traffic into typed calls.
//!
//! # Architecture
//!
//! - **Client handles**: cheap clones of [`Client`], usable from any task
//! - **Event loop**: one spawned task per client owns the socket, reply
//!   correlation, keepalive pings and reconnect backoff
//! - **Subscribers**: persistent handlers keyed by message `type`
//! - **Event log**: bounded newest-first record of notable events
//!
//! Commands are matched to replies by the reply's `type` tag, not by a
//! request id, so at most one request per reply tag is in flight.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use camera_link::{Client, Command, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder()
//!         .endpoint("ws://192.168.1.50:8765")
//!         .build()?;
//!
//!     let _sub = client.subscribe("capture_complete", |message| {
//!         println!("captured {}", message.get_string("filename"));
//!     });
//!
//!     client.connect().await?;
//!     client.wait_connected(Duration::from_secs(5)).await?;
//!
//!     let status = client.send(Command::status()).await?;
//!     println!("{}", status.payload());
//!
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`], builder, options and connection state |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`events`] | Subscriptions and the event log |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | Event loop, correlation, heartbeat, backoff (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Client handle and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Event fan-out and event log.
pub mod events;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// WebSocket protocol message types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Internal module owning the socket and its timers.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, ClientOptions, ConnectionState};

// Error types
pub use error::{Error, Result};

// Event types
pub use events::{EventLog, LogEntry, Severity, Subscription};

// Identifier types
pub use identifiers::{EntryId, RequestId, SubscriptionId};

// Protocol types
pub use protocol::{Command, Message, ParsedMessage};
