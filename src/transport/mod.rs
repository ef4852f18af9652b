//! WebSocket transport layer.
//!
//! Everything between the client handle and the camera server's socket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ConnectionCommand  ┌──────────────────────┐  WebSocket  ┌───────────────┐
//! │ Client       │────────────────────►│ EventLoop            │◄───────────►│ Camera server │
//! │ (any task)   │◄────────────────────│  Correlator          │             │               │
//! └──────────────┘  oneshot replies    │  Heartbeat           │             └───────────────┘
//!                                      │  ReconnectPolicy     │
//!                                      └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Socket ownership and the event loop |
//! | `correlator` | Reply matching by response tag |
//! | `heartbeat` | Keepalive timer |
//! | `reconnect` | Exponential backoff policy |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub(crate) mod connection;

/// Reply correlation.
pub mod correlator;

/// Keepalive timer.
pub mod heartbeat;

/// Reconnection backoff.
pub mod reconnect;

/// Loopback server for tests.
#[cfg(test)]
pub(crate) mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use correlator::Correlator;
pub use heartbeat::{DEFAULT_HEARTBEAT_INTERVAL, Heartbeat};
pub use reconnect::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, ReconnectPolicy};
