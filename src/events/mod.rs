//! Event fan-out and the human-readable event log.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `dispatcher` | Tag-keyed persistent subscriptions |
//! | `log` | Bounded newest-first log |

// ============================================================================
// Submodules
// ============================================================================

/// Tag-keyed event fan-out.
pub mod dispatcher;

/// Bounded event log.
pub mod log;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::{EventDispatcher, Handler, Subscription};
pub use log::{DEFAULT_LOG_CAPACITY, EventLog, LogEntry, Severity};
