//! WebSocket protocol message types.
//!
//! This module defines the messages exchanged with the camera server.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Discriminant |
//! |--------------|-----------|--------------|
//! | [`Command`] | Client → Server | `command` |
//! | [`Message`] | Server → Client | `type` |
//!
//! Replies to commands and unsolicited events share the same shape; a reply
//! is simply a message whose `type` matches the tag the command expects
//! (see [`expected_reply`]).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound commands and reply-tag table |
//! | `message` | Inbound tagged messages |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound commands.
pub mod command;

/// Inbound messages.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{Command, PING, expected_reply};
pub use message::{ACK, LogSummary, Message, PONG, ParsedMessage};
