//! Connection lifecycle state.
//!
//! ```text
//!   ┌──────────────┐ connect ┌────────────┐  open   ┌───────────┐
//!   │ Disconnected │────────►│ Connecting │────────►│ Connected │
//!   └──────────────┘◄────────└────────────┘         └───────────┘
//!      │    ▲          failure                            │
//!      │    └─────────────────────────────────────────────┘
//!      │ retries exhausted                  close
//!      ▼
//!   ┌────────┐ connect
//!   │ Failed │────────► Connecting
//!   └────────┘────────► Disconnected
//!              disconnect
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// State of the link to the camera server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket; a reconnect may be scheduled.
    #[default]
    Disconnected,
    /// Opening the socket.
    Connecting,
    /// Socket open, commands accepted.
    Connected,
    /// Automatic reconnection gave up. Only an explicit connect leaves this state.
    Failed(String),
}

impl ConnectionState {
    /// Returns `true` if `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(&self, next: &Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Failed(_), Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connecting, Self::Disconnected)
                | (Self::Connected, Self::Disconnected)
                | (Self::Disconnected, Self::Failed(_))
                | (Self::Failed(_), Self::Disconnected)
        )
    }

    /// Returns `true` when connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` while a socket is being opened.
    #[inline]
    #[must_use]
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting)
    }

    /// Returns `true` in the terminal failed state.
    #[inline]
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use ConnectionState::{Connected, Connecting, Disconnected, Failed};

    #[test]
    fn test_legal_edges() {
        assert!(Disconnected.can_transition_to(&Connecting));
        assert!(Connecting.can_transition_to(&Connected));
        assert!(Connecting.can_transition_to(&Disconnected));
        assert!(Connected.can_transition_to(&Disconnected));
        assert!(Disconnected.can_transition_to(&Failed("x".into())));
        assert!(Failed("x".into()).can_transition_to(&Connecting));
        assert!(Failed("x".into()).can_transition_to(&Disconnected));
    }

    #[test]
    fn test_illegal_edges() {
        assert!(!Disconnected.can_transition_to(&Connected));
        assert!(!Connected.can_transition_to(&Connecting));
        assert!(!Connected.can_transition_to(&Failed("x".into())));
        assert!(!Connecting.can_transition_to(&Failed("x".into())));
        assert!(!Failed("x".into()).can_transition_to(&Connected));
        assert!(!Connected.can_transition_to(&Connected));
    }

    #[test]
    fn test_display() {
        assert_eq!(Connected.to_string(), "connected");
        assert_eq!(
            Failed("reconnect attempts exhausted".into()).to_string(),
            "failed: reconnect attempts exhausted"
        );
    }

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), Disconnected);
    }
}
