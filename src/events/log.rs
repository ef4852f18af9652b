//! Bounded, newest-first event log.
//!
//! The log is the human-readable history of the connection: lifecycle
//! changes, well-known camera events and manual notes. It is pure in-memory
//! data with no I/O.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::EntryId;

// ============================================================================
// Constants
// ============================================================================

/// Default number of entries kept.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

// ============================================================================
// Severity
// ============================================================================

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Neutral information.
    Info,
    /// Something completed successfully.
    Success,
    /// Degraded but not failed.
    Warning,
    /// Failure.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

// ============================================================================
// LogEntry
// ============================================================================

/// A single immutable log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Unique, increasing id.
    pub id: EntryId,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub severity: Severity,
    /// Human-readable text.
    pub message: String,
    /// Camera the entry refers to.
    #[serde(rename = "deviceId", skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<7} {}",
            self.timestamp.format("%H:%M:%S"),
            self.severity,
            self.message
        )?;
        if let Some(device) = &self.device_id {
            write!(f, " ({device})")?;
        }
        Ok(())
    }
}

// ============================================================================
// EventLog
// ============================================================================

/// Fixed-capacity log ordered newest-first.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    /// Creates an empty log holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepends a new entry, evicting the oldest once full.
    pub fn append(
        &mut self,
        severity: Severity,
        message: impl Into<String>,
        device_id: Option<String>,
    ) -> &LogEntry {
        self.entries.push_front(LogEntry {
            id: EntryId::next(),
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            device_id,
        });
        self.entries.truncate(self.capacity);
        &self.entries[0]
    }

    /// Removes all entries.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterates entries newest-first.
    #[inline]
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Returns the newest entry.
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.front()
    }

    /// Copies the entries out, newest-first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<LogEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the log is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the maximum number of entries.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

// ============================================================================
// Tests
// ============================================================================
