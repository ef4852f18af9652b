//! Reply correlation by response tag.
//!
//! Each command that expects a reply registers a one-shot waiter under the
//! reply tag. The first inbound message with that tag removes the waiter and
//! fulfils it. At most one live waiter exists per tag.
//!
//! The correlator is owned by the connection event loop and is never shared,
//! so the table needs no lock.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::time::{Instant, timeout};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;
use crate::protocol::Message;

// ============================================================================
// Types
// ============================================================================

/// Sending half of a reply slot.
pub type ReplyTx = oneshot::Sender<Result<Message>>;

/// Receiving half of a reply slot.
pub type ReplyRx = oneshot::Receiver<Result<Message>>;

/// A pending request waiting for its reply.
#[derive(Debug)]
struct Waiter {
    request_id: RequestId,
    created_at: Instant,
    tx: ReplyTx,
}

// ============================================================================
// Correlator
// ============================================================================

/// Table of pending requests keyed by expected reply tag.
#[derive(Debug, Default)]
pub struct Correlator {
    waiters: FxHashMap<String, Waiter>,
}

impl Correlator {
    /// Creates an empty correlator.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for `tag`.
    ///
    /// A waiter whose caller already gave up (receiver dropped) is replaced.
    /// If a live waiter holds the tag, `tx` is failed with
    /// [`Error::DuplicateRequest`] and `false` is returned.
    pub fn register(&mut self, tag: &str, request_id: RequestId, tx: ReplyTx) -> bool {
        if let Some(existing) = self.waiters.get(tag)
            && !existing.tx.is_closed()
        {
            warn!(%tag, %request_id, pending = %existing.request_id, "Reply tag already awaited");
            let _ = tx.send(Err(Error::duplicate_request(tag)));
            return false;
        }

        self.waiters.insert(
            tag.to_string(),
            Waiter {
                request_id,
                created_at: Instant::now(),
                tx,
            },
        );

        trace!(%tag, %request_id, "Waiter registered");
        true
    }

    /// Fulfils the waiter for the message's tag, if any.
    ///
    /// Returns `true` if a caller received the message. Unsolicited and late
    /// messages are not an error.
    pub fn resolve(&mut self, message: &Message) -> bool {
        let Some(waiter) = self.waiters.remove(message.tag()) else {
            return false;
        };

        let elapsed_ms = waiter.created_at.elapsed().as_millis() as u64;
        if waiter.tx.send(Ok(message.clone())).is_err() {
            debug!(tag = message.tag(), request_id = %waiter.request_id, "Reply arrived after caller gave up");
            return false;
        }

        trace!(tag = message.tag(), request_id = %waiter.request_id, elapsed_ms, "Reply correlated");
        true
    }

    /// Removes the waiter for `tag` if it belongs to `request_id`.
    pub fn cancel(&mut self, tag: &str, request_id: RequestId) -> bool {
        match self.waiters.get(tag) {
            Some(waiter) if waiter.request_id == request_id => {
                self.waiters.remove(tag);
                debug!(%tag, %request_id, "Removed timed-out waiter");
                true
            }
            _ => false,
        }
    }

    /// Removes the waiter for `tag` and hands it `error`, if it belongs to `request_id`.
    pub fn fail(&mut self, tag: &str, request_id: RequestId, error: Error) -> bool {
        match self.waiters.get(tag) {
            Some(waiter) if waiter.request_id == request_id => {
                if let Some(waiter) = self.waiters.remove(tag) {
                    let _ = waiter.tx.send(Err(error));
                }
                true
            }
            _ => false,
        }
    }

    /// Fails every waiter with the error produced by `make_error` and clears the table.
    ///
    /// Returns the number of waiters failed.
    pub fn reject_all(&mut self, make_error: impl Fn() -> Error) -> usize {
        let count = self.waiters.len();
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.tx.send(Err(make_error()));
        }

        if count > 0 {
            debug!(count, "Failed pending requests");
        }
        count
    }

    /// Returns `true` if a waiter is registered for `tag`.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, tag: &str) -> bool {
        self.waiters.contains_key(tag)
    }

    /// Returns the number of pending waiters.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

// ============================================================================
// Awaiting
// ============================================================================

/// Waits on a reply slot for at most `limit`.
///
/// A dropped sender means the connection went away.
///
/// # Errors
///
/// - [`Error::Timeout`] if nothing arrives within `limit`
/// - [`Error::ConnectionLost`] if the slot is dropped unfulfilled
/// - whatever error the loop put in the slot
pub async fn await_reply(rx: ReplyRx, tag: &str, limit: Duration) -> Result<Message> {
    match timeout(limit, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(Error::ConnectionLost),
        Err(_) => Err(Error::timeout(tag, limit.as_millis() as u64)),
    }
}

// ============================================================================
// Tests
// ============================================================================
