//! Tag-keyed fan-out of server events.
//!
//! Handlers registered for a tag receive every inbound message carrying that
//! tag, in registration order. Registration returns a [`Subscription`]; its
//! [`unsubscribe`](Subscription::unsubscribe) removes exactly that handler.
//!
//! # Example
//!
//! ```ignore
//! let dispatcher = EventDispatcher::new();
//! let sub = dispatcher.subscribe("capture_complete", |msg| {
//!     println!("captured {}", msg.get_string("filename"));
//! });
//!
//! // ...
//! sub.unsubscribe();
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{error, trace};

use crate::identifiers::SubscriptionId;
use crate::protocol::Message;

// ============================================================================
// Types
// ============================================================================

/// Event handler callback type.
///
/// Called on the connection's event loop; keep it short and non-blocking.
/// A panicking handler is logged and skipped.
pub type Handler = Arc<dyn Fn(&Message) + Send + Sync>;

/// Map of tags to their registered handlers.
type HandlerTable = FxHashMap<String, Vec<(SubscriptionId, Handler)>>;

// ============================================================================
// EventDispatcher
// ============================================================================

/// Registry of persistent event handlers.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    table: Arc<Mutex<HandlerTable>>,
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.lock();
        f.debug_struct("EventDispatcher")
            .field("tags", &table.len())
            .field("handlers", &table.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl EventDispatcher {
    /// Creates an empty dispatcher.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for messages tagged `tag`.
    pub fn subscribe<F>(&self, tag: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let tag = tag.into();
        let id = SubscriptionId::next();

        self.table
            .lock()
            .entry(tag.clone())
            .or_default()
            .push((id, Arc::new(handler)));

        trace!(%tag, %id, "Handler subscribed");

        Subscription {
            tag,
            id,
            table: Arc::downgrade(&self.table),
            active: AtomicBool::new(true),
        }
    }

    /// Invokes every handler registered for the message's tag.
    ///
    /// Returns the number of handlers invoked. The table lock is released
    /// before handlers run, so a handler may subscribe or unsubscribe. A
    /// handler that panics does not stop the others.
    pub fn dispatch(&self, message: &Message) -> usize {
        let handlers: Vec<(SubscriptionId, Handler)> = {
            let table = self.table.lock();
            match table.get(message.tag()) {
                Some(entries) => entries.iter().map(|(id, h)| (*id, Arc::clone(h))).collect(),
                None => return 0,
            }
        };

        for (id, handler) in &handlers {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(message))) {
                error!(
                    tag = message.tag(),
                    %id,
                    panic = panic_message(payload.as_ref()),
                    "Event handler panicked"
                );
            }
        }

        handlers.len()
    }

    /// Returns the number of handlers registered for `tag`.
    #[must_use]
    pub fn handler_count(&self, tag: &str) -> usize {
        self.table.lock().get(tag).map_or(0, Vec::len)
    }
}

/// Best-effort text of a panic payload.
fn panic_message<'a>(payload: &'a (dyn Any + Send + 'static)) -> &'a str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle to one handler registration.
///
/// Dropping the handle does not unsubscribe; call
/// [`unsubscribe`](Self::unsubscribe).
pub struct Subscription {
    tag: String,
    id: SubscriptionId,
    table: Weak<Mutex<HandlerTable>>,
    active: AtomicBool,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("tag", &self.tag)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Subscription {
    /// Removes this registration. Later calls are no-ops.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }

        let Some(table) = self.table.upgrade() else {
            return;
        };

        let mut table = table.lock();
        if let Some(entries) = table.get_mut(&self.tag) {
            entries.retain(|(id, _)| *id != self.id);
            if entries.is_empty() {
                table.remove(&self.tag);
            }
        }

        trace!(tag = %self.tag, id = %self.id, "Handler unsubscribed");
    }

    /// Returns the subscribed tag.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the registration id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns `true` until [`unsubscribe`](Self::unsubscribe) is called.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    fn message(tag: &str) -> Message {
        Message::from_frame(&format!(r#"{{"type":"{tag}"}}"#)).expect("valid frame")
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Message) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move |_: &Message| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_dispatch_fans_out_to_all_handlers() {
        let dispatcher = EventDispatcher::new();
        let (a, handler_a) = counter();
        let (b, handler_b) = counter();
        let _sa = dispatcher.subscribe("capture_complete", handler_a);
        let _sb = dispatcher.subscribe("capture_complete", handler_b);

        assert_eq!(dispatcher.dispatch(&message("capture_complete")), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_only_matching_tag() {
        let dispatcher = EventDispatcher::new();
        let (count, handler) = counter();
        let _sub = dispatcher.subscribe("camera_error", handler);

        assert_eq!(dispatcher.dispatch(&message("status")), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_handler() {
        let dispatcher = EventDispatcher::new();
        let (a, handler_a) = counter();
        let (b, handler_b) = counter();
        let sa = dispatcher.subscribe("status", handler_a);
        let _sb = dispatcher.subscribe("status", handler_b);

        sa.unsubscribe();
        assert!(!sa.is_active());
        dispatcher.dispatch(&message("status"));

        assert_eq!(a.load(Ordering::SeqCst), 0);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.handler_count("status"), 1);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let dispatcher = EventDispatcher::new();
        let (_, handler_a) = counter();
        let (_, handler_b) = counter();
        let sa = dispatcher.subscribe("status", handler_a);
        let _sb = dispatcher.subscribe("status", handler_b);

        sa.unsubscribe();
        sa.unsubscribe();
        assert_eq!(dispatcher.handler_count("status"), 1);
    }

    #[test]
    fn test_unsubscribe_after_dispatcher_dropped() {
        let dispatcher = EventDispatcher::new();
        let (_, handler) = counter();
        let sub = dispatcher.subscribe("status", handler);
        drop(dispatcher);
        sub.unsubscribe();
        assert!(!sub.is_active());
    }

    #[test]
    fn test_panicking_handler_does_not_stop_others() {
        let dispatcher = EventDispatcher::new();
        let (count, handler) = counter();
        let _bad = dispatcher.subscribe("camera_connected", |_| panic!("handler bug"));
        let _good = dispatcher.subscribe("camera_connected", handler);

        assert_eq!(dispatcher.dispatch(&message("camera_connected")), 2);
        assert_eq!(dispatcher.dispatch(&message("camera_connected")), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.handler_count("camera_connected"), 2);
    }

    #[test]
    fn test_panic_message_text() {
        let text: Box<dyn Any + Send> = Box::new("boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned boom"));
        let other: Box<dyn Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(text.as_ref()), "boom");
        assert_eq!(panic_message(owned.as_ref()), "owned boom");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_handler_may_subscribe_during_dispatch() {
        let dispatcher = EventDispatcher::new();
        let inner = dispatcher.clone();
        let _sub = dispatcher.subscribe("welcome", move |_| {
            let _ = inner.subscribe("status", |_| {});
        });

        dispatcher.dispatch(&message("welcome"));
        assert_eq!(dispatcher.handler_count("status"), 1);
    }
}
