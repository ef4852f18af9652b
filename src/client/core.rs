//! Camera server client handle.
//!
//! The [`Client`] is a cheap, cloneable handle onto one connection. Every
//! clone drives the same event loop; the loop shuts down once the last
//! handle is dropped.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use camera_link::{Client, Command};
//!
//! # async fn example() -> camera_link::Result<()> {
//! let client = Client::builder()
//!     .endpoint("ws://127.0.0.1:8765")
//!     .build()?;
//!
//! client.connect().await?;
//! client.wait_connected(Duration::from_secs(5)).await?;
//!
//! let status = client.send(Command::status()).await?;
//! println!("{}", status.payload());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::events::{LogEntry, Severity, Subscription};
use crate::identifiers::RequestId;
use crate::protocol::{ACK, Command, Message};
use crate::transport::connection::{ConnectionCommand, EventLoop, Shared};
use crate::transport::correlator::await_reply;

use super::builder::ClientBuilder;
use super::options::ClientOptions;
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Server URL.
    pub endpoint: Url,

    /// Timing and capacity options.
    pub options: ClientOptions,

    /// Channel into the event loop.
    pub command_tx: mpsc::UnboundedSender<ConnectionCommand>,

    /// State published by the event loop.
    pub shared: Arc<Shared>,
}

// ============================================================================
// Client
// ============================================================================

/// Persistent connection to a camera-control server.
///
/// The client:
/// - Opens the socket on [`connect`](Self::connect) and reconnects with backoff
/// - Correlates command replies by response tag
/// - Sends keepalive pings while connected
/// - Fans inbound messages out to subscribers and keeps an event log
#[derive(Clone)]
pub struct Client {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.inner.endpoint.as_str())
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Construction
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Spawns the event loop on `runtime` and returns the first handle.
    pub(crate) fn spawn(runtime: &Handle, endpoint: Url, options: ClientOptions) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(options.log_capacity));

        let event_loop = EventLoop::new(
            endpoint.clone(),
            options.clone(),
            Arc::clone(&shared),
            command_rx,
        );
        runtime.spawn(event_loop.run());

        debug!(%endpoint, "Client created");

        Self {
            inner: Arc::new(ClientInner {
                endpoint,
                options,
                command_tx,
                shared,
            }),
        }
    }
}

// ============================================================================
// Client - Lifecycle
// ============================================================================

impl Client {
    /// Starts connecting.
    ///
    /// No-op while connected or connecting. Otherwise any scheduled
    /// reconnect is cancelled and the retry budget is restored. Returns once
    /// the attempt has begun, so [`state`](Self::state) no longer reports
    /// an earlier `Failed`; use [`wait_connected`](Self::wait_connected) for
    /// the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLost`] if the event loop is gone.
    pub async fn connect(&self) -> Result<()> {
        let (done, done_rx) = oneshot::channel();
        self.command(ConnectionCommand::Connect { done })?;
        done_rx.await.map_err(|_| Error::ConnectionLost)
    }

    /// Closes the connection and cancels any scheduled reconnect.
    ///
    /// Pending requests fail with [`Error::ConnectionLost`]. Returns once
    /// the teardown is complete.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionLost`] if the event loop is gone.
    pub async fn disconnect(&self) -> Result<()> {
        let (done, done_rx) = oneshot::channel();
        self.command(ConnectionCommand::Disconnect { done })?;
        done_rx.await.map_err(|_| Error::ConnectionLost)
    }

    /// Waits until connected.
    ///
    /// # Errors
    ///
    /// - [`Error::ReconnectExhausted`] if the client reaches `Failed`
    /// - [`Error::ConnectionTimeout`] if `limit` elapses first
    pub async fn wait_connected(&self, limit: Duration) -> Result<()> {
        let mut state_rx = self.state_changes();

        let wait = async {
            loop {
                let state = state_rx.borrow_and_update().clone();
                match state {
                    ConnectionState::Connected => return Ok(()),
                    ConnectionState::Failed(_) => {
                        return Err(Error::reconnect_exhausted(self.reconnect_attempts()));
                    }
                    _ => {}
                }
                state_rx
                    .changed()
                    .await
                    .map_err(|_| Error::ConnectionLost)?;
            }
        };

        timeout(limit, wait)
            .await
            .map_err(|_| Error::connection_timeout(limit.as_millis() as u64))?
    }
}

// ============================================================================
// Client - Commands
// ============================================================================

impl Client {
    /// Sends a command and waits for its reply with the configured timeout.
    ///
    /// Commands without a reply resolve with an `ack` message once written.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if not connected; nothing is sent
    /// - [`Error::Timeout`] if no reply arrives in time
    /// - [`Error::DuplicateRequest`] if the same reply is already awaited
    /// - [`Error::ConnectionLost`] if the connection drops first
    pub async fn send(&self, command: Command) -> Result<Message> {
        self.send_with_timeout(command, self.inner.options.request_timeout)
            .await
    }

    /// Sends a command and waits at most `limit` for its reply.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_with_timeout(&self, command: Command, limit: Duration) -> Result<Message> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }

        let request_id = RequestId::generate();
        let reply_tag = command.expected_reply();
        let (response_tx, response_rx) = oneshot::channel();

        self.command(ConnectionCommand::Send {
            command,
            request_id,
            response_tx,
        })?;

        let result = await_reply(response_rx, reply_tag.unwrap_or(ACK), limit).await;

        if let (Some(tag), Err(Error::Timeout { .. })) = (reply_tag, &result) {
            let _ = self
                .inner
                .command_tx
                .send(ConnectionCommand::RemoveCorrelation { tag, request_id });
        }

        result
    }

    fn command(&self, command: ConnectionCommand) -> Result<()> {
        self.inner
            .command_tx
            .send(command)
            .map_err(|_| Error::ConnectionLost)
    }
}

// ============================================================================
// Client - Events
// ============================================================================

impl Client {
    /// Registers `handler` for every inbound message tagged `tag`.
    ///
    /// Handlers run on the event loop and must not block.
    pub fn subscribe<F>(&self, tag: impl Into<String>, handler: F) -> Subscription
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        self.inner.shared.dispatcher.subscribe(tag, handler)
    }

    /// Snapshot of the event log, newest first.
    #[must_use]
    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.inner.shared.log.lock().to_vec()
    }

    /// Appends an application entry to the event log.
    pub fn add_log(&self, severity: Severity, message: impl Into<String>, device_id: Option<String>) {
        self.inner
            .shared
            .log
            .lock()
            .append(severity, message, device_id);
    }

    /// Empties the event log.
    pub fn clear_log(&self) {
        self.inner.shared.log.lock().clear();
    }
}

// ============================================================================
// Client - Accessors
// ============================================================================

impl Client {
    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.state.borrow().clone()
    }

    /// Returns `true` when connected.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.shared.state.borrow().is_connected()
    }

    /// Watch channel holding the latest state.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.shared.state.subscribe()
    }

    /// Every state transition, in order, from now on.
    #[must_use]
    pub fn transitions(&self) -> broadcast::Receiver<ConnectionState> {
        self.inner.shared.transitions.subscribe()
    }

    /// Automatic reconnect attempts since the last successful connect.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.shared.attempts.load(Ordering::Acquire)
    }

    /// Requests currently awaiting a reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.shared.pending.load(Ordering::Acquire)
    }

    /// Server URL.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Configured options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }
}

// ============================================================================
// Tests
// ============================================================================
