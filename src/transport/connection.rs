//! WebSocket connection and event loop.
//!
//! A single spawned task owns the socket, the correlator, the heartbeat and
//! the reconnect timer. Client handles talk to it over an unbounded command
//! channel, so none of that state needs a lock.
//!
//! # Event Loop
//!
//! Each iteration waits on whichever of these is ready first:
//!
//! - a command from a [`Client`](crate::Client) handle
//! - completion of an in-progress socket open
//! - an inbound frame
//! - the reconnect timer
//! - the heartbeat timer
//!
//! Inbound text frames are parsed, logged if well known, offered to the
//! correlator and then fanned out to subscribers, in that order.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use futures_util::future::BoxFuture;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Sleep, sleep, timeout};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::client::{ClientOptions, ConnectionState};
use crate::error::{Error, Result};
use crate::events::{EventDispatcher, EventLog, Severity};
use crate::identifiers::RequestId;
use crate::protocol::{Command, Message};

use super::correlator::{Correlator, ReplyTx};
use super::heartbeat::Heartbeat;
use super::reconnect::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Buffered state transitions per subscriber before it starts lagging.
const TRANSITION_CAPACITY: usize = 64;

/// Reason sent with the client's own close frame.
const CLIENT_CLOSE_REASON: &str = "client disconnect";

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWrite = SplitSink<WsStream, WsMessage>;
type WsRead = SplitStream<WsStream>;
type ConnectFuture = BoxFuture<'static, Result<WsStream>>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
pub(crate) enum ConnectionCommand {
    /// Open the socket unless already connected or connecting; `done` fires
    /// once the resulting state is published.
    Connect { done: oneshot::Sender<()> },
    /// Close the socket and cancel any reconnect; `done` fires afterwards.
    Disconnect { done: oneshot::Sender<()> },
    /// Write a command and route its reply into `response_tx`.
    Send {
        command: Command,
        request_id: RequestId,
        response_tx: ReplyTx,
    },
    /// Remove a timed-out waiter.
    RemoveCorrelation {
        tag: &'static str,
        request_id: RequestId,
    },
}

// ============================================================================
// Shared
// ============================================================================

/// State readable from client handles while the loop owns the socket.
pub(crate) struct Shared {
    pub(crate) state: watch::Sender<ConnectionState>,
    pub(crate) transitions: broadcast::Sender<ConnectionState>,
    pub(crate) dispatcher: EventDispatcher,
    pub(crate) log: Mutex<EventLog>,
    pub(crate) attempts: AtomicU32,
    pub(crate) pending: AtomicUsize,
}

impl Shared {
    pub(crate) fn new(log_capacity: usize) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);

        Self {
            state,
            transitions,
            dispatcher: EventDispatcher::new(),
            log: Mutex::new(EventLog::new(log_capacity)),
            attempts: AtomicU32::new(0),
            pending: AtomicUsize::new(0),
        }
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// Owner of the socket and everything that touches it.
pub(crate) struct EventLoop {
    endpoint: Url,
    options: ClientOptions,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<ConnectionCommand>,
    writer: Option<WsWrite>,
    reader: Option<WsRead>,
    connecting: Option<ConnectFuture>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    heartbeat: Heartbeat,
    correlator: Correlator,
    policy: ReconnectPolicy,
}

impl EventLoop {
    pub(crate) fn new(
        endpoint: Url,
        options: ClientOptions,
        shared: Arc<Shared>,
        commands: mpsc::UnboundedReceiver<ConnectionCommand>,
    ) -> Self {
        let heartbeat = Heartbeat::new(options.heartbeat_interval);
        let policy =
            ReconnectPolicy::new(options.reconnect_base_delay, options.max_reconnect_attempts);

        Self {
            endpoint,
            options,
            shared,
            commands,
            writer: None,
            reader: None,
            connecting: None,
            reconnect_timer: None,
            heartbeat,
            correlator: Correlator::new(),
            policy,
        }
    }

    /// Runs until every client handle is dropped.
    pub(crate) async fn run(mut self) {
        debug!(endpoint = %self.endpoint, "Event loop started");

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }

                result = poll_connecting(&mut self.connecting) => {
                    self.connecting = None;
                    self.on_connect_result(result);
                }

                frame = next_frame(&mut self.reader) => {
                    self.handle_frame(frame);
                }

                () = wait_reconnect(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    self.begin_connect();
                }

                () = self.heartbeat.tick() => {
                    self.send_ping().await;
                }
            }
        }

        if self.writer.is_some() || self.connecting.is_some() {
            self.disconnect().await;
        }

        debug!("Event loop terminated");
    }
}

// ============================================================================
// EventLoop - Commands
// ============================================================================

impl EventLoop {
    async fn handle_command(&mut self, command: ConnectionCommand) {
        match command {
            ConnectionCommand::Connect { done } => {
                self.connect();
                let _ = done.send(());
            }

            ConnectionCommand::Disconnect { done } => {
                self.disconnect().await;
                let _ = done.send(());
            }

            ConnectionCommand::Send {
                command,
                request_id,
                response_tx,
            } => {
                self.handle_send(command, request_id, response_tx).await;
            }

            ConnectionCommand::RemoveCorrelation { tag, request_id } => {
                self.correlator.cancel(tag, request_id);
                self.sync_counters();
            }
        }
    }

    /// Manual connect. Cancels any scheduled retry and restores the full budget.
    fn connect(&mut self) {
        let state = self.current_state();
        if state.is_connected() || self.connecting.is_some() {
            debug!(%state, "Connect ignored");
            return;
        }

        self.reconnect_timer = None;
        self.policy.reset();
        self.sync_counters();
        self.begin_connect();
    }

    /// Starts opening the socket.
    fn begin_connect(&mut self) {
        self.set_state(ConnectionState::Connecting);

        let request = self.endpoint.as_str().to_owned();
        let limit = self.options.connect_timeout;
        debug!(endpoint = %request, "Opening WebSocket");

        self.connecting = Some(Box::pin(async move {
            match timeout(limit, connect_async(request)).await {
                Ok(Ok((stream, _response))) => Ok(stream),
                Ok(Err(e)) => Err(Error::from(e)),
                Err(_) => Err(Error::connection_timeout(limit.as_millis() as u64)),
            }
        }));
    }

    /// Closes the socket with a normal close and resets everything.
    async fn disconnect(&mut self) {
        self.reconnect_timer = None;
        self.connecting = None;
        self.heartbeat.stop();

        if let Some(mut writer) = self.writer.take() {
            let frame = CloseFrame {
                code: CloseCode::Normal,
                reason: Utf8Bytes::from_static(CLIENT_CLOSE_REASON),
            };
            if let Err(e) = writer.send(WsMessage::Close(Some(frame))).await {
                debug!(error = %e, "Close frame not delivered");
            }
        }
        self.reader = None;

        self.correlator.reject_all(|| Error::ConnectionLost);
        self.policy.reset();
        self.sync_counters();

        if self.current_state() != ConnectionState::Disconnected {
            self.set_state(ConnectionState::Disconnected);
            info!(endpoint = %self.endpoint, "Disconnected");
            self.log(Severity::Info, "Disconnected from camera server", None);
        }
    }

    async fn handle_send(&mut self, command: Command, request_id: RequestId, response_tx: ReplyTx) {
        let Some(writer) = self.writer.as_mut() else {
            let _ = response_tx.send(Err(Error::NotConnected));
            return;
        };

        let frame = match command.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                let _ = response_tx.send(Err(e));
                return;
            }
        };

        // Waiter goes in before the write so a fast reply is never missed.
        let reply_tag = command.expected_reply();
        let ack_tx = match reply_tag {
            Some(tag) => {
                if !self.correlator.register(tag, request_id, response_tx) {
                    return;
                }
                None
            }
            None => Some(response_tx),
        };

        match writer.send(WsMessage::Text(frame.into())).await {
            Ok(()) => {
                trace!(%command, %request_id, "Command sent");
                if let Some(tx) = ack_tx {
                    let _ = tx.send(Ok(Message::ack(command.name())));
                }
            }
            Err(e) => {
                warn!(error = %e, %command, "Failed to send command");
                let error = Error::transport(e.to_string());
                match (reply_tag, ack_tx) {
                    (Some(tag), _) => {
                        self.correlator.fail(tag, request_id, error);
                    }
                    (None, Some(tx)) => {
                        let _ = tx.send(Err(error));
                    }
                    (None, None) => {}
                }
            }
        }

        self.sync_counters();
    }
}

// ============================================================================
// EventLoop - Socket Events
// ============================================================================

impl EventLoop {
    fn on_connect_result(&mut self, result: Result<WsStream>) {
        match result {
            Ok(stream) => {
                let (writer, reader) = stream.split();
                self.writer = Some(writer);
                self.reader = Some(reader);

                self.policy.reset();
                self.sync_counters();
                self.heartbeat.start();
                self.set_state(ConnectionState::Connected);

                info!(endpoint = %self.endpoint, "Connected");
                self.log(Severity::Info, "Connected to camera server", None);
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Connection attempt failed");
                self.log(Severity::Error, format!("Connection error: {e}"), None);
                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect();
            }
        }
    }

    fn handle_frame(&mut self, frame: Option<std::result::Result<WsMessage, WsError>>) {
        match frame {
            Some(Ok(WsMessage::Text(text))) => self.handle_text(&text),

            Some(Ok(WsMessage::Close(frame))) => {
                let graceful = is_graceful(frame.as_ref());
                let reason = frame
                    .map(|f| format!("{} {}", u16::from(f.code), f.reason.as_str()))
                    .unwrap_or_else(|| "no close code".to_string());
                debug!(graceful, %reason, "WebSocket closed by remote");
                self.on_closed(graceful, &reason);
            }

            Some(Err(e)) => {
                error!(error = %e, "WebSocket error");
                self.on_closed(false, &e.to_string());
            }

            None => {
                debug!("WebSocket stream ended");
                self.on_closed(false, "stream ended");
            }

            // Binary, Ping, Pong
            Some(Ok(_)) => {}
        }
    }

    fn handle_text(&mut self, text: &str) {
        let message = match Message::from_frame(text) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                self.log(Severity::Error, format!("Failed to parse message: {e}"), None);
                return;
            }
        };

        if message.is_pong() {
            trace!("Pong received");
            self.heartbeat.acknowledge();
            return;
        }

        trace!(tag = message.tag(), "Frame received");

        if let Some(summary) = message.parse().log_summary() {
            self.log(summary.severity, summary.message, summary.device_id);
        }

        if self.correlator.resolve(&message) {
            self.sync_counters();
        }

        self.shared.dispatcher.dispatch(&message);
    }

    /// Tears down after the socket went away on its own.
    fn on_closed(&mut self, graceful: bool, reason: &str) {
        self.writer = None;
        self.reader = None;
        self.heartbeat.stop();

        let failed = self.correlator.reject_all(|| Error::ConnectionLost);
        self.sync_counters();
        self.set_state(ConnectionState::Disconnected);

        if graceful {
            info!(endpoint = %self.endpoint, failed, "Server closed the connection");
            self.log(Severity::Info, "Disconnected from camera server", None);
        } else {
            warn!(endpoint = %self.endpoint, failed, %reason, "Connection lost");
            self.log(Severity::Warning, format!("Connection lost: {reason}"), None);
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(&mut self) {
        match self.policy.next_delay() {
            Some(delay) => {
                self.sync_counters();
                let attempt = self.policy.attempts();
                let max = self.policy.max_attempts();

                info!(delay_ms = delay.as_millis() as u64, attempt, max, "Scheduling reconnect");
                self.log(
                    Severity::Info,
                    format!(
                        "Reconnecting in {:.1}s (attempt {attempt}/{max})",
                        delay.as_secs_f64()
                    ),
                    None,
                );
                self.reconnect_timer = Some(Box::pin(sleep(delay)));
            }
            None => {
                let exhausted = Error::reconnect_exhausted(self.policy.attempts());
                error!(endpoint = %self.endpoint, "{exhausted}");
                self.log(Severity::Error, "Maximum reconnection attempts reached", None);
                self.set_state(ConnectionState::Failed(exhausted.to_string()));
            }
        }
    }

    async fn send_ping(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            self.heartbeat.stop();
            return;
        };

        let sent = match Command::ping().to_frame() {
            Ok(frame) => writer.send(WsMessage::Text(frame.into())).await.map_err(Error::from),
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => trace!("Ping sent"),
            Err(e) => {
                debug!(error = %e, "Ping failed, stopping heartbeat");
                self.heartbeat.stop();
            }
        }
    }
}

// ============================================================================
// EventLoop - Shared State
// ============================================================================

impl EventLoop {
    fn current_state(&self) -> ConnectionState {
        self.shared.state.borrow().clone()
    }

    /// Publishes a transition. Repeating the current state is a no-op.
    fn set_state(&self, next: ConnectionState) {
        let changed = self.shared.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            if !current.can_transition_to(&next) {
                warn!(from = %current, to = %next, "Unexpected state transition");
            }
            *current = next.clone();
            true
        });

        if changed {
            debug!(state = %next, "State changed");
            let _ = self.shared.transitions.send(next);
        }
    }

    fn sync_counters(&self) {
        self.shared
            .attempts
            .store(self.policy.attempts(), Ordering::Release);
        self.shared
            .pending
            .store(self.correlator.len(), Ordering::Release);
    }

    fn log(&self, severity: Severity, message: impl Into<String>, device_id: Option<String>) {
        self.shared.log.lock().append(severity, message, device_id);
    }
}

// ============================================================================
// Select Helpers
// ============================================================================

async fn poll_connecting(connecting: &mut Option<ConnectFuture>) -> Result<WsStream> {
    match connecting {
        Some(future) => future.await,
        None => pending().await,
    }
}

async fn next_frame(reader: &mut Option<WsRead>) -> Option<std::result::Result<WsMessage, WsError>> {
    match reader {
        Some(reader) => reader.next().await,
        None => pending().await,
    }
}

async fn wait_reconnect(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

/// Only a normal (1000) close counts as intentional.
fn is_graceful(frame: Option<&CloseFrame>) -> bool {
    frame.is_some_and(|f| f.code == CloseCode::Normal)
}

// ============================================================================
// Tests
// ============================================================================
