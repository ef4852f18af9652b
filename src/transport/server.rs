//! Loopback camera server used by the test suite.
//!
//! Binds to `127.0.0.1:0`, accepts clients one at a time and hands each
//! accepted socket back as a [`Peer`] the test drives by hand.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Message as WsMessage, Utf8Bytes};
use tokio_tungstenite::{WebSocketStream, accept_async};
use tracing::debug;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on any single wait in a test.
const STEP_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// MockServer
// ============================================================================

/// A bound listener waiting for the client.
pub(crate) struct MockServer {
    listener: TcpListener,
    port: u16,
}

impl MockServer {
    /// Binds to a random loopback port.
    pub(crate) async fn bind() -> Self {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let listener = TcpListener::bind(addr).await.expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();
        debug!(port, "Mock server bound");
        Self { listener, port }
    }

    /// Binds to the loopback port of a URL from [`dead_endpoint`](Self::dead_endpoint).
    pub(crate) async fn bind_to(url: &str) -> Self {
        let port = url::Url::parse(url)
            .ok()
            .and_then(|u| u.port())
            .expect("url carries a port");
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        let listener = TcpListener::bind(addr).await.expect("rebind loopback");
        debug!(port, "Mock server rebound");
        Self { listener, port }
    }

    /// Returns a `ws://` URL nothing listens on.
    pub(crate) async fn dead_endpoint() -> String {
        let server = Self::bind().await;
        let url = server.ws_url();
        drop(server);
        url
    }

    /// Format: `ws://127.0.0.1:{port}`
    pub(crate) fn ws_url(&self) -> String {
        format!("ws://127.0.0.1:{}", self.port)
    }

    /// Accepts the next client and completes the upgrade.
    pub(crate) async fn accept(&self) -> Peer {
        let (stream, addr) = timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .expect("client connects in time")
            .expect("tcp accept");
        debug!(?addr, "Mock server accepted");

        let ws = accept_async(stream).await.expect("websocket upgrade");
        Peer { ws }
    }
}

// ============================================================================
// Peer
// ============================================================================

/// Server side of one accepted connection.
pub(crate) struct Peer {
    ws: WebSocketStream<TcpStream>,
}

impl Peer {
    /// Next text frame as JSON.
    pub(crate) async fn recv_json(&mut self) -> Value {
        loop {
            let frame = timeout(STEP_TIMEOUT, self.ws.next())
                .await
                .expect("frame arrives in time")
                .expect("stream open")
                .expect("valid frame");

            if let WsMessage::Text(text) = frame {
                return serde_json::from_str(text.as_str()).expect("client sends JSON");
            }
        }
    }

    /// Next command named `name`, skipping anything else (e.g. pings).
    pub(crate) async fn recv_command(&mut self, name: &str) -> Value {
        loop {
            let value = self.recv_json().await;
            if value["command"] == name {
                return value;
            }
        }
    }

    /// Sends a JSON frame.
    pub(crate) async fn send_json(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    /// Sends text verbatim.
    pub(crate) async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(WsMessage::Text(text.to_owned().into()))
            .await
            .expect("send to client");
    }

    /// Closes with the given code.
    pub(crate) async fn close(mut self, code: CloseCode) {
        let frame = CloseFrame {
            code,
            reason: Utf8Bytes::from_static("server closing"),
        };
        let _ = self.ws.close(Some(frame)).await;
        // Drain until the client acknowledges.
        let _ = timeout(STEP_TIMEOUT, async { while self.ws.next().await.is_some() {} }).await;
    }

    /// Waits for the client's close frame and returns it.
    pub(crate) async fn expect_close(&mut self) -> Option<CloseFrame> {
        loop {
            match timeout(STEP_TIMEOUT, self.ws.next()).await.expect("close in time") {
                Some(Ok(WsMessage::Close(frame))) => return frame,
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return None,
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_random_port() {
        let server = MockServer::bind().await;
        assert!(server.port > 0);
        assert!(server.ws_url().starts_with("ws://127.0.0.1:"));
    }

    #[tokio::test]
    async fn test_bind_to_reuses_port() {
        let url = MockServer::dead_endpoint().await;
        let server = MockServer::bind_to(&url).await;
        assert_eq!(server.ws_url(), url);
    }

    #[tokio::test]
    async fn test_dead_endpoint_refuses() {
        let url = MockServer::dead_endpoint().await;
        let result = tokio_tungstenite::connect_async(url).await;
        assert!(result.is_err());
    }
}
