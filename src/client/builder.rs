//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use camera_link::Client;
//!
//! # async fn example() -> camera_link::Result<()> {
//! let client = Client::builder()
//!     .endpoint("ws://192.168.1.50:8765")
//!     .build()?;
//! client.connect().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use rustls::crypto::CryptoProvider;
use tokio::runtime::Handle;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

use super::core::Client;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Server WebSocket URL.
    endpoint: Option<String>,
    /// Timing and capacity options.
    options: ClientOptions,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with default options and no endpoint.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server URL (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the reply timeout.
    #[inline]
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.options.request_timeout = timeout;
        self
    }

    /// Sets the keepalive period.
    #[inline]
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.options.heartbeat_interval = interval;
        self
    }

    /// Sets the base reconnect delay.
    #[inline]
    #[must_use]
    pub fn reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.options.reconnect_base_delay = delay;
        self
    }

    /// Sets the reconnect attempt cap.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.options.max_reconnect_attempts = attempts;
        self
    }

    /// Builds the client with validation.
    ///
    /// Must be called from within a Tokio runtime; the client's event loop
    /// is spawned here. The client starts disconnected.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is missing or not a `ws`/`wss` URL
    /// - [`Error::Config`] if a timeout, the heartbeat or the log capacity is zero
    /// - [`Error::Config`] if no Tokio runtime is running
    pub fn build(self) -> Result<Client> {
        let endpoint = self.validate_endpoint()?;
        self.validate_options()?;

        if endpoint.scheme() == "wss" {
            install_tls_provider();
        }

        let runtime = Handle::try_current().map_err(|_| {
            Error::config("Client::builder().build() must be called inside a Tokio runtime")
        })?;

        Ok(Client::spawn(&runtime, endpoint, self.options))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the endpoint URL.
    fn validate_endpoint(&self) -> Result<Url> {
        let raw = self.endpoint.as_deref().ok_or_else(|| {
            Error::config(
                "Endpoint is required. Use .endpoint() to set it.\n\
                 Example: Client::builder().endpoint(\"ws://127.0.0.1:8765\")",
            )
        })?;

        let url = Url::parse(raw)
            .map_err(|e| Error::config(format!("Invalid endpoint '{raw}': {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(Error::config(format!(
                "Endpoint scheme must be ws or wss, got '{other}'"
            ))),
        }
    }

    /// Validates timing and capacity options.
    fn validate_options(&self) -> Result<()> {
        let options = &self.options;

        if options.request_timeout.is_zero() {
            return Err(Error::config("request_timeout must be greater than zero"));
        }
        if options.connect_timeout.is_zero() {
            return Err(Error::config("connect_timeout must be greater than zero"));
        }
        if options.heartbeat_interval.is_zero() {
            return Err(Error::config("heartbeat_interval must be greater than zero"));
        }
        if options.log_capacity == 0 {
            return Err(Error::config("log_capacity must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// TLS
// ============================================================================

/// Installs the process-wide rustls provider unless one is already set.
fn install_tls_provider() {
    if CryptoProvider::get_default().is_some() {
        return;
    }
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok()
    {
        debug!("Installed ring TLS provider");
    }
}

// ============================================================================
// Tests
// ============================================================================
