//! WebSocket control channel.
//!
//! [`MessageChannel`] is the seam the orchestrator talks through: send one
//! message, await the next inbound message, close. [`WsChannel`] implements
//! it over `tokio-tungstenite` against the discovered DevTools endpoint.
//!
//! Channel semantics:
//!
//! - `send` is fire-and-forget; correlation happens above, in the session
//! - `next_message` suspends until one complete text frame arrives, the
//!   channel closes, or the deadline elapses
//! - `close` is idempotent; any use after close fails with `ChannelClosed`

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// MessageChannel
// ============================================================================

/// A persistent bidirectional message channel.
///
/// Production code uses [`WsChannel`]; tests drive the orchestrator with a
/// scripted implementation.
#[async_trait]
pub trait MessageChannel: Send {
    /// Writes one outbound message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if invoked after close.
    async fn send(&mut self, text: String) -> Result<()>;

    /// Suspends until one complete inbound message is available.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if the channel closes first
    /// - [`Error::Timeout`] if `deadline` elapses first
    async fn next_message(&mut self, deadline: Duration) -> Result<String>;

    /// Releases channel resources. Idempotent.
    async fn close(&mut self) -> Result<()>;
}

// ============================================================================
// WsChannel
// ============================================================================

/// WebSocket implementation of [`MessageChannel`].
#[derive(Debug)]
pub struct WsChannel {
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WsChannel {
    /// Opens a channel to the given `ws://` endpoint.
    ///
    /// # Errors
    ///
    /// - [`Error::Connect`] on an invalid URL or refused connection
    /// - [`Error::Timeout`] if the handshake exceeds `deadline`
    pub async fn connect(endpoint: &str, deadline: Duration) -> Result<Self> {
        Url::parse(endpoint).map_err(|e| Error::connect(format!("{endpoint}: {e}")))?;

        match time::timeout(deadline, connect_async(endpoint)).await {
            Ok(Ok((stream, _response))) => {
                debug!(endpoint, "Control channel connected");
                Ok(Self {
                    stream: Some(stream),
                })
            }
            Ok(Err(e)) => Err(Error::connect(e.to_string())),
            Err(_) => Err(Error::timeout(
                "channel connect",
                deadline.as_millis() as u64,
            )),
        }
    }
}

#[async_trait]
impl MessageChannel for WsChannel {
    async fn send(&mut self, text: String) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::ChannelClosed)?;

        stream
            .send(Message::Text(text.into()))
            .await
            .map_err(map_ws_error)
    }

    async fn next_message(&mut self, deadline: Duration) -> Result<String> {
        let stream = self.stream.as_mut().ok_or(Error::ChannelClosed)?;

        let recv = async {
            loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                    Some(Ok(Message::Close(_))) | None => return Err(Error::ChannelClosed),
                    Some(Ok(other)) => trace!(?other, "Ignoring non-text frame"),
                    Some(Err(e)) => return Err(map_ws_error(e)),
                }
            }
        };

        match time::timeout(deadline, recv).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(
                "awaiting channel message",
                deadline.as_millis() as u64,
            )),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            // A close failure only means the peer is already gone.
            if let Err(e) = stream.close(None).await {
                debug!(error = %e, "Channel close handshake failed");
            }
            debug!("Control channel closed");
        }

        Ok(())
    }
}

/// Maps transport-level errors into the crate taxonomy.
fn map_ws_error(error: WsError) -> Error {
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => Error::ChannelClosed,
        other => Error::WebSocket(other),
    }
}

// ============================================================================
// Tests
// ============================================================================
