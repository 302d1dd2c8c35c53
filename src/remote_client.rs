//! Companion-device side of the control channel.
//!
//! Connects to the relay over WebSocket, waits for the greeting and sends
//! commands. Connection attempts are retried on a fixed delay, the same
//! cadence a browser remote uses to reload after losing its socket.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::protocol::{CommandKind, RemoteMessage};

pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct RemoteClient {
    stream: WsStream,
}

impl RemoteClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .with_context(|| format!("failed to connect to {url}"))?;
        Ok(Self { stream })
    }

    /// Try to connect up to `attempts` times, sleeping `delay` between
    /// failures.
    pub async fn connect_with_retry(url: &str, attempts: usize, delay: Duration) -> Result<Self> {
        let mut last_err = None;
        for attempt in 1..=attempts.max(1) {
            match Self::connect(url).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    warn!("Relay connect failed: attempt={} err={:#}", attempt, e);
                    last_err = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no connection attempts made")))
    }

    /// Wait for the relay's `connected` greeting, skipping anything else.
    pub async fn wait_connected(&mut self) -> Result<()> {
        while let Some(message) = self.next_message().await? {
            if message == RemoteMessage::Connected {
                return Ok(());
            }
        }
        bail!("relay closed before greeting")
    }

    pub async fn send(&mut self, message: &RemoteMessage) -> Result<()> {
        self.stream
            .send(Message::text(message.to_json()))
            .await
            .context("failed to send to relay")
    }

    pub async fn send_command(&mut self, command: CommandKind) -> Result<()> {
        self.send(&RemoteMessage::Command { command }).await
    }

    /// Next protocol message from another peer. Payloads that are not a
    /// known message are skipped. `Ok(None)` once the relay closes.
    pub async fn next_message(&mut self) -> Result<Option<RemoteMessage>> {
        while let Some(frame) = self.stream.next().await {
            match frame.context("relay connection failed")? {
                Message::Text(text) => match RemoteMessage::from_json(text.as_str()) {
                    Ok(message) => return Ok(Some(message)),
                    Err(e) => debug!("Ignoring unknown relay payload: {} ({})", text, e),
                },
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await.context("failed to close relay connection")
    }
}
