//! Receive-only WebSocket channel for replies the backend pushes.
//!
//! The connection runs in a background task and reports everything it sees as
//! [`ChannelEvent`]s, in arrival order. Nothing is ever written to the socket
//! and a dropped connection is not re-established.

use futures::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::ChannelError;

/// Lifecycle and data events from the duplex channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Opened,
    /// One inbound text frame, decoded.
    Frame(Value),
    Closed,
    /// The transport failed. Always followed by `Closed`.
    Failed(String),
}

/// Handle to a running duplex connection. Dropping it closes the connection.
pub struct DuplexChannel {
    url: String,
    task: JoinHandle<()>,
}

impl DuplexChannel {
    /// Connect to `url` in the background.
    ///
    /// Must be called from within a tokio runtime. Events arrive on the
    /// returned receiver; it yields `None` once the connection is gone.
    pub fn open(url: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<ChannelEvent>) {
        let url = url.into();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(url.clone(), event_tx));
        (Self { url, task }, event_rx)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Tear down the connection. No further events are delivered.
    pub fn close(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DuplexChannel {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(url: String, event_tx: mpsc::UnboundedSender<ChannelEvent>) {
    log::info!("Connecting duplex channel to {}", url);

    if let Err(e) = receive(&url, &event_tx).await {
        log::warn!("Duplex channel error: {}", e);
        let _ = event_tx.send(ChannelEvent::Failed(e.to_string()));
    }

    log::info!("Duplex channel closed");
    let _ = event_tx.send(ChannelEvent::Closed);
}

async fn receive(
    url: &str,
    event_tx: &mpsc::UnboundedSender<ChannelEvent>,
) -> Result<(), ChannelError> {
    let (mut stream, _response) = connect_async(url).await?;
    if event_tx.send(ChannelEvent::Opened).is_err() {
        return Ok(());
    }

    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Text(text) => {
                let frame = ChannelEvent::Frame(decode_frame(text.as_str()));
                if event_tx.send(frame).is_err() {
                    // Receiver gone, nobody is listening anymore.
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    Ok(())
}

/// Decode a text frame. Text that isn't JSON is kept as a JSON string so the
/// frame still reaches the conversation exactly once.
pub fn decode_frame(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|e| {
        log::warn!("Duplex frame is not JSON ({}), passing through as text", e);
        Value::String(text.to_string())
    })
}

// ============================================================================
// TESTS
// ============================================================================
