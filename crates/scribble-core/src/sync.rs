//! Wire protocol and WebSocket client for collaboration.
//!
//! Messages are JSON objects tagged by `"type"`:
//!
//! ```json
//! { "type": "join", "channel": "board-42", "userId": "u1", "name": "Ada" }
//! { "type": "publish", "event": { "type": "cursor-move", "userId": "u1", "x": 10, "y": 20, "timestamp": 0 } }
//! { "type": "presence", "members": [{ "id": "u1", "name": "Ada", "color": "#ef4444" }] }
//! ```
//!
//! The channel is best effort: messages may be dropped or arrive late, and
//! nothing here reorders or deduplicates them.

use crate::element::Element;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Milliseconds since the Unix epoch (0 if the clock is before it).
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// A connected participant, as reported by presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    /// Display name.
    pub name: String,
    /// Color assigned by the relay, CSS hex.
    pub color: String,
}

/// Payload broadcast to everyone in a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChannelEvent {
    /// Full snapshot of the sender's element collection.
    #[serde(rename_all = "camelCase")]
    ElementsUpdate {
        user_id: String,
        elements: Vec<Element>,
        timestamp: u64,
    },
    /// Sender's cursor position in world coordinates.
    #[serde(rename_all = "camelCase")]
    CursorMove {
        user_id: String,
        x: f64,
        y: f64,
        timestamp: u64,
    },
}

impl ChannelEvent {
    /// Id of the user who produced this event.
    pub fn user_id(&self) -> &str {
        match self {
            ChannelEvent::ElementsUpdate { user_id, .. } | ChannelEvent::CursorMove { user_id, .. } => user_id,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            ChannelEvent::ElementsUpdate { timestamp, .. } | ChannelEvent::CursorMove { timestamp, .. } => *timestamp,
        }
    }
}

/// Messages sent to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to a channel.
    #[serde(rename_all = "camelCase")]
    Join {
        channel: String,
        user_id: String,
        name: String,
    },
    /// Unsubscribe from the current channel.
    Leave,
    /// Broadcast an event to the other members.
    Publish { event: ChannelEvent },
}

/// Messages received from the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Join confirmed.
    Joined {
        channel: String,
        members: Vec<Member>,
        /// Most recent elements update in the channel, for late joiners.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replay: Option<ChannelEvent>,
    },
    /// Membership changed; carries the complete member list.
    Presence { members: Vec<Member> },
    /// An event published by another member.
    Message { from: String, event: ChannelEvent },
    /// Error message.
    Error { message: String },
}

/// Errors from encoding/decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl ClientMessage {
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerMessage {
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events from the WebSocket client
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// Connected to server
    Connected,
    /// Disconnected from server
    Disconnected,
    /// A server message arrived
    Received(ServerMessage),
    /// Error occurred
    Error { message: String },
}

/// Transport-level failures. Callers log these; they never block drawing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
}

/// Anything that can carry outgoing JSON frames to the relay.
pub trait Transport {
    fn send(&self, msg: &str) -> Result<(), TransportError>;
}

// ============================================================================
// Native WebSocket Client
// ============================================================================

mod native_client {
    use super::*;
    use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;
    use tungstenite::{Message, connect};
    use url::Url;

    /// Commands sent to the WebSocket thread.
    enum WsCommand {
        Send(String),
        Close,
    }

    /// WebSocket client for native platforms.
    ///
    /// Uses a background thread for non-blocking operation; events are
    /// collected and must be polled via `poll_events()`.
    pub struct NativeWebSocket {
        state: ConnectionState,
        events: Vec<SyncEvent>,
        /// Channel to send commands to the WebSocket thread.
        cmd_tx: Option<Sender<WsCommand>>,
        /// Channel to receive events from the WebSocket thread.
        event_rx: Option<Receiver<SyncEvent>>,
        /// Handle to the WebSocket thread.
        _thread: Option<JoinHandle<()>>,
    }

    impl NativeWebSocket {
        /// Create a new disconnected WebSocket client.
        pub fn new() -> Self {
            Self {
                state: ConnectionState::Disconnected,
                events: Vec::new(),
                cmd_tx: None,
                event_rx: None,
                _thread: None,
            }
        }

        /// Connect to a relay server.
        pub fn connect(&mut self, url: &str) -> Result<(), TransportError> {
            if self.cmd_tx.is_some() {
                return Err(TransportError::AlreadyConnected);
            }

            let parsed_url = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
            if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
                return Err(TransportError::InvalidUrl(format!(
                    "unsupported scheme {}",
                    parsed_url.scheme()
                )));
            }

            self.state = ConnectionState::Connecting;

            let (cmd_tx, cmd_rx) = channel::<WsCommand>();
            let (event_tx, event_rx) = channel::<SyncEvent>();
            let url = url.to_string();

            let handle = thread::spawn(move || run_socket(&url, &cmd_rx, &event_tx));

            self.cmd_tx = Some(cmd_tx);
            self.event_rx = Some(event_rx);
            self._thread = Some(handle);

            Ok(())
        }

        /// Disconnect from the server.
        pub fn disconnect(&mut self) {
            if let Some(tx) = self.cmd_tx.take() {
                let _ = tx.send(WsCommand::Close);
            }
            self.event_rx = None;
            self._thread = None;
            self.state = ConnectionState::Disconnected;
        }

        /// Poll for pending events (non-blocking).
        ///
        /// Once the socket thread reports a disconnect or error, or goes
        /// away silently, the client drops its channels so `connect` can be
        /// called again.
        pub fn poll_events(&mut self) -> Vec<SyncEvent> {
            let mut finished = false;
            if let Some(ref rx) = self.event_rx {
                loop {
                    match rx.try_recv() {
                        Ok(event) => {
                            match &event {
                                SyncEvent::Connected => self.state = ConnectionState::Connected,
                                SyncEvent::Disconnected => {
                                    self.state = ConnectionState::Disconnected;
                                    finished = true;
                                }
                                SyncEvent::Error { .. } => {
                                    self.state = ConnectionState::Error;
                                    finished = true;
                                }
                                SyncEvent::Received(_) => {}
                            }
                            self.events.push(event);
                        }
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => {
                            if self.state != ConnectionState::Error {
                                self.state = ConnectionState::Disconnected;
                            }
                            finished = true;
                            break;
                        }
                    }
                }
            }

            if finished {
                log::debug!("WebSocket thread finished, client can reconnect");
                self.cmd_tx = None;
                self.event_rx = None;
                self._thread = None;
            }

            std::mem::take(&mut self.events)
        }

        /// Get current connection state.
        pub fn state(&self) -> ConnectionState {
            self.state
        }

        /// Check if connected.
        pub fn is_connected(&self) -> bool {
            self.state == ConnectionState::Connected
        }
    }

    impl Transport for NativeWebSocket {
        fn send(&self, msg: &str) -> Result<(), TransportError> {
            let tx = self.cmd_tx.as_ref().ok_or(TransportError::NotConnected)?;
            tx.send(WsCommand::Send(msg.to_string()))
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        }
    }

    impl Default for NativeWebSocket {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Drop for NativeWebSocket {
        fn drop(&mut self) {
            self.disconnect();
        }
    }

    /// Body of the socket thread: pump commands out and frames in until
    /// either side closes.
    fn run_socket(url: &str, cmd_rx: &Receiver<WsCommand>, event_tx: &Sender<SyncEvent>) {
        log::info!("WebSocket thread: connecting to {url}");

        let mut socket = match connect(url) {
            Ok((socket, response)) => {
                log::info!("WebSocket connected, status: {}", response.status());
                socket
            }
            Err(e) => {
                log::error!("WebSocket connection failed: {e}");
                let _ = event_tx.send(SyncEvent::Error {
                    message: format!("Connection failed: {e}"),
                });
                return;
            }
        };
        let _ = event_tx.send(SyncEvent::Connected);

        // Short read timeout so outgoing commands are not starved
        if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }

        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::warn!("WebSocket send error: {e}");
                        break;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("WebSocket close requested");
                    let _ = socket.close(None);
                    break;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("WebSocket command channel disconnected");
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            match socket.read() {
                Ok(Message::Text(txt)) => match ServerMessage::from_json(&txt) {
                    Ok(msg) => {
                        let _ = event_tx.send(SyncEvent::Received(msg));
                    }
                    Err(e) => log::warn!("Failed to parse server message: {e}"),
                },
                Ok(Message::Ping(data)) => {
                    let _ = socket.send(Message::Pong(data));
                }
                Ok(Message::Close(_)) => {
                    log::info!("WebSocket received close frame");
                    break;
                }
                Ok(_) => {}
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => {
                    log::error!("WebSocket read error: {e}");
                    break;
                }
            }
        }

        log::info!("WebSocket thread exiting");
        let _ = event_tx.send(SyncEvent::Disconnected);
    }
}

pub use native_client::NativeWebSocket;
