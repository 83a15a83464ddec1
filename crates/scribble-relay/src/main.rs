//! Scribble WebSocket Relay Server
//!
//! Fans collaboration events out to everyone subscribed to the same named
//! channel and keeps a presence list per channel.
//!
//! ## Protocol
//!
//! Messages are the JSON forms of `scribble_core::sync::{ClientMessage, ServerMessage}`:
//! ```json
//! { "type": "join", "channel": "board-42", "userId": "u1", "name": "Ada" }
//! { "type": "publish", "event": { "type": "elements-update", "userId": "u1", "elements": [], "timestamp": 0 } }
//! { "type": "leave" }
//! ```

mod config;
mod state;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use config::RelayConfig;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use scribble_core::sync::{ClientMessage, ServerMessage};
use state::{AppState, Envelope};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scribble_relay=info,tower_http=info".into()),
        )
        .init();

    let config = RelayConfig::from_env();
    let state = Arc::new(AppState::new(config.replay_history));

    let app = Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = match tokio::net::TcpListener::bind(config.addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.addr, e);
            return;
        }
    };
    info!("Scribble relay listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);
    if !config.replay_history {
        info!("Channel history replay disabled");
    }

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }
}

async fn index() -> &'static str {
    "Scribble Relay Server - Connect via WebSocket at /ws"
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

type Sink = SplitSink<WebSocket, Message>;

/// Serialize and send one message. Returns false once the socket is gone.
async fn send(sender: &mut Sink, connection: &str, msg: &ServerMessage) -> bool {
    let json = match msg.to_json() {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to encode message for {}: {}", connection, e);
            return true;
        }
    };
    sender.send(Message::Text(json.into())).await.is_ok()
}

async fn send_error(sender: &mut Sink, connection: &str, message: String) -> bool {
    send(sender, connection, &ServerMessage::Error { message }).await
}

/// One WebSocket connection, subscribed to at most one channel at a time.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection = Uuid::new_v4().to_string();
    info!("New connection: {}", connection);

    let (mut sender, mut receiver) = socket.split();
    let mut current_channel: Option<String> = None;
    let mut channel_rx: Option<broadcast::Receiver<Envelope>> = None;

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let client_msg = match ClientMessage::from_json(text.as_str()) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("Invalid message from {}: {}", connection, e);
                                if !send_error(&mut sender, &connection, format!("Invalid message: {e}")).await {
                                    break;
                                }
                                continue;
                            }
                        };

                        match client_msg {
                            ClientMessage::Join { channel, user_id, name } => {
                                if let Some(old) = current_channel.take() {
                                    state.leave(&old, &connection);
                                }
                                let joined = state.join(&channel, &connection, &user_id, &name);
                                channel_rx = Some(joined.rx);
                                info!("{} ({}) joined channel {}", user_id, connection, channel);
                                current_channel = Some(channel);
                                if !send(&mut sender, &connection, &joined.reply).await {
                                    break;
                                }
                            }
                            ClientMessage::Leave => {
                                if let Some(channel) = current_channel.take() {
                                    state.leave(&channel, &connection);
                                    info!("{} left channel {}", connection, channel);
                                }
                                channel_rx = None;
                            }
                            ClientMessage::Publish { event } => {
                                let published = current_channel
                                    .as_deref()
                                    .is_some_and(|channel| state.publish(channel, &connection, event));
                                if !published
                                    && !send_error(&mut sender, &connection, "Join a channel before publishing".into()).await
                                {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        if !send_error(&mut sender, &connection, "Binary frames are not supported".into()).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", connection, e);
                        break;
                    }
                }
            }

            envelope = async {
                match &mut channel_rx {
                    Some(rx) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match envelope {
                    Ok(envelope) => {
                        if let Some(msg) = envelope.for_connection(&connection) {
                            if !send(&mut sender, &connection, &msg).await {
                                break;
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("{} lagged behind, dropped {} message(s)", connection, skipped);
                    }
                    Err(RecvError::Closed) => channel_rx = None,
                }
            }
        }
    }

    if let Some(channel) = current_channel {
        state.leave(&channel, &connection);
    }
    info!("Connection closed: {}", connection);
}
