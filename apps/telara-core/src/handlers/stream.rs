// [apps/telara-core/src/handlers/stream.rs]
//! C10's WebSocket surface: upgrade, send the `initial_state` replay, then
//! fan out broadcast hub messages to the connection until it is evicted
//! (slow-consumer timeout, socket error, or client close).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use telara_event_models::{ClientMessage, ServerMessage};
use tokio::time::interval;
use tracing::{debug, instrument, warn};

use crate::broadcast::{send_with_timeout, HEARTBEAT_INTERVAL};
use crate::state::AppState;

#[instrument(skip(ws, state))]
pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// One WebSocket connection's lifetime: send `initial_state`, then relay
/// every broadcast hub message, applying the per-send timeout from C10's
/// slow-consumer policy. No backpressure is ever applied to the hub — a
/// connection that can't keep up is dropped, not throttled.
async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut messages = state.broadcast_hub.subscribe();

    let source_stats = state.source_registry.status();
    let initial = state.broadcast_hub.initial_state(source_stats);
    if !send_json(&mut sender, &ServerMessage::InitialState(initial)).await {
        return;
    }

    let mut last_client_activity = tokio::time::Instant::now();
    let mut heartbeat = interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // first tick fires immediately; discard it

    loop {
        tokio::select! {
            incoming = messages.recv() => {
                match incoming {
                    Ok(message) => {
                        if !send_json(&mut sender, &message).await {
                            debug!("evicting slow or closed connection");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("connection lagged by {missed} broadcast messages");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            client_frame = receiver.next() => {
                match client_frame {
                    Some(Ok(Message::Text(text))) => {
                        last_client_activity = tokio::time::Instant::now();
                        if let Ok(ClientMessage::Ping) = serde_json::from_str::<ClientMessage>(&text) {
                            if !send_json(&mut sender, &ServerMessage::Pong).await {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => last_client_activity = tokio::time::Instant::now(),
                    Some(Err(e)) => {
                        warn!("websocket read error: {e}");
                        break;
                    }
                }
            }
            _ = heartbeat.tick() => {
                if last_client_activity.elapsed() >= HEARTBEAT_INTERVAL
                    && !send_json(&mut sender, &ServerMessage::Heartbeat).await
                {
                    break;
                }
            }
        }
    }
}

async fn send_json(sender: &mut SplitSink<WebSocket, Message>, message: &ServerMessage) -> bool {
    let Ok(text) = serde_json::to_string(message) else {
        return false;
    };
    send_with_timeout(|| async move { sender.send(Message::Text(text)).await.is_ok() }).await
}
