//! Live view WebSocket
//!
//! One socket per viewing client. Messages are JSON text frames tagged by
//! `event`:
//!
//! ```text
//! client → server   {"event":"start-live-view"}   {"event":"stop-live-view"}
//! server → client   {"event":"live-view-data","data":"<base64 jpeg>"}
//!                   {"event":"error","message":"..."}
//!                   {"event":"info","message":"..."}
//! ```
//!
//! Bare `start-live-view` / `stop-live-view` strings are accepted too.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::state::AppState;
use crate::driver::CameraDriver;
use crate::registry::SessionRegistry;
use crate::session::StreamEvent;

/// Command sent by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientCommand {
    /// Begin pushing frames
    StartLiveView,
    /// Stop pushing frames
    StopLiveView,
}

impl ClientCommand {
    /// Parse a text frame
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "start-live-view" => Some(Self::StartLiveView),
            "stop-live-view" => Some(Self::StopLiveView),
            other => serde_json::from_str(other).ok(),
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
enum WireEvent<'a> {
    LiveViewData { data: String },
    Error { message: &'a str },
    Info { message: &'a str },
}

/// Serialize an event as a JSON text frame
pub fn encode_event(event: &StreamEvent) -> serde_json::Result<String> {
    let wire = match event {
        StreamEvent::Frame(data) => WireEvent::LiveViewData {
            data: base64::engine::general_purpose::STANDARD.encode(data),
        },
        StreamEvent::Error(message) => WireEvent::Error { message },
        StreamEvent::Info(message) => WireEvent::Info { message },
    };
    serde_json::to_string(&wire)
}

/// WebSocket upgrade handler for `/live-view`
pub(super) async fn live_view_ws<D: CameraDriver>(
    State(state): State<AppState<D>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_live_view(socket, state.sessions, state.shutdown))
}

async fn handle_live_view<D: CameraDriver>(
    socket: WebSocket,
    sessions: Arc<SessionRegistry<D>>,
    shutdown: CancellationToken,
) {
    let (mut sender, mut receiver) = socket.split();

    let (sink, mut events) = sessions.event_channel();
    let conn = sessions.register(sink).await;

    tracing::info!(conn_id = %conn, "Live view client connected");

    // Forward session events to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match encode_event(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(conn_id = %conn, error = %e, "Failed to encode event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Dispatch client commands to the session registry
    let recv_sessions = Arc::clone(&sessions);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => match ClientCommand::parse(text.as_str()) {
                    Some(ClientCommand::StartLiveView) => {
                        // Failures were already sent to the client as events
                        let _ = recv_sessions.start_session(conn).await;
                    }
                    Some(ClientCommand::StopLiveView) => {
                        let _ = recv_sessions.stop_session(conn).await;
                    }
                    None => {
                        tracing::debug!(conn_id = %conn, message = %text.as_str(), "Unknown command");
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(conn_id = %conn, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
        _ = shutdown.cancelled() => {
            recv_task.abort();
            send_task.abort();
        }
    }

    sessions.on_disconnect(conn).await;
    tracing::info!(conn_id = %conn, "Live view client disconnected");
}
