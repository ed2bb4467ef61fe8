//! WebSocket Stream of Zone Events
//!
//! Pushes every emitted `EventEnvelope` to connected clients as JSON text
//! frames, optionally narrowed to one event category or one chain.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use super::server::SharedAppState;
use crate::events::EventEnvelope;

#[derive(Debug, Default, Deserialize)]
pub struct StreamFilter {
    pub category: Option<String>,
    pub chain_id: Option<String>,
}

impl StreamFilter {
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |c| envelope.category == c);
        let chain_ok = self
            .chain_id
            .as_deref()
            .map_or(true, |c| envelope.event.chain_id() == c);
        category_ok && chain_ok
    }
}

/// WebSocket upgrade handler
///
/// Route: /ws/events?category=&chain_id=
pub async fn ws_events_handler(
    ws: WebSocketUpgrade,
    Query(filter): Query<StreamFilter>,
    State(app): State<SharedAppState>,
) -> impl IntoResponse {
    let rx = app.events().subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, filter, rx))
}

async fn handle_socket(
    socket: WebSocket,
    filter: StreamFilter,
    mut rx: tokio::sync::broadcast::Receiver<EventEnvelope>,
) {
    let (mut sender, mut receiver) = socket.split();

    let send_task = tokio::spawn(async move {
        loop {
            let envelope = match rx.recv().await {
                Ok(envelope) => envelope,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "stakeibc::api", skipped, "event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if !filter.matches(&envelope) {
                continue;
            }

            let json = match serde_json::to_string(&envelope) {
                Ok(j) => j,
                Err(_) => continue,
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }
}
