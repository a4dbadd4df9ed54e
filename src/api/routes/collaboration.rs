//! WebSocket collaboration routes for real-time multi-peer editing.
//!
//! Relays operation frames between every peer connected to the same room.
//! Delivery is at-most-once and best-effort: frames are fanned out once with
//! no acknowledgement, no retry and no persistence.

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use super::app_state::AppState;
use crate::models::{PresenceAction, WireMessage};

/// Create collaboration router
pub fn collaboration_router() -> Router<AppState> {
    Router::new().route("/rooms/{room_id}/collaborate", get(handle_websocket))
}

/// Handle WebSocket upgrade and connection
async fn handle_websocket(
    Path(room_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    info!(room_id, "websocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state))
}

/// Handle one peer's WebSocket connection for the lifetime of its room
/// membership.
async fn handle_socket(socket: axum::extract::ws::WebSocket, room_id: String, state: AppState) {
    let peer_id = Uuid::new_v4().to_string();
    info!(room_id, peer_id, "websocket connected");

    let (mut sender, mut receiver) = socket.split();

    let tx = state.room_channel(&room_id).await;
    let mut rx = tx.subscribe();

    // Announce the newcomer to the room (the newcomer receives it too and
    // learns its own peer id is in play; clients may simply log presence).
    let _ = tx.send(WireMessage::Presence {
        action: PresenceAction::Join,
        peer: peer_id.clone(),
    });

    // Fan frames from the room channel out to this peer, skipping the frames
    // it sent itself.
    let peer_id_for_send = peer_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            if msg.sender() == Some(peer_id_for_send.as_str()) {
                continue;
            }
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender
                    .send(axum::extract::ws::Message::Text(json.into()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }
    });

    // Receive frames from this peer and fan them out to the room.
    let peer_id_for_recv = peer_id.clone();
    let room_id_for_recv = room_id.clone();
    let tx_for_recv = tx.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let axum::extract::ws::Message::Text(text) = msg {
                handle_peer_frame(&text, &peer_id_for_recv, &room_id_for_recv, &tx_for_recv);
            }
        }
    });

    // Either task finishing means the connection is done. Awaiting the
    // aborted task ensures its room subscription is dropped before the room
    // is considered for cleanup.
    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = (&mut recv_task) => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    let _ = tx.send(WireMessage::Presence {
        action: PresenceAction::Leave,
        peer: peer_id.clone(),
    });
    info!(room_id, peer_id, "websocket disconnected");

    drop(tx);
    state.release_room(&room_id).await;
}

/// Parse and relay one inbound text frame. A malformed frame is logged and
/// dropped; it must never take the connection down.
fn handle_peer_frame(
    text: &str,
    peer_id: &str,
    room_id: &str,
    tx: &broadcast::Sender<WireMessage>,
) {
    let msg: WireMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(room_id, peer_id, error = %e, "dropping malformed frame");
            return;
        }
    };

    // Presence frames are relay-owned; a peer cannot forge them.
    if matches!(msg, WireMessage::Presence { .. }) {
        warn!(room_id, peer_id, "dropping peer-sent presence frame");
        return;
    }

    let stamped = msg.stamped(peer_id);
    if tx.send(stamped).is_err() {
        // No subscribers left - that's okay.
    }
}
