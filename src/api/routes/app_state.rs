//! Application state management.
//!
//! The relay holds no diagram state at all: per room it keeps only a
//! broadcast channel fanning frames out to the connected peers.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};
use tracing::info;

use crate::models::WireMessage;

/// Buffered frames per room channel before lagging receivers drop messages.
const ROOM_CHANNEL_CAPACITY: usize = 1000;

/// Application state shared across all route handlers.
#[derive(Clone, Default)]
pub struct AppState {
    /// Room collaboration channels (room_id -> channel)
    pub rooms: Arc<Mutex<HashMap<String, broadcast::Sender<WireMessage>>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a room's channel if no peer is subscribed to it any more, so a
    /// long-running relay does not accumulate empty rooms.
    pub async fn release_room(&self, room_id: &str) {
        let mut rooms = self.rooms.lock().await;
        if let Some(tx) = rooms.get(room_id) {
            if tx.receiver_count() == 0 {
                rooms.remove(room_id);
                info!(room_id, "removed empty room channel");
            }
        }
    }

    /// Get or create the broadcast channel for a room.
    pub async fn room_channel(&self, room_id: &str) -> broadcast::Sender<WireMessage> {
        let mut rooms = self.rooms.lock().await;
        if let Some(tx) = rooms.get(room_id) {
            tx.clone()
        } else {
            let (tx, _rx) = broadcast::channel::<WireMessage>(ROOM_CHANNEL_CAPACITY);
            rooms.insert(room_id.to_string(), tx.clone());
            info!(room_id, "created broadcast channel for room");
            tx
        }
    }
}
