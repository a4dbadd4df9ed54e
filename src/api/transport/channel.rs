//! In-process transport: a hub of room-keyed mpsc channels.
//!
//! Used by tests and by hosts embedding several sessions in one process. The
//! hub mirrors the relay's semantics: fan-out to every room member, sender
//! excluded, no delivery guarantees once a receiver is gone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};

use anyhow::{Result, anyhow};
use tracing::debug;
use uuid::Uuid;

use super::Transport;
use crate::models::WireMessage;

struct Endpoint {
    peer_id: String,
    sender: mpsc::Sender<WireMessage>,
}

#[derive(Default)]
struct HubInner {
    rooms: HashMap<String, Vec<Endpoint>>,
}

/// Shared room registry for [`ChannelTransport`] endpoints.
#[derive(Clone, Default)]
pub struct LocalHub {
    inner: Arc<Mutex<HubInner>>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn join(&self, room_id: &str, peer_id: &str) -> mpsc::Receiver<WireMessage> {
        let (tx, rx) = mpsc::channel();
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.rooms.entry(room_id.to_string()).or_default().push(Endpoint {
            peer_id: peer_id.to_string(),
            sender: tx,
        });
        debug!(room_id, peer_id, "peer joined local hub room");
        rx
    }

    fn leave(&self, room_id: &str, peer_id: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(members) = inner.rooms.get_mut(room_id) {
            members.retain(|m| m.peer_id != peer_id);
            // Drop the room entry once the last peer is gone.
            if members.is_empty() {
                inner.rooms.remove(room_id);
            }
        }
    }

    fn broadcast(&self, room_id: &str, from_peer: &str, message: &WireMessage) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let Some(members) = inner.rooms.get_mut(room_id) else {
            return;
        };
        // Prune members whose receiver is gone as we go.
        members.retain(|member| {
            if member.peer_id == from_peer {
                return true;
            }
            member.sender.send(message.clone()).is_ok()
        });
    }

    /// Number of peers currently in a room.
    pub fn room_size(&self, room_id: &str) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.rooms.get(room_id).map_or(0, Vec::len)
    }

    /// Number of rooms with at least one peer.
    pub fn room_count(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.rooms.len()
    }
}

/// One peer endpoint on a [`LocalHub`].
pub struct ChannelTransport {
    hub: LocalHub,
    peer_id: String,
    room_id: Option<String>,
    inbox: Option<mpsc::Receiver<WireMessage>>,
}

impl ChannelTransport {
    pub fn new(hub: LocalHub) -> Self {
        Self {
            hub,
            peer_id: Uuid::new_v4().to_string(),
            room_id: None,
            inbox: None,
        }
    }

    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }
}

impl Transport for ChannelTransport {
    fn init(&mut self, room_id: &str) -> Result<()> {
        let rx = self.hub.join(room_id, &self.peer_id);
        self.room_id = Some(room_id.to_string());
        self.inbox = Some(rx);
        Ok(())
    }

    fn send_to_all(&mut self, message: &WireMessage) -> Result<()> {
        let room_id = self
            .room_id
            .as_deref()
            .ok_or_else(|| anyhow!("transport not initialised"))?;
        let stamped = message.clone().stamped(&self.peer_id);
        self.hub.broadcast(room_id, &self.peer_id, &stamped);
        Ok(())
    }

    fn try_recv(&mut self) -> Option<WireMessage> {
        self.inbox.as_ref()?.try_recv().ok()
    }
}

impl Drop for ChannelTransport {
    fn drop(&mut self) {
        if let Some(room_id) = self.room_id.take() {
            self.hub.leave(&room_id, &self.peer_id);
        }
    }
}
