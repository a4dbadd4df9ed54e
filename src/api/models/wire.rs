//! Relay-level message envelope.
//!
//! The replication stream (`broadcast`) rides alongside room housekeeping:
//! presence notifications emitted by the relay, and the sync_request /
//! state_sync pair that lets a late-joining peer ask for a full snapshot.

use serde::{Deserialize, Serialize};

use super::operation::Operation;
use super::snapshot::DiagramSnapshot;

/// Presence transition fanned out by the relay when a peer joins or leaves a
/// room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceAction {
    Join,
    Leave,
}

/// One websocket frame on the room channel.
///
/// `from` is stamped by the relay (or the local hub) with the sender's peer
/// id; endpoints drop frames carrying their own id, since room fan-out
/// includes the sender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// A replication operation addressed to every peer in the room.
    Broadcast {
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        payload: Operation,
    },
    /// Room membership change.
    Presence {
        action: PresenceAction,
        peer: String,
    },
    /// A peer asking the room for a full diagram snapshot.
    SyncRequest {
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
    },
    /// A full snapshot answering a sync request.
    StateSync {
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        payload: DiagramSnapshot,
    },
}

impl WireMessage {
    /// The peer id this frame originated from, where known.
    pub fn sender(&self) -> Option<&str> {
        match self {
            WireMessage::Broadcast { from, .. }
            | WireMessage::SyncRequest { from }
            | WireMessage::StateSync { from, .. } => from.as_deref(),
            WireMessage::Presence { .. } => None,
        }
    }

    /// Re-stamp the origin peer id. Presence frames are relay-owned, carry no
    /// origin and pass through unchanged.
    pub fn stamped(self, peer_id: &str) -> Self {
        match self {
            WireMessage::Broadcast { payload, .. } => WireMessage::Broadcast {
                from: Some(peer_id.to_string()),
                payload,
            },
            WireMessage::SyncRequest { .. } => WireMessage::SyncRequest {
                from: Some(peer_id.to_string()),
            },
            WireMessage::StateSync { payload, .. } => WireMessage::StateSync {
                from: Some(peer_id.to_string()),
                payload,
            },
            other @ WireMessage::Presence { .. } => other,
        }
    }
}
