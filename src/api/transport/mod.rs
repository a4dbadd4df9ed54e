//! Transport abstraction over a room-scoped peer data channel.
//!
//! Peer discovery, signaling and NAT traversal are a delivered capability of
//! the concrete transport; this layer only needs a send-to-all primitive and
//! an inbound drain. Delivery is at-most-once and best-effort: no
//! acknowledgements, no retry, and no ordering guarantee beyond per-sender
//! send order.

pub mod channel;

use anyhow::Result;

use crate::models::WireMessage;

/// A room-scoped data channel to every other peer in the room.
pub trait Transport {
    /// Join (or create) the room. Must complete before any send.
    fn init(&mut self, room_id: &str) -> Result<()>;

    /// Fire-and-forget fan-out to all currently connected peers.
    fn send_to_all(&mut self, message: &WireMessage) -> Result<()>;

    /// Pop the next inbound message, if any. Inbound frames preserve
    /// per-sender order; frames the transport echoed back to their own sender
    /// are already filtered out.
    fn try_recv(&mut self) -> Option<WireMessage>;
}

pub use channel::{ChannelTransport, LocalHub};
