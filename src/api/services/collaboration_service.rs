//! Collaboration service: the broadcast gate on the outbound side and the
//! guarded applier on the inbound side.
//!
//! The single most important invariant here is echo suppression: every
//! remote application passes `Origin::Remote` into the diagram surface, and
//! the drained events of such a mutation are never turned back into outbound
//! operations. Without that, two peers ping-pong the same change forever.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::models::{Operation, PresenceAction, WireMessage};
use crate::services::change_observer::ChangeObserver;
use crate::services::diagram_service::{DiagramError, DiagramService, Origin, Phase};
use crate::transport::Transport;

/// One peer's collaboration session for a single room.
pub struct CollaborationService<T: Transport> {
    transport: T,
    observer: ChangeObserver,
    room_id: Option<String>,
    ready: bool,
}

impl<T: Transport> CollaborationService<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            observer: ChangeObserver::new(),
            room_id: None,
            ready: false,
        }
    }

    /// Join a room. Only after this completes does `broadcast` forward
    /// anything to the transport.
    pub fn init(&mut self, room_id: &str) -> Result<()> {
        self.transport.init(room_id)?;
        self.room_id = Some(room_id.to_string());
        self.ready = true;
        info!(room_id, "collaboration session ready");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Send one operation to every peer in the room. Before `init` completes
    /// this is a silent no-op: early operations are dropped, not queued.
    pub fn broadcast(&mut self, op: Operation) {
        if !self.ready {
            return;
        }
        let message = WireMessage::Broadcast {
            from: None,
            payload: op,
        };
        if let Err(e) = self.transport.send_to_all(&message) {
            // Fire-and-forget: a failed send is not retried at this layer.
            warn!(error = %e, "failed to broadcast operation");
        }
    }

    /// Ask the room for a full diagram snapshot. Extension point for peers
    /// that joined after the diagram already had content; any peer holding
    /// state answers with a `state_sync` frame.
    pub fn request_full_sync(&mut self) {
        if !self.ready {
            return;
        }
        if let Err(e) = self
            .transport
            .send_to_all(&WireMessage::SyncRequest { from: None })
        {
            warn!(error = %e, "failed to request full sync");
        }
    }

    /// Drain the diagram's change events through the observer, broadcasting
    /// whatever qualifies for immediate send.
    pub fn pump_local(&mut self, diagram: &mut DiagramService) {
        for event in diagram.take_events() {
            if let Some(op) = self.observer.observe(event) {
                self.broadcast(op);
            }
        }
    }

    /// Frame tick: flush coalesced drag/resize/label-drag slots, at most one
    /// message per frame per manipulated entity.
    pub fn on_frame(&mut self) {
        for op in self.observer.flush_frame() {
            self.broadcast(op);
        }
    }

    /// Drain inbound transport messages and apply them.
    pub fn pump_remote(&mut self, diagram: &mut DiagramService) {
        while let Some(message) = self.transport.try_recv() {
            match message {
                WireMessage::Broadcast { payload, .. } => self.apply_remote(diagram, payload),
                WireMessage::Presence { action, peer } => match action {
                    PresenceAction::Join => info!(peer, "peer joined room"),
                    PresenceAction::Leave => info!(peer, "peer left room"),
                },
                WireMessage::SyncRequest { from } => {
                    debug!(?from, "sync request received, sending state sync");
                    let snapshot = diagram.export_snapshot();
                    if let Err(e) = self.transport.send_to_all(&WireMessage::StateSync {
                        from: None,
                        payload: snapshot,
                    }) {
                        warn!(error = %e, "failed to answer sync request");
                    }
                }
                WireMessage::StateSync { payload, .. } => {
                    diagram.import_snapshot(payload, Origin::Remote);
                    self.drain_remote_events(diagram);
                }
            }
        }
    }

    /// Apply one remote operation, guarded against every form of staleness.
    /// Nothing applied here is ever re-broadcast, and no failure propagates:
    /// one malformed or stale operation must never take down the session.
    pub fn apply_remote(&mut self, diagram: &mut DiagramService, op: Operation) {
        let outcome = Self::dispatch(diagram, op.clone());
        match outcome {
            Ok(()) => {}
            // Redelivery or out-of-order duplicate: already have this entity.
            Err(e @ (DiagramError::DuplicateId { .. } | DiagramError::IdReused { .. })) => {
                warn!(id = op.target_id(), op = ?op, "ignoring duplicate creation: {e}");
            }
            // The entity was deleted (or never created) locally; expected
            // under concurrent editing, converges as further operations land.
            Err(DiagramError::UnknownCell { .. }
            | DiagramError::NotAClass { .. }
            | DiagramError::NotALink { .. }) => {
                debug!(id = op.target_id(), op = ?op, "remote operation targets a missing cell, skipped");
            }
            // Concurrent label edits shifted or removed labels in between.
            Err(e @ DiagramError::LabelIndexOutOfRange { .. }) => {
                warn!(id = op.target_id(), op = ?op, "ignoring stale label operation: {e}");
            }
        }
        self.drain_remote_events(diagram);
    }

    fn dispatch(diagram: &mut DiagramService, op: Operation) -> Result<(), DiagramError> {
        match op {
            Operation::AddClass { id, payload } => diagram
                .create_class(payload, Some(id), Origin::Remote)
                .map(|_| ()),
            Operation::EditText { id, field, value } => {
                diagram.set_text(&id, field, &value, Origin::Remote)
            }
            Operation::Move { id, x, y } => {
                diagram.move_cell(&id, x, y, Origin::Remote, Phase::Release)
            }
            Operation::Resize { id, w, h } => diagram.resize_cell(
                &id,
                w,
                h,
                Origin::Remote,
                Phase::Release,
            ),
            Operation::AddLink {
                id,
                source_id,
                target_id,
                payload,
            } => diagram
                .create_relationship(
                    Some(id),
                    &source_id,
                    &target_id,
                    payload.kind,
                    payload.labels,
                    Origin::Remote,
                )
                .map(|_| ()),
            Operation::MoveLink {
                id,
                source_id,
                target_id,
            } => diagram.relink(&id, &source_id, &target_id, Origin::Remote),
            Operation::UpdateVertices { id, vertices } => {
                diagram.set_vertices(&id, vertices, Origin::Remote)
            }
            Operation::AddLabel {
                link_id,
                index,
                label,
            } => diagram.insert_label(&link_id, index, label, Origin::Remote),
            Operation::EditLabel {
                link_id,
                index,
                text,
            } => diagram.set_label_text(&link_id, index, &text, Origin::Remote),
            Operation::MoveLabel {
                link_id,
                index,
                position,
            } => diagram.move_label(
                &link_id,
                index,
                position,
                Origin::Remote,
                Phase::Release,
            ),
            Operation::DelLabel { link_id, index } => {
                diagram.remove_label(&link_id, index, Origin::Remote)
            }
            Operation::Delete { id } => {
                // Idempotent delete: absent id is simply a no-op.
                diagram.remove_cell(&id, Origin::Remote);
                Ok(())
            }
        }
    }

    /// Route remote-origin events through the observer so its bookkeeping
    /// stays current. None of them produce outbound operations.
    fn drain_remote_events(&mut self, diagram: &mut DiagramService) {
        for event in diagram.take_events() {
            if let Some(op) = self.observer.observe(event) {
                // Only local-origin events can reach here; remote application
                // interleaved with unpumped local edits still broadcasts them.
                self.broadcast(op);
            }
        }
    }
}
