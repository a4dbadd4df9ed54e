//! Local change observer: turns local diagram events into operations to
//! broadcast, coalescing high-frequency interactive events.
//!
//! Drag, resize and label-drag can fire far faster than a useful network
//! rate. Each entity gets a single pending-operation slot per event kind;
//! intermediate samples overwrite the slot, `on_frame` flushes whatever is
//! pending once per rendering frame, and the pointer-up sample is broadcast
//! unconditionally so the final geometry is never lost.

use std::collections::HashMap;

use crate::models::Operation;
use crate::services::diagram_service::{DiagramEvent, Origin, Phase};

/// Coalescing slot key. Move and resize coalesce per entity; label drags per
/// (link, label index).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PendingKey {
    Move(String),
    Resize(String),
    Label(String, usize),
}

impl PendingKey {
    fn entity_id(&self) -> &str {
        match self {
            PendingKey::Move(id) | PendingKey::Resize(id) | PendingKey::Label(id, _) => id,
        }
    }
}

/// Per-link protocol bookkeeping. Kept here, keyed by id, rather than as
/// transient flags on the domain entity.
#[derive(Debug, Default)]
struct LinkMeta {
    link_broadcast: bool,
}

/// Watches drained diagram events and converts qualifying local ones into
/// operations.
#[derive(Debug, Default)]
pub struct ChangeObserver {
    pending: HashMap<PendingKey, Operation>,
    link_meta: HashMap<String, LinkMeta>,
}

impl ChangeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one diagram event. Returns an operation to broadcast now, or
    /// `None` when the event is remote-origin, coalesced into a pending slot,
    /// or not yet emittable (pending link).
    pub fn observe(&mut self, event: DiagramEvent) -> Option<Operation> {
        if event.origin() == Origin::Remote {
            // Echo suppression: a mutation applied from a remote operation
            // must never become a new outbound operation. Link bookkeeping is
            // still recorded so a remotely created link is never re-announced.
            match &event {
                DiagramEvent::LinkAdded { id, .. } => {
                    self.link_meta
                        .insert(id.clone(), LinkMeta { link_broadcast: true });
                }
                DiagramEvent::Removed { id, .. } => self.forget(id),
                _ => {}
            }
            return None;
        }

        match event {
            DiagramEvent::ClassAdded { id, payload, .. } => {
                Some(Operation::AddClass { id, payload })
            }
            DiagramEvent::TextEdited {
                id, field, value, ..
            } => Some(Operation::EditText { id, field, value }),
            DiagramEvent::Moved { id, x, y, phase, .. } => {
                self.coalesce(PendingKey::Move(id.clone()), Operation::Move { id, x, y }, phase)
            }
            DiagramEvent::Resized { id, w, h, phase, .. } => self.coalesce(
                PendingKey::Resize(id.clone()),
                Operation::Resize { id, w, h },
                phase,
            ),
            DiagramEvent::LinkAdded {
                id,
                source,
                target,
                payload,
                ..
            }
            | DiagramEvent::EndpointBound {
                id,
                source,
                target,
                payload,
                ..
            } => self.try_announce_link(id, source, target, payload),
            DiagramEvent::Relinked {
                id, source, target, ..
            } => Some(Operation::MoveLink {
                id,
                source_id: source,
                target_id: target,
            }),
            DiagramEvent::VerticesChanged { id, vertices, .. } => {
                Some(Operation::UpdateVertices { id, vertices })
            }
            DiagramEvent::LabelInserted {
                link_id,
                index,
                label,
                ..
            } => Some(Operation::AddLabel {
                link_id,
                index,
                label,
            }),
            DiagramEvent::LabelEdited {
                link_id,
                index,
                text,
                ..
            } => Some(Operation::EditLabel {
                link_id,
                index,
                text,
            }),
            DiagramEvent::LabelMoved {
                link_id,
                index,
                position,
                phase,
                ..
            } => self.coalesce(
                PendingKey::Label(link_id.clone(), index),
                Operation::MoveLabel {
                    link_id,
                    index,
                    position,
                },
                phase,
            ),
            DiagramEvent::LabelRemoved { link_id, index, .. } => {
                // Indexes above the removed one shift down; any pending label
                // drag at or past it is stale now.
                self.pending.retain(|key, _| match key {
                    PendingKey::Label(id, i) => !(id == &link_id && *i >= index),
                    _ => true,
                });
                Some(Operation::DelLabel { link_id, index })
            }
            DiagramEvent::Removed { id, .. } => {
                self.forget(&id);
                Some(Operation::Delete { id })
            }
        }
    }

    /// Flush every non-empty pending slot: at most one message per frame per
    /// actively manipulated entity.
    pub fn flush_frame(&mut self) -> Vec<Operation> {
        self.pending.drain().map(|(_, op)| op).collect()
    }

    /// Number of occupied pending slots.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn coalesce(&mut self, key: PendingKey, op: Operation, phase: Phase) -> Option<Operation> {
        match phase {
            Phase::Drag => {
                // Only ever keep the latest sample; never a queue.
                self.pending.insert(key, op);
                None
            }
            Phase::Release => {
                // Guaranteed final flush: the authoritative value is sent
                // even if the last intermediate frame was dropped.
                self.pending.remove(&key);
                Some(op)
            }
        }
    }

    /// Emit `add_link` exactly once, the moment both endpoints are known.
    fn try_announce_link(
        &mut self,
        id: String,
        source: Option<String>,
        target: Option<String>,
        payload: crate::models::LinkPayload,
    ) -> Option<Operation> {
        let meta = self.link_meta.entry(id.clone()).or_default();
        if meta.link_broadcast {
            return None;
        }
        let (Some(source_id), Some(target_id)) = (source, target) else {
            return None;
        };
        meta.link_broadcast = true;
        Some(Operation::AddLink {
            id,
            source_id,
            target_id,
            payload,
        })
    }

    /// Drop all bookkeeping for a removed entity, including any pending
    /// coalescing slot, so a frame flush never emits for a deleted cell.
    fn forget(&mut self, id: &str) {
        self.link_meta.remove(id);
        self.pending.retain(|key, _| key.entity_id() != id);
    }
}
