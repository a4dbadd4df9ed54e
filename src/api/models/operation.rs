//! The closed set of mutation operations exchanged between peers.
//!
//! One variant per mutation kind, tagged on the wire by a `t` field. There is
//! deliberately no timestamp, sequence number or version vector anywhere in
//! this format: conflict resolution is last-writer-wins per field, so a peer
//! simply applies whatever arrives last.

use serde::{Deserialize, Serialize};

use super::enums::{RelationKind, TextField};
use super::geometry::{Point, Size};
use super::relationship::{LabelPosition, LinkLabel};

/// Payload carried by `add_class`: everything needed to materialise the class
/// on a peer that has never seen it.
///
/// The `attributes` and `methods` compartments are newline-joined strings,
/// matching the single string value carried by `edit_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPayload {
    pub name: String,
    pub position: Point,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub attributes: String,
    #[serde(default)]
    pub methods: String,
}

/// Payload carried by `add_link`: the relationship kind plus its initial
/// label set (e.g. the default multiplicity labels).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPayload {
    #[serde(rename = "type")]
    pub kind: RelationKind,
    #[serde(default)]
    pub labels: Vec<LinkLabel>,
}

/// One discrete, serializable mutation intent.
///
/// Ids are opaque strings assigned at creation time, either generated locally
/// or carried over from the creating peer, and are never reused after
/// deletion. Label indexes are only meaningful against the *current* label
/// sequence of a link; appliers bounds-check them before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Operation {
    /// A new class node appeared.
    AddClass { id: String, payload: ClassPayload },
    /// A text compartment changed.
    EditText {
        id: String,
        field: TextField,
        value: String,
    },
    /// Element repositioned.
    Move { id: String, x: f64, y: f64 },
    /// Element resized.
    Resize { id: String, w: f64, h: f64 },
    /// A new relationship appeared; emitted exactly once, the moment both
    /// endpoints are known.
    #[serde(rename_all = "camelCase")]
    AddLink {
        id: String,
        source_id: String,
        target_id: String,
        payload: LinkPayload,
    },
    /// Relationship re-anchored to different endpoints.
    #[serde(rename_all = "camelCase")]
    MoveLink {
        id: String,
        source_id: String,
        target_id: String,
    },
    /// Relationship routing path changed.
    UpdateVertices { id: String, vertices: Vec<Point> },
    /// A new label inserted into a relationship at `index`.
    #[serde(rename_all = "camelCase")]
    AddLabel {
        link_id: String,
        index: usize,
        label: LinkLabel,
    },
    /// Label text changed.
    #[serde(rename_all = "camelCase")]
    EditLabel {
        link_id: String,
        index: usize,
        text: String,
    },
    /// Label position along the link changed.
    #[serde(rename_all = "camelCase")]
    MoveLabel {
        link_id: String,
        index: usize,
        position: LabelPosition,
    },
    /// Label removed.
    #[serde(rename_all = "camelCase")]
    DelLabel { link_id: String, index: usize },
    /// Element or relationship removed.
    Delete { id: String },
}

impl Operation {
    /// The id of the entity this operation targets, for logging.
    pub fn target_id(&self) -> &str {
        match self {
            Operation::AddClass { id, .. }
            | Operation::EditText { id, .. }
            | Operation::Move { id, .. }
            | Operation::Resize { id, .. }
            | Operation::AddLink { id, .. }
            | Operation::MoveLink { id, .. }
            | Operation::UpdateVertices { id, .. }
            | Operation::Delete { id } => id,
            Operation::AddLabel { link_id, .. }
            | Operation::EditLabel { link_id, .. }
            | Operation::MoveLabel { link_id, .. }
            | Operation::DelLabel { link_id, .. } => link_id,
        }
    }
}
