use serde::{Deserialize, Serialize};

use super::enums::RelationKind;
use super::geometry::Point;
use super::operation::LinkPayload;

/// Position of a label along its link: `distance` along the path (negative
/// values measure from the target end) and perpendicular `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelPosition {
    pub distance: f64,
    pub offset: f64,
}

/// A text label attached to a relationship, e.g. a multiplicity like `1..*`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkLabel {
    pub text: String,
    pub position: LabelPosition,
}

impl LinkLabel {
    pub fn new(text: impl Into<String>, distance: f64, offset: f64) -> Self {
        Self {
            text: text.into(),
            position: LabelPosition { distance, offset },
        }
    }
}

/// A typed relationship between two class nodes.
///
/// Endpoints are optional because a link can exist in a pending state while
/// the user is still dragging the free end; the `add_link` operation for it
/// is only emitted once both endpoints are bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub source: Option<String>,
    pub target: Option<String>,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    #[serde(default)]
    pub labels: Vec<LinkLabel>,
    #[serde(default)]
    pub vertices: Vec<Point>,
}

impl Relationship {
    pub fn new(
        id: String,
        source: Option<String>,
        target: Option<String>,
        kind: RelationKind,
        labels: Vec<LinkLabel>,
    ) -> Self {
        Self {
            id,
            source,
            target,
            kind,
            labels,
            vertices: Vec::new(),
        }
    }

    /// True while one of the endpoints is still unbound.
    pub fn is_pending(&self) -> bool {
        self.source.is_none() || self.target.is_none()
    }

    /// True once the link connects two concrete endpoints.
    pub fn is_bound(&self) -> bool {
        self.source.is_some() && self.target.is_some()
    }

    /// The `add_link` payload that recreates this relationship on a peer.
    pub fn to_payload(&self) -> LinkPayload {
        LinkPayload {
            kind: self.kind,
            labels: self.labels.clone(),
        }
    }
}
