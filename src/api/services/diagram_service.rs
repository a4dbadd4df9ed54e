//! Diagram mutation surface: the in-memory entity graph the collaboration
//! layer reads and writes without depending on rendering internals.
//!
//! Every mutator takes an explicit [`Origin`] so a change applied from a
//! remote operation can be told apart from a genuine local edit. Mutations
//! record [`DiagramEvent`]s into an internal queue; the change observer
//! drains that queue and decides what to broadcast.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::{RelationKind, TextField};
use crate::models::geometry::Point;
use crate::models::operation::{ClassPayload, LinkPayload};
use crate::models::relationship::{LabelPosition, LinkLabel};
use crate::models::{DiagramSnapshot, Relationship, UmlClass};

/// Where a mutation originated. Remote-origin mutations are never
/// re-broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Local,
    Remote,
}

/// Whether an interactive geometry change is an intermediate pointer-move
/// sample or the authoritative pointer-up value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Drag,
    Release,
}

/// Diagram mutation failures. The surface itself never logs; callers decide
/// whether a failure is a user error or an expected staleness no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagramError {
    #[error("cell not found: {id}")]
    UnknownCell { id: String },
    #[error("cell already exists: {id}")]
    DuplicateId { id: String },
    #[error("id {id} was already deleted and cannot be reused")]
    IdReused { id: String },
    #[error("cell {id} is not a class")]
    NotAClass { id: String },
    #[error("cell {id} is not a link")]
    NotALink { id: String },
    #[error("label index {index} out of range for link {link_id} ({len} labels)")]
    LabelIndexOutOfRange {
        link_id: String,
        index: usize,
        len: usize,
    },
}

/// One entity in the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Class(UmlClass),
    Link(Relationship),
}

/// The entity collection. Sole owner of all geometry and text.
#[derive(Debug, Default)]
pub struct Graph {
    cells: HashMap<String, Cell>,
}

impl Graph {
    pub fn has_cell(&self, id: &str) -> bool {
        self.cells.contains_key(id)
    }

    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn class(&self, id: &str) -> Option<&UmlClass> {
        match self.cells.get(id) {
            Some(Cell::Class(c)) => Some(c),
            _ => None,
        }
    }

    pub fn link(&self, id: &str) -> Option<&Relationship> {
        match self.cells.get(id) {
            Some(Cell::Link(l)) => Some(l),
            _ => None,
        }
    }

    pub fn classes(&self) -> impl Iterator<Item = &UmlClass> {
        self.cells.values().filter_map(|c| match c {
            Cell::Class(class) => Some(class),
            Cell::Link(_) => None,
        })
    }

    pub fn links(&self) -> impl Iterator<Item = &Relationship> {
        self.cells.values().filter_map(|c| match c {
            Cell::Link(link) => Some(link),
            Cell::Class(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A mutation-relevant event raised by the surface, tagged with its origin.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramEvent {
    ClassAdded {
        id: String,
        payload: ClassPayload,
        origin: Origin,
    },
    TextEdited {
        id: String,
        field: TextField,
        value: String,
        origin: Origin,
    },
    Moved {
        id: String,
        x: f64,
        y: f64,
        origin: Origin,
        phase: Phase,
    },
    Resized {
        id: String,
        w: f64,
        h: f64,
        origin: Origin,
        phase: Phase,
    },
    /// A link was inserted, possibly still pending (free target end).
    LinkAdded {
        id: String,
        source: Option<String>,
        target: Option<String>,
        payload: LinkPayload,
        origin: Origin,
    },
    /// A pending link gained an endpoint.
    EndpointBound {
        id: String,
        source: Option<String>,
        target: Option<String>,
        payload: LinkPayload,
        origin: Origin,
    },
    /// A bound link was re-anchored to different endpoints.
    Relinked {
        id: String,
        source: String,
        target: String,
        origin: Origin,
    },
    VerticesChanged {
        id: String,
        vertices: Vec<Point>,
        origin: Origin,
    },
    LabelInserted {
        link_id: String,
        index: usize,
        label: LinkLabel,
        origin: Origin,
    },
    LabelEdited {
        link_id: String,
        index: usize,
        text: String,
        origin: Origin,
    },
    LabelMoved {
        link_id: String,
        index: usize,
        position: LabelPosition,
        origin: Origin,
        phase: Phase,
    },
    LabelRemoved {
        link_id: String,
        index: usize,
        origin: Origin,
    },
    Removed {
        id: String,
        origin: Origin,
    },
}

impl DiagramEvent {
    pub fn origin(&self) -> Origin {
        match self {
            DiagramEvent::ClassAdded { origin, .. }
            | DiagramEvent::TextEdited { origin, .. }
            | DiagramEvent::Moved { origin, .. }
            | DiagramEvent::Resized { origin, .. }
            | DiagramEvent::LinkAdded { origin, .. }
            | DiagramEvent::EndpointBound { origin, .. }
            | DiagramEvent::Relinked { origin, .. }
            | DiagramEvent::VerticesChanged { origin, .. }
            | DiagramEvent::LabelInserted { origin, .. }
            | DiagramEvent::LabelEdited { origin, .. }
            | DiagramEvent::LabelMoved { origin, .. }
            | DiagramEvent::LabelRemoved { origin, .. }
            | DiagramEvent::Removed { origin, .. } => *origin,
        }
    }
}

/// Service owning the diagram graph and its change-event queue.
#[derive(Debug, Default)]
pub struct DiagramService {
    graph: Graph,
    events: Vec<DiagramEvent>,
    /// Ids that have been deleted; ids are never reused afterwards.
    tombstones: HashSet<String>,
}

impl DiagramService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn has_cell(&self, id: &str) -> bool {
        self.graph.has_cell(id)
    }

    /// Drain the queued change events.
    pub fn take_events(&mut self) -> Vec<DiagramEvent> {
        std::mem::take(&mut self.events)
    }

    fn check_new_id(&self, id: &str) -> Result<(), DiagramError> {
        if self.tombstones.contains(id) {
            return Err(DiagramError::IdReused { id: id.to_string() });
        }
        if self.graph.has_cell(id) {
            return Err(DiagramError::DuplicateId { id: id.to_string() });
        }
        Ok(())
    }

    /// Create and insert a class. Returns the assigned id.
    pub fn create_class(
        &mut self,
        payload: ClassPayload,
        id: Option<String>,
        origin: Origin,
    ) -> Result<String, DiagramError> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.check_new_id(&id)?;

        let class = UmlClass::new(id.clone(), payload.clone());
        self.graph.cells.insert(id.clone(), Cell::Class(class));
        self.events.push(DiagramEvent::ClassAdded {
            id: id.clone(),
            payload,
            origin,
        });
        Ok(id)
    }

    /// Start a relationship from `source_id` with a free target end, as when
    /// the user drags out of a port. Returns the new link id.
    pub fn begin_relationship(
        &mut self,
        source_id: &str,
        kind: RelationKind,
        labels: Vec<LinkLabel>,
        origin: Origin,
    ) -> Result<String, DiagramError> {
        if !self.graph.has_cell(source_id) {
            return Err(DiagramError::UnknownCell {
                id: source_id.to_string(),
            });
        }
        let id = Uuid::new_v4().to_string();
        let link = Relationship::new(id.clone(), Some(source_id.to_string()), None, kind, labels);
        let payload = link.to_payload();
        self.graph.cells.insert(id.clone(), Cell::Link(link));
        self.events.push(DiagramEvent::LinkAdded {
            id: id.clone(),
            source: Some(source_id.to_string()),
            target: None,
            payload,
            origin,
        });
        Ok(id)
    }

    /// Bind the free target end of a pending link.
    pub fn attach_target(
        &mut self,
        link_id: &str,
        target_id: &str,
        origin: Origin,
    ) -> Result<(), DiagramError> {
        if !self.graph.has_cell(target_id) {
            return Err(DiagramError::UnknownCell {
                id: target_id.to_string(),
            });
        }
        let link = self.link_mut(link_id)?;
        link.target = Some(target_id.to_string());
        let (source, target, payload) = (link.source.clone(), link.target.clone(), link.to_payload());
        self.events.push(DiagramEvent::EndpointBound {
            id: link_id.to_string(),
            source,
            target,
            payload,
            origin,
        });
        Ok(())
    }

    /// Create a relationship with both endpoints known up front. This is the
    /// path taken when applying a remote `add_link`.
    pub fn create_relationship(
        &mut self,
        id: Option<String>,
        source_id: &str,
        target_id: &str,
        kind: RelationKind,
        labels: Vec<LinkLabel>,
        origin: Origin,
    ) -> Result<String, DiagramError> {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.check_new_id(&id)?;
        for endpoint in [source_id, target_id] {
            if !self.graph.has_cell(endpoint) {
                return Err(DiagramError::UnknownCell {
                    id: endpoint.to_string(),
                });
            }
        }

        let link = Relationship::new(
            id.clone(),
            Some(source_id.to_string()),
            Some(target_id.to_string()),
            kind,
            labels,
        );
        let payload = link.to_payload();
        self.graph.cells.insert(id.clone(), Cell::Link(link));
        self.events.push(DiagramEvent::LinkAdded {
            id: id.clone(),
            source: Some(source_id.to_string()),
            target: Some(target_id.to_string()),
            payload,
            origin,
        });
        Ok(id)
    }

    /// Change one text compartment of a class.
    pub fn set_text(
        &mut self,
        id: &str,
        field: TextField,
        value: &str,
        origin: Origin,
    ) -> Result<(), DiagramError> {
        let class = self.class_mut(id)?;
        match field {
            TextField::Name => class.name = value.to_string(),
            TextField::Attributes => class.attributes = value.to_string(),
            TextField::Methods => class.methods = value.to_string(),
        }
        self.events.push(DiagramEvent::TextEdited {
            id: id.to_string(),
            field,
            value: value.to_string(),
            origin,
        });
        Ok(())
    }

    /// Reposition a class.
    pub fn move_cell(
        &mut self,
        id: &str,
        x: f64,
        y: f64,
        origin: Origin,
        phase: Phase,
    ) -> Result<(), DiagramError> {
        let class = self.class_mut(id)?;
        class.position = Point::new(x, y);
        self.events.push(DiagramEvent::Moved {
            id: id.to_string(),
            x,
            y,
            origin,
            phase,
        });
        Ok(())
    }

    /// Resize a class.
    pub fn resize_cell(
        &mut self,
        id: &str,
        w: f64,
        h: f64,
        origin: Origin,
        phase: Phase,
    ) -> Result<(), DiagramError> {
        let class = self.class_mut(id)?;
        class.size.w = w;
        class.size.h = h;
        self.events.push(DiagramEvent::Resized {
            id: id.to_string(),
            w,
            h,
            origin,
            phase,
        });
        Ok(())
    }

    /// Re-anchor a bound link to different endpoints.
    pub fn relink(
        &mut self,
        id: &str,
        source_id: &str,
        target_id: &str,
        origin: Origin,
    ) -> Result<(), DiagramError> {
        for endpoint in [source_id, target_id] {
            if !self.graph.has_cell(endpoint) {
                return Err(DiagramError::UnknownCell {
                    id: endpoint.to_string(),
                });
            }
        }
        let link = self.link_mut(id)?;
        link.source = Some(source_id.to_string());
        link.target = Some(target_id.to_string());
        self.events.push(DiagramEvent::Relinked {
            id: id.to_string(),
            source: source_id.to_string(),
            target: target_id.to_string(),
            origin,
        });
        Ok(())
    }

    /// Replace a link's routing path.
    pub fn set_vertices(
        &mut self,
        id: &str,
        vertices: Vec<Point>,
        origin: Origin,
    ) -> Result<(), DiagramError> {
        let link = self.link_mut(id)?;
        link.vertices = vertices.clone();
        self.events.push(DiagramEvent::VerticesChanged {
            id: id.to_string(),
            vertices,
            origin,
        });
        Ok(())
    }

    /// Insert a label at `index` (index may equal the current label count).
    pub fn insert_label(
        &mut self,
        link_id: &str,
        index: usize,
        label: LinkLabel,
        origin: Origin,
    ) -> Result<(), DiagramError> {
        let link = self.link_mut(link_id)?;
        if index > link.labels.len() {
            return Err(DiagramError::LabelIndexOutOfRange {
                link_id: link_id.to_string(),
                index,
                len: link.labels.len(),
            });
        }
        link.labels.insert(index, label.clone());
        self.events.push(DiagramEvent::LabelInserted {
            link_id: link_id.to_string(),
            index,
            label,
            origin,
        });
        Ok(())
    }

    /// Change the text of an existing label.
    pub fn set_label_text(
        &mut self,
        link_id: &str,
        index: usize,
        text: &str,
        origin: Origin,
    ) -> Result<(), DiagramError> {
        let link = self.link_mut(link_id)?;
        let len = link.labels.len();
        let label = link
            .labels
            .get_mut(index)
            .ok_or(DiagramError::LabelIndexOutOfRange {
                link_id: link_id.to_string(),
                index,
                len,
            })?;
        label.text = text.to_string();
        self.events.push(DiagramEvent::LabelEdited {
            link_id: link_id.to_string(),
            index,
            text: text.to_string(),
            origin,
        });
        Ok(())
    }

    /// Move a label along its link.
    pub fn move_label(
        &mut self,
        link_id: &str,
        index: usize,
        position: LabelPosition,
        origin: Origin,
        phase: Phase,
    ) -> Result<(), DiagramError> {
        let link = self.link_mut(link_id)?;
        let len = link.labels.len();
        let label = link
            .labels
            .get_mut(index)
            .ok_or(DiagramError::LabelIndexOutOfRange {
                link_id: link_id.to_string(),
                index,
                len,
            })?;
        label.position = position;
        self.events.push(DiagramEvent::LabelMoved {
            link_id: link_id.to_string(),
            index,
            position,
            origin,
            phase,
        });
        Ok(())
    }

    /// Remove a label by index.
    pub fn remove_label(
        &mut self,
        link_id: &str,
        index: usize,
        origin: Origin,
    ) -> Result<(), DiagramError> {
        let link = self.link_mut(link_id)?;
        if index >= link.labels.len() {
            return Err(DiagramError::LabelIndexOutOfRange {
                link_id: link_id.to_string(),
                index,
                len: link.labels.len(),
            });
        }
        link.labels.remove(index);
        self.events.push(DiagramEvent::LabelRemoved {
            link_id: link_id.to_string(),
            index,
            origin,
        });
        Ok(())
    }

    /// Remove an entity. Idempotent: removing an absent id returns `false`.
    /// Removing a class also removes every link anchored to it, so no link is
    /// left dangling.
    pub fn remove_cell(&mut self, id: &str, origin: Origin) -> bool {
        let Some(cell) = self.graph.cells.remove(id) else {
            return false;
        };
        self.tombstones.insert(id.to_string());
        self.events.push(DiagramEvent::Removed {
            id: id.to_string(),
            origin,
        });

        if matches!(cell, Cell::Class(_)) {
            let attached: Vec<String> = self
                .graph
                .links()
                .filter(|l| l.source.as_deref() == Some(id) || l.target.as_deref() == Some(id))
                .map(|l| l.id.clone())
                .collect();
            for link_id in attached {
                self.graph.cells.remove(&link_id);
                self.tombstones.insert(link_id.clone());
                self.events.push(DiagramEvent::Removed {
                    id: link_id,
                    origin,
                });
            }
        }
        true
    }

    /// Export the whole diagram as a JSON-friendly snapshot.
    pub fn export_snapshot(&self) -> DiagramSnapshot {
        DiagramSnapshot {
            classes: self.graph.classes().cloned().collect(),
            relationships: self.graph.links().cloned().collect(),
        }
    }

    /// Import a snapshot, inserting only entities whose ids are absent
    /// locally. Existing entities are never overwritten, so last-writer-wins
    /// state reached through live operations is preserved.
    pub fn import_snapshot(&mut self, snapshot: DiagramSnapshot, origin: Origin) {
        for class in snapshot.classes {
            if self.graph.has_cell(&class.id) || self.tombstones.contains(&class.id) {
                continue;
            }
            let payload = class.to_payload();
            let id = class.id.clone();
            self.graph.cells.insert(id.clone(), Cell::Class(class));
            self.events
                .push(DiagramEvent::ClassAdded { id, payload, origin });
        }
        for link in snapshot.relationships {
            if self.graph.has_cell(&link.id) || self.tombstones.contains(&link.id) {
                continue;
            }
            // Skip links whose endpoints did not make it across.
            let endpoints_present = link
                .source
                .iter()
                .chain(link.target.iter())
                .all(|e| self.graph.has_cell(e));
            if !link.is_bound() || !endpoints_present {
                continue;
            }
            let (id, source, target, payload) = (
                link.id.clone(),
                link.source.clone(),
                link.target.clone(),
                link.to_payload(),
            );
            self.graph.cells.insert(id.clone(), Cell::Link(link));
            self.events.push(DiagramEvent::LinkAdded {
                id,
                source,
                target,
                payload,
                origin,
            });
        }
    }

    fn class_mut(&mut self, id: &str) -> Result<&mut UmlClass, DiagramError> {
        match self.graph.cells.get_mut(id) {
            Some(Cell::Class(class)) => Ok(class),
            Some(Cell::Link(_)) => Err(DiagramError::NotAClass { id: id.to_string() }),
            None => Err(DiagramError::UnknownCell { id: id.to_string() }),
        }
    }

    fn link_mut(&mut self, id: &str) -> Result<&mut Relationship, DiagramError> {
        match self.graph.cells.get_mut(id) {
            Some(Cell::Link(link)) => Ok(link),
            Some(Cell::Class(_)) => Err(DiagramError::NotALink { id: id.to_string() }),
            None => Err(DiagramError::UnknownCell { id: id.to_string() }),
        }
    }
}
