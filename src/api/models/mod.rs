// Models module - contains the operation wire format, diagram entities and
// the relay envelope.

pub mod class;
pub mod enums;
pub mod geometry;
pub mod operation;
pub mod relationship;
pub mod snapshot;
pub mod wire;

pub use class::UmlClass;
pub use enums::{RelationKind, TextField};
pub use geometry::{Point, Size};
pub use operation::{ClassPayload, LinkPayload, Operation};
pub use relationship::{LabelPosition, LinkLabel, Relationship};
pub use snapshot::DiagramSnapshot;
pub use wire::{PresenceAction, WireMessage};
