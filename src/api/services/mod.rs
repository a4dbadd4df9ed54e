//! Services module - the replication core: diagram surface, local change
//! observer, and the collaboration session.

pub mod change_observer;
pub mod collaboration_service;
pub mod diagram_service;

pub use change_observer::ChangeObserver;
pub use collaboration_service::CollaborationService;
pub use diagram_service::{
    Cell, DiagramError, DiagramEvent, DiagramService, Graph, Origin, Phase,
};
