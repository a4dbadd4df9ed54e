use serde::{Deserialize, Serialize};

use super::class::UmlClass;
use super::relationship::Relationship;

/// A full JSON export of the diagram: every class and relationship with its
/// geometry, text and labels.
///
/// This is the contract consumed by the export/codegen and chatbot
/// collaborators, and the payload of a `state_sync` wire message answering a
/// full-sync request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramSnapshot {
    #[serde(default)]
    pub classes: Vec<UmlClass>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl DiagramSnapshot {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.relationships.is_empty()
    }
}
