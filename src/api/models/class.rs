use serde::{Deserialize, Serialize};

use super::geometry::{Point, Size};
use super::operation::ClassPayload;

/// A UML class node: three text compartments plus canvas geometry.
///
/// Owned exclusively by the diagram graph; the collaboration layer never
/// keeps its own copy of geometry or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UmlClass {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub attributes: String,
    #[serde(default)]
    pub methods: String,
    pub position: Point,
    #[serde(default)]
    pub size: Size,
}

impl UmlClass {
    pub fn new(id: String, payload: ClassPayload) -> Self {
        Self {
            id,
            name: payload.name,
            attributes: payload.attributes,
            methods: payload.methods,
            position: payload.position,
            size: payload.size,
        }
    }

    /// The `add_class` payload that recreates this class on a peer.
    pub fn to_payload(&self) -> ClassPayload {
        ClassPayload {
            name: self.name.clone(),
            position: self.position,
            size: self.size,
            attributes: self.attributes.clone(),
            methods: self.methods.clone(),
        }
    }
}
