use serde::{Deserialize, Serialize};

/// UML relationship kinds offered by the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Association,
    Generalization,
    Aggregation,
    Composition,
    Dependency,
}

impl Default for RelationKind {
    fn default() -> Self {
        Self::Association
    }
}

/// Which text compartment of a class an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextField {
    Name,
    Attributes,
    Methods,
}
