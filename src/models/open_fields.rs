//! Open-field report models.

use serde::{Deserialize, Serialize};

/// Fields the remote schema offers for one metadatablock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenMetadatablockFields {
    pub name: String,
    pub primitives: Vec<String>,
    pub compounds: Vec<OpenCompound>,
}

/// A compound of the remote schema with its child field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCompound {
    pub name: String,
    #[serde(rename = "childFields")]
    pub child_fields: Vec<String>,
}
