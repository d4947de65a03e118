//! Wire types of the Dataverse native API.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

/// `{"status": "OK", "data": ...}` wrapper around every response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Schema of one metadatablock, as served by `/api/metadatablocks/{name}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSchema {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub fields: IndexMap<String, SchemaField>,
}

/// Schema of one field. Compound fields list their children in `childFields`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    #[serde(default)]
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub type_class: Option<String>,
    #[serde(default)]
    pub child_fields: Option<IndexMap<String, SchemaField>>,
}

impl BlockSchema {
    /// Fills in `name` from the map key where the server omitted it.
    pub fn fill_missing_names(&mut self) {
        fill_names(&mut self.fields);
    }

    /// Type names of every field that appears as a compound child.
    pub fn child_type_names(&self) -> Vec<&str> {
        self.fields
            .values()
            .filter_map(|field| field.child_fields.as_ref())
            .flat_map(|children| children.values().map(|child| child.name.as_str()))
            .collect()
    }
}

fn fill_names(fields: &mut IndexMap<String, SchemaField>) {
    for (key, field) in fields.iter_mut() {
        if field.name.is_empty() {
            field.name = key.clone();
        }
        if let Some(children) = field.child_fields.as_mut() {
            fill_names(children);
        }
    }
}

impl SchemaField {
    pub fn is_compound(&self) -> bool {
        self.child_fields.is_some() || self.type_class.as_deref() == Some("compound")
    }
}

/// `data` of `/api/datasets/:persistentId/`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetPayload {
    pub latest_version: DatasetVersion,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetVersion {
    #[serde(default)]
    pub metadata_blocks: IndexMap<String, DatasetBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetBlock {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub fields: Vec<DatasetField>,
}

/// A field value inside a dataset version.
///
/// `value` is a string or list of strings for primitives, an object keyed by
/// child type name for a single compound, or a list of such objects.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetField {
    pub type_name: String,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub type_class: String,
    #[serde(default)]
    pub value: Value,
}
