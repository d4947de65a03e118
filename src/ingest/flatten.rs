//! Flattens metadata blocks into the rows persisted for a review.

use indexmap::IndexMap;

use crate::models::metadata::{MetadataBlock, MetadataField, MetadataNode, PrimitiveValue};
use crate::models::ORIGINAL_REVISION;

/// Rows for one metadatablock, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatBlock {
    pub name: String,
    pub description: String,
    pub entries: Vec<BlockEntry>,
}

/// A direct child of a metadatablock.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEntry {
    Field(NewField),
    Compound {
        name: String,
        description: String,
        fields: Vec<NewField>,
    },
}

/// A field row about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewField {
    pub name: String,
    pub description: String,
    pub value: String,
    pub history: IndexMap<String, String>,
}

impl FlatBlock {
    /// Number of field rows, including those below compounds.
    pub fn field_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| match entry {
                BlockEntry::Field(_) => 1,
                BlockEntry::Compound { fields, .. } => fields.len(),
            })
            .sum()
    }
}

/// Flattens a block into field and compound rows.
///
/// Private (`_`-prefixed) fields, null values and lists without values are
/// skipped. Each compound entry becomes its own compound row.
pub fn flatten_block(block: &MetadataBlock) -> FlatBlock {
    let mut entries = Vec::new();

    for field in &block.fields {
        if is_private(&field.name) {
            continue;
        }

        match &field.node {
            MetadataNode::Primitive { value, description, .. } => {
                if !has_value(value) {
                    continue;
                }
                if let Some(row) = primitive_row(&field.name, value, description) {
                    entries.push(BlockEntry::Field(row));
                }
            }
            MetadataNode::Compound {
                entries: compound_entries,
                description,
                repeatable,
            } => {
                tracing::debug!(
                    compound = %field.name,
                    entries = compound_entries.len(),
                    repeatable = *repeatable,
                    "Flattening compound"
                );
                for entry in compound_entries {
                    entries.push(BlockEntry::Compound {
                        name: field.name.clone(),
                        description: description.clone(),
                        fields: compound_fields(&field.name, entry),
                    });
                }
            }
        }
    }

    FlatBlock {
        name: block.name.clone(),
        description: block.description.clone(),
        entries,
    }
}

fn compound_fields(compound: &str, entry: &[MetadataField]) -> Vec<NewField> {
    let mut rows = Vec::new();

    for field in entry {
        if is_private(&field.name) {
            continue;
        }

        match &field.node {
            MetadataNode::Primitive { value, description, .. } => {
                if let Some(row) = primitive_row(&field.name, value, description) {
                    rows.push(row);
                }
            }
            MetadataNode::Compound { .. } => {
                tracing::warn!(
                    compound = %compound,
                    field = %field.name,
                    "Skipping compound nested inside a compound"
                );
            }
        }
    }

    rows
}

/// Builds a field row; `None` for null values.
fn primitive_row(name: &str, value: &PrimitiveValue, description: &str) -> Option<NewField> {
    let value = value.stringify()?;
    Some(NewField {
        name: name.to_string(),
        description: description.to_string(),
        history: IndexMap::from([(ORIGINAL_REVISION.to_string(), value.clone())]),
        value,
    })
}

fn has_value(value: &PrimitiveValue) -> bool {
    match value {
        PrimitiveValue::Null => false,
        PrimitiveValue::Text(_) => true,
        PrimitiveValue::List(items) => items.iter().any(Option::is_some),
    }
}

fn is_private(name: &str) -> bool {
    name.starts_with('_')
}
