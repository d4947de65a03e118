//! Merges a dataset version with its block schemas into [`MetadataBlock`]s.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde_json::Value;

use super::schema::{BlockSchema, DatasetBlock, DatasetField, SchemaField};
use super::DataverseError;
use crate::models::metadata::{MetadataBlock, MetadataField, MetadataNode, PrimitiveValue};

/// Builds a block from its schema and the values a dataset holds for it.
///
/// Fields follow schema declaration order. Fields that only appear as
/// compound children are not repeated at block level. Values the schema does
/// not know are dropped.
pub fn build_block(
    name: &str,
    schema: &BlockSchema,
    dataset_block: &DatasetBlock,
    url: &str,
) -> Result<MetadataBlock, DataverseError> {
    let values: HashMap<&str, &Value> = dataset_block
        .fields
        .iter()
        .map(|field| (field.type_name.as_str(), &field.value))
        .collect();

    let children: HashSet<&str> = schema.child_type_names().into_iter().collect();

    for type_name in values.keys() {
        if !schema.fields.values().any(|f| f.name == *type_name) {
            tracing::debug!(block = %name, field = %type_name, "Field missing from block schema");
        }
    }

    let mut fields = Vec::new();
    for field in schema.fields.values() {
        if children.contains(field.name.as_str()) {
            continue;
        }
        let value = values.get(field.name.as_str()).copied();
        fields.push(MetadataField {
            name: camel_to_snake(&field.name),
            node: build_node(field, value, url)?,
        });
    }

    let description = if schema.display_name.is_empty() {
        dataset_block.display_name.clone()
    } else {
        schema.display_name.clone()
    };

    Ok(MetadataBlock {
        name: name.to_string(),
        description,
        fields,
    })
}

fn build_node(
    field: &SchemaField,
    value: Option<&Value>,
    url: &str,
) -> Result<MetadataNode, DataverseError> {
    if !field.is_compound() {
        return Ok(MetadataNode::Primitive {
            value: primitive_value(field, value, url)?,
            description: field.description.clone(),
            repeatable: field.multiple,
        });
    }

    let entries = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| compound_entry(field, item, url))
            .collect::<Result<Vec<_>, _>>()?,
        Some(item @ Value::Object(_)) => vec![compound_entry(field, item, url)?],
        Some(other) => {
            return Err(malformed(
                url,
                format!("compound '{}' holds {}", field.name, other),
            ))
        }
    };

    Ok(MetadataNode::Compound {
        entries,
        description: field.description.clone(),
        repeatable: field.multiple,
    })
}

fn compound_entry(
    field: &SchemaField,
    item: &Value,
    url: &str,
) -> Result<Vec<MetadataField>, DataverseError> {
    let entry: IndexMap<String, DatasetField> = serde_json::from_value(item.clone())
        .map_err(|e| malformed(url, format!("compound '{}': {}", field.name, e)))?;

    let Some(children) = field.child_fields.as_ref() else {
        return Ok(Vec::new());
    };

    children
        .values()
        .map(|child| {
            let value = entry.get(&child.name).map(|f| &f.value);
            Ok(MetadataField {
                name: camel_to_snake(&child.name),
                node: build_node(child, value, url)?,
            })
        })
        .collect()
}

fn primitive_value(
    field: &SchemaField,
    value: Option<&Value>,
    url: &str,
) -> Result<PrimitiveValue, DataverseError> {
    Ok(match value {
        None | Some(Value::Null) => PrimitiveValue::Null,
        Some(Value::String(text)) => PrimitiveValue::Text(text.clone()),
        Some(Value::Array(items)) => PrimitiveValue::List(
            items
                .iter()
                .map(|item| match item {
                    Value::Null => None,
                    Value::String(text) => Some(text.clone()),
                    other => Some(other.to_string()),
                })
                .collect(),
        ),
        Some(Value::Object(_)) => {
            return Err(malformed(
                url,
                format!("primitive '{}' holds an object", field.name),
            ))
        }
        Some(other) => PrimitiveValue::Text(other.to_string()),
    })
}

fn malformed(url: &str, reason: String) -> DataverseError {
    DataverseError::Malformed {
        url: url.to_string(),
        reason,
    }
}

/// Converts a Dataverse type name to snake_case: `dsDescription` becomes
/// `ds_description`, `producerURL` becomes `producer_url`.
///
/// Characters other than letters, digits, `_` and whitespace become spaces.
pub fn camel_to_snake(name: &str) -> String {
    let cleaned: Vec<char> = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim()
        .chars()
        .collect();

    let mut out = String::with_capacity(cleaned.len() + 4);
    for (i, &c) in cleaned.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = cleaned[i - 1];
            let next_is_lower = cleaned.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (next_is_lower && prev != '_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}
