//! Dataset metadata as loaded from a Dataverse installation.
//!
//! A dataset is a list of named blocks. Each block holds fields in schema
//! declaration order; a field is either a primitive value or a compound whose
//! entries are themselves lists of primitive fields.

/// A dataset with all of its metadata blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetMetadata {
    pub doi: String,
    pub blocks: Vec<MetadataBlock>,
}

/// A named metadata block, e.g. `citation`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataBlock {
    pub name: String,
    pub description: String,
    pub fields: Vec<MetadataField>,
}

/// A named field inside a block or compound entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataField {
    pub name: String,
    pub node: MetadataNode,
}

/// Value carried by a field.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataNode {
    Primitive {
        value: PrimitiveValue,
        description: String,
        repeatable: bool,
    },
    /// A single compound has at most one entry; an absent one has none.
    Compound {
        entries: Vec<Vec<MetadataField>>,
        description: String,
        repeatable: bool,
    },
}

/// Raw value of a primitive field.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Null,
    Text(String),
    List(Vec<Option<String>>),
}

impl PrimitiveValue {
    /// Renders the value the way it is persisted: lists are joined with ", ".
    ///
    /// Null list elements are dropped. Returns `None` for `Null`.
    pub fn stringify(&self) -> Option<String> {
        match self {
            PrimitiveValue::Null => None,
            PrimitiveValue::Text(text) => Some(text.clone()),
            PrimitiveValue::List(items) => Some(
                items
                    .iter()
                    .flatten()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify_joins_lists() {
        let value = PrimitiveValue::List(vec![
            Some("Chemistry".to_string()),
            None,
            Some("Physics".to_string()),
        ]);
        assert_eq!(value.stringify().as_deref(), Some("Chemistry, Physics"));
    }

    #[test]
    fn test_stringify_null_and_text() {
        assert_eq!(PrimitiveValue::Null.stringify(), None);
        assert_eq!(
            PrimitiveValue::Text("A title".to_string()).stringify(),
            Some("A title".to_string())
        );
        assert_eq!(
            PrimitiveValue::List(Vec::new()).stringify(),
            Some(String::new())
        );
    }
}
