//! Emptiness check for metadata subtrees.

use crate::models::metadata::{MetadataField, MetadataNode, PrimitiveValue};

/// Returns true when no leaf below `fields` carries a value.
///
/// Fields are examined in declaration order and the walk stops at the first
/// one holding data. A node without fields is empty.
pub fn is_empty(fields: &[MetadataField]) -> bool {
    fields.iter().all(|field| node_is_empty(&field.node))
}

fn node_is_empty(node: &MetadataNode) -> bool {
    match node {
        // Single and repeatable compounds alike: every entry must be empty,
        // an absent entry counts as empty.
        MetadataNode::Compound { entries, .. } => entries.iter().all(|entry| is_empty(entry)),
        MetadataNode::Primitive { value, .. } => match value {
            PrimitiveValue::Null => true,
            PrimitiveValue::Text(_) => false,
            PrimitiveValue::List(items) => items.iter().all(Option::is_none),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primitive(name: &str, value: PrimitiveValue, repeatable: bool) -> MetadataField {
        MetadataField {
            name: name.to_string(),
            node: MetadataNode::Primitive {
                value,
                description: String::new(),
                repeatable,
            },
        }
    }

    fn compound(name: &str, entries: Vec<Vec<MetadataField>>, repeatable: bool) -> MetadataField {
        MetadataField {
            name: name.to_string(),
            node: MetadataNode::Compound {
                entries,
                description: String::new(),
                repeatable,
            },
        }
    }

    #[test]
    fn test_no_fields_is_empty() {
        assert!(is_empty(&[]));
    }

    #[test]
    fn test_all_null_is_empty() {
        let fields = vec![
            primitive("title", PrimitiveValue::Null, false),
            primitive("subject", PrimitiveValue::List(vec![None, None]), true),
            primitive("keyword", PrimitiveValue::List(Vec::new()), true),
        ];
        assert!(is_empty(&fields));
    }

    #[test]
    fn test_text_value_is_not_empty() {
        let fields = vec![
            primitive("title", PrimitiveValue::Null, false),
            primitive("subtitle", PrimitiveValue::Text("Sub".into()), false),
        ];
        assert!(!is_empty(&fields));
    }

    #[test]
    fn test_empty_string_counts_as_a_value() {
        let fields = vec![primitive("title", PrimitiveValue::Text(String::new()), false)];
        assert!(!is_empty(&fields));
    }

    #[test]
    fn test_list_with_one_value_is_not_empty() {
        let fields = vec![primitive(
            "subject",
            PrimitiveValue::List(vec![None, Some("Chemistry".into())]),
            true,
        )];
        assert!(!is_empty(&fields));
    }

    #[test]
    fn test_repeatable_compound_with_only_empty_entries_is_empty() {
        let entry = vec![primitive("author_name", PrimitiveValue::Null, false)];
        let fields = vec![compound("author", vec![entry.clone(), entry], true)];
        assert!(is_empty(&fields));
    }

    #[test]
    fn test_repeatable_compound_with_one_filled_entry_is_not_empty() {
        let empty = vec![primitive("author_name", PrimitiveValue::Null, false)];
        let filled = vec![primitive(
            "author_name",
            PrimitiveValue::Text("Doe, Jane".into()),
            false,
        )];
        let fields = vec![compound("author", vec![empty, filled], true)];
        assert!(!is_empty(&fields));
    }

    #[test]
    fn test_absent_single_compound_is_empty() {
        let fields = vec![compound("series", Vec::new(), false)];
        assert!(is_empty(&fields));
    }

    #[test]
    fn test_verdict_does_not_depend_on_last_field() {
        // An empty trailing field must not mask an earlier filled one.
        let fields = vec![
            primitive("title", PrimitiveValue::Text("A".into()), false),
            primitive("subtitle", PrimitiveValue::Null, false),
        ];
        assert!(!is_empty(&fields));

        // With every field empty the last verdict and the conjunction agree.
        let fields = vec![
            compound("author", Vec::new(), true),
            primitive("subtitle", PrimitiveValue::Null, false),
        ];
        assert!(is_empty(&fields));
    }
}
