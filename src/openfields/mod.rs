//! Open-field reconciliation.
//!
//! Reports, per metadatablock of a review, which fields the Dataverse
//! installation currently defines: standalone primitives and compounds with
//! their children. Comparing this against the stored review is left to the
//! client.

use std::collections::HashSet;

use futures::future::try_join_all;

use crate::dataverse::schema::{BlockSchema, SchemaField};
use crate::dataverse::DataverseClient;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{OpenCompound, OpenMetadatablockFields};

/// Open fields for every metadatablock of a review, in stored block order.
///
/// Fails with `NotFound` before any remote call if the review is unknown.
/// One failed schema fetch fails the whole request.
pub async fn open_fields_for_review(
    repo: &Repository,
    client: &DataverseClient,
    review_id: &str,
) -> Result<Vec<OpenMetadatablockFields>, AppError> {
    let review = repo
        .get_review_summary(review_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Review with ID '{}' does not exist.", review_id)))?;

    let block_names = repo.list_metadatablock_names(review_id).await?;
    let site_url = review.site_url.as_str();

    try_join_all(block_names.iter().map(|name| async move {
        let schema = client.fetch_block_schema(site_url, name).await?;
        Ok::<_, AppError>(partition(name, &schema))
    }))
    .await
}

/// Splits a block schema into standalone primitives and compounds.
///
/// Primitives that also appear as a compound child are dropped.
pub fn partition(name: &str, schema: &BlockSchema) -> OpenMetadatablockFields {
    let compounds = retrieve_compounds(schema);
    let compound_children: HashSet<&str> = compounds
        .iter()
        .flat_map(|compound| compound.child_fields.iter().map(String::as_str))
        .collect();

    let primitives = retrieve_primitives(schema)
        .into_iter()
        .filter(|primitive| !compound_children.contains(primitive.as_str()))
        .collect();

    OpenMetadatablockFields {
        name: name.to_string(),
        primitives,
        compounds,
    }
}

/// Normalized names of fields that neither have children nor are one.
pub fn retrieve_primitives(schema: &BlockSchema) -> Vec<String> {
    let child_names: HashSet<&str> = schema.child_type_names().into_iter().collect();

    schema
        .fields
        .values()
        .filter(|field| field.child_fields.is_none())
        .filter(|field| {
            !child_names.contains(field.name.as_str())
                && !child_names.contains(field.display_name.as_str())
        })
        .map(normalized_name)
        .collect()
}

/// Fields declaring children, with their normalized child names.
pub fn retrieve_compounds(schema: &BlockSchema) -> Vec<OpenCompound> {
    schema
        .fields
        .values()
        .filter_map(|field| {
            let children = field.child_fields.as_ref()?;
            Some(OpenCompound {
                name: normalized_name(field),
                child_fields: children.values().map(normalized_name).collect(),
            })
        })
        .collect()
}

/// `Alternative Title` becomes `alternative_title`.
fn normalized_name(field: &SchemaField) -> String {
    field.display_name.replace(' ', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema(fields: serde_json::Value) -> BlockSchema {
        let mut schema: BlockSchema =
            serde_json::from_value(json!({ "name": "test", "fields": fields })).unwrap();
        schema.fill_missing_names();
        schema
    }

    #[test]
    fn test_partition_primitives_and_compounds() {
        let schema = schema(json!({
            "a": {"displayName": "A"},
            "b": {"displayName": "B", "childFields": {
                "c": {"displayName": "C"},
                "d": {"displayName": "D"}
            }}
        }));

        let open = partition("test", &schema);

        assert_eq!(open.name, "test");
        assert_eq!(open.primitives, vec!["a"]);
        assert_eq!(
            open.compounds,
            vec![OpenCompound {
                name: "b".to_string(),
                child_fields: vec!["c".to_string(), "d".to_string()],
            }]
        );
    }

    #[test]
    fn test_top_level_child_is_not_a_primitive() {
        let schema = schema(json!({
            "a": {"displayName": "A"},
            "b": {"displayName": "B", "childFields": {
                "c": {"displayName": "C"},
                "d": {"displayName": "D"}
            }},
            "c": {"displayName": "C"}
        }));

        let open = partition("test", &schema);
        assert_eq!(open.primitives, vec!["a"]);
    }

    #[test]
    fn test_display_name_collision_is_removed() {
        // Different type name, same normalized display name as a child.
        let schema = schema(json!({
            "author": {"displayName": "Author", "childFields": {
                "authorName": {"displayName": "Name"}
            }},
            "contactName": {"displayName": "Name"},
            "title": {"displayName": "Title"}
        }));

        let open = partition("citation", &schema);
        assert_eq!(open.primitives, vec!["title"]);
    }

    #[test]
    fn test_names_are_normalized() {
        let schema = schema(json!({
            "alternativeTitle": {"displayName": "Alternative Title"},
            "dsDescription": {"displayName": "Description", "childFields": {
                "dsDescriptionValue": {"displayName": "Text"},
                "dsDescriptionDate": {"displayName": "Date Written"}
            }}
        }));

        assert_eq!(retrieve_primitives(&schema), vec!["alternative_title"]);
        assert_eq!(
            retrieve_compounds(&schema),
            vec![OpenCompound {
                name: "description".to_string(),
                child_fields: vec!["text".to_string(), "date_written".to_string()],
            }]
        );
    }

    #[test]
    fn test_open_compound_serializes_child_fields_camel_case() {
        let compound = OpenCompound {
            name: "b".to_string(),
            child_fields: vec!["c".to_string()],
        };
        let json = serde_json::to_value(&compound).unwrap();
        assert_eq!(json, json!({"name": "b", "childFields": ["c"]}));
    }
}
