//! Dataset ingestion: load from Dataverse, prune empty blocks, flatten, persist.

mod empty;
mod flatten;

pub use empty::is_empty;
pub use flatten::{flatten_block, BlockEntry, FlatBlock, NewField};

use crate::dataverse::DataverseClient;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{FetchDatasetParams, Review};

/// Message returned when the fetch endpoint lacks its required parameters.
pub const MISSING_PARAMS_MESSAGE: &str = "Missing either 'site_url' or 'doi' to fetch the dataset.";

/// Returns the review for a DOI, ingesting the dataset on first sight.
///
/// A DOI that already has a review is answered from the database without
/// contacting the Dataverse installation.
pub async fn fetch_dataset(
    repo: &Repository,
    client: &DataverseClient,
    params: &FetchDatasetParams,
) -> Result<Review, AppError> {
    let (Some(site_url), Some(doi)) = (
        non_blank(params.site_url.as_deref()),
        non_blank(params.doi.as_deref()),
    ) else {
        return Err(AppError::Validation(MISSING_PARAMS_MESSAGE.to_string()));
    };

    if let Some(existing) = repo.find_review_by_doi(doi).await? {
        tracing::info!(doi = %doi, review_id = %existing.id, "Dataset already ingested");
        return Ok(existing);
    }

    let dataset = client
        .load_dataset(site_url, doi, non_blank(params.api_token.as_deref()))
        .await?;

    let total = dataset.blocks.len();
    let blocks: Vec<FlatBlock> = dataset
        .blocks
        .iter()
        .filter(|block| !is_empty(&block.fields))
        .map(flatten_block)
        .collect();

    let review_id = repo.insert_review_tree(doi, site_url, &blocks).await?;

    tracing::info!(
        doi = %dataset.doi,
        review_id = %review_id,
        blocks_kept = blocks.len(),
        blocks_pruned = total - blocks.len(),
        fields = blocks.iter().map(FlatBlock::field_count).sum::<usize>(),
        "Dataset ingested"
    );

    repo.get_review(&review_id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Review {} vanished after insert", review_id)))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
