//! Dataverse API client.
//!
//! Loads dataset metadata and metadatablock schemas from a Dataverse
//! installation through its native JSON API.

mod dataset;
pub mod schema;

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::metadata::DatasetMetadata;
use schema::{BlockSchema, DatasetPayload, Envelope};

const USER_AGENT: &str = concat!("easyreview-backend/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API token for non-public datasets.
pub const API_TOKEN_HEADER: &str = "X-Dataverse-key";

/// Dataverse client errors
#[derive(Debug, Error)]
pub enum DataverseError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Dataverse returned {status} for {url}: {body}")]
    Status { status: u16, url: String, body: String },

    #[error("Malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

/// Client for one or more Dataverse installations.
///
/// The site URL is passed per call since reviews may originate from
/// different installations.
#[derive(Clone)]
pub struct DataverseClient {
    http_client: reqwest::Client,
}

impl DataverseClient {
    pub fn new(timeout: Duration) -> Result<Self, DataverseError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DataverseError::Network(e.to_string()))?;

        Ok(Self { http_client })
    }

    /// Load the latest version of a dataset with every metadatablock it uses.
    pub async fn load_dataset(
        &self,
        site_url: &str,
        doi: &str,
        api_token: Option<&str>,
    ) -> Result<DatasetMetadata, DataverseError> {
        let base = trim_site_url(site_url);
        let url = format!("{}/api/datasets/:persistentId/", base);

        tracing::debug!(doi = %doi, url = %url, "Loading dataset");

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("persistentId", doi)]);
        if let Some(token) = api_token {
            request = request.header(API_TOKEN_HEADER, token);
        }
        let payload: DatasetPayload = self.send(request, &url).await?;

        let mut blocks = Vec::with_capacity(payload.latest_version.metadata_blocks.len());
        for (name, dataset_block) in &payload.latest_version.metadata_blocks {
            let schema = self.fetch_block_schema(base, name).await?;
            let schema_url = block_schema_url(base, name);
            blocks.push(dataset::build_block(
                name,
                &schema,
                dataset_block,
                &schema_url,
            )?);
        }

        Ok(DatasetMetadata {
            doi: doi.to_string(),
            blocks,
        })
    }

    /// Fetch the current schema of a metadatablock.
    pub async fn fetch_block_schema(
        &self,
        site_url: &str,
        block_name: &str,
    ) -> Result<BlockSchema, DataverseError> {
        let url = block_schema_url(trim_site_url(site_url), block_name);

        tracing::debug!(block = %block_name, url = %url, "Fetching metadatablock schema");

        let request = self.http_client.get(&url);
        let mut schema: BlockSchema = self.send(request, &url).await?;
        schema.fill_missing_names();

        Ok(schema)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        url: &str,
    ) -> Result<T, DataverseError> {
        let response = request
            .send()
            .await
            .map_err(|e| DataverseError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataverseError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        let envelope: Envelope<T> =
            response
                .json()
                .await
                .map_err(|e| DataverseError::Malformed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        Ok(envelope.data)
    }
}

fn trim_site_url(site_url: &str) -> &str {
    site_url.trim_end_matches('/')
}

fn block_schema_url(base: &str, block_name: &str) -> String {
    format!("{}/api/metadatablocks/{}", base, block_name)
}
