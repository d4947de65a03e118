//! Metadatablock, compound and field models.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{double_option, Message};

/// History label for the value seen at ingestion.
pub const ORIGINAL_REVISION: &str = "Original";

/// Prefix of the history labels written on value changes.
const REVISION_PREFIX: &str = "Revision ";

/// The single parent of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerRef {
    Metadatablock(String),
    Compound(String),
}

impl OwnerRef {
    pub fn id(&self) -> &str {
        match self {
            OwnerRef::Metadatablock(id) | OwnerRef::Compound(id) => id,
        }
    }
}

/// A named block of a review's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadatablock {
    pub id: String,
    pub review_id: String,
    pub name: String,
    pub description: String,
    /// Fields owned directly by the block
    #[serde(default)]
    pub primitives: Vec<Field>,
    #[serde(default)]
    pub compounds: Vec<Compound>,
}

/// One entry of a compound field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compound {
    pub id: String,
    pub metadatablock_id: String,
    pub name: String,
    pub description: String,
    pub accepted: bool,
    #[serde(default)]
    pub primitives: Vec<Field>,
    #[serde(default)]
    pub chat: Vec<Message>,
}

/// A leaf value under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub owner: OwnerRef,
    pub name: String,
    pub description: String,
    pub value: String,
    /// Unset until a reviewer decides
    pub accepted: Option<bool>,
    pub history: IndexMap<String, String>,
    #[serde(default)]
    pub chat: Vec<Message>,
}

/// Request body for updating a metadatablock.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMetadatablockRequest {
    #[serde(default)]
    pub description: Option<String>,
}

/// Request body for updating a compound.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCompoundRequest {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub accepted: Option<bool>,
}

/// Request body for updating a field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFieldRequest {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// `null` resets the decision
    #[serde(default, deserialize_with = "double_option")]
    pub accepted: Option<Option<bool>>,
    /// Replaces the whole history when given
    #[serde(default)]
    pub history: Option<IndexMap<String, String>>,
}

impl Field {
    /// Applies an update, recording the replaced value in the history.
    ///
    /// A changed `value` is stored under `Revision {n}` with `n` the number of
    /// history entries before the change, bumped past any revision label
    /// already present, unless the request carries its own history.
    pub fn apply_update(&mut self, request: &UpdateFieldRequest) {
        if let Some(history) = &request.history {
            self.history = history.clone();
        }

        if let Some(value) = &request.value {
            if *value != self.value {
                if request.history.is_none() {
                    let label = format!("{}{}", REVISION_PREFIX, self.next_revision());
                    self.history.insert(label, self.value.clone());
                }
                self.value = value.clone();
            }
        }

        if let Some(description) = &request.description {
            self.description = description.clone();
        }

        if let Some(accepted) = request.accepted {
            self.accepted = accepted;
        }
    }

    fn next_revision(&self) -> usize {
        let past_latest = self
            .history
            .keys()
            .filter_map(|label| label.strip_prefix(REVISION_PREFIX)?.parse::<usize>().ok())
            .max()
            .map_or(0, |latest| latest + 1);
        self.history.len().max(past_latest)
    }
}
