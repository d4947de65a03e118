//! Chat message model.

use serde::{Deserialize, Serialize};

/// What a message is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MessageTarget {
    Field(String),
    Compound(String),
}

impl MessageTarget {
    pub fn id(&self) -> &str {
        match self {
            MessageTarget::Field(id) | MessageTarget::Compound(id) => id,
        }
    }
}

/// A reviewer comment on a field or compound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub target: MessageTarget,
    pub content: String,
    pub author: Option<String>,
    pub timestamp: String,
}

/// Request body for posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMessageRequest {
    pub target: MessageTarget,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
}

/// Request body for editing a message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMessageRequest {
    #[serde(default)]
    pub content: Option<String>,
}
