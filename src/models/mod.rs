//! Data models for the EasyReview backend.
//!
//! `metadata` is the in-memory shape of a dataset as loaded from Dataverse;
//! the remaining modules mirror the persisted review schema.

mod field;
mod file;
mod message;
pub mod metadata;
mod open_fields;
mod review;
mod reviewer;

pub use field::*;
pub use file::*;
pub use message::*;
pub use open_fields::*;
pub use review::*;
pub use reviewer::*;

use serde::{Deserialize, Deserializer};

/// Distinguishes an absent key from an explicit `null` in update requests.
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: a missing
/// key yields `None`, `null` yields `Some(None)`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
