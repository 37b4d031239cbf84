//! Metadata store types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One keyed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Entry key
    pub key: String,
    /// Opaque hash assigned by the store
    #[serde(default)]
    pub hash: String,
    /// Entry value, present when the listing asked for values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A page of a metadata listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataListResponse {
    /// Entries of this page
    #[serde(default)]
    pub data: Vec<MetadataEntry>,
    /// Cursor of the next page, empty on the last one
    #[serde(rename = "next", default)]
    pub next_marker: String,
}

/// Options of a single listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataListOptions {
    /// Include each entry's value
    pub include_value: bool,
    /// Page size; 0 means the default of 10
    pub limit: usize,
    /// Cursor returned by the previous page
    pub marker: String,
}

/// The versions of one conflicting key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataConflict {
    /// Conflicting key
    pub key: String,
    /// Last common ancestor
    #[serde(default)]
    pub base: Option<MetadataConflictEntry>,
    /// Version submitted by the writer that got the 409
    #[serde(default)]
    pub mine: Option<MetadataConflictEntry>,
    /// Version currently stored
    #[serde(default)]
    pub master: Option<MetadataConflictEntry>,
}

/// One version of a conflicting key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataConflictEntry {
    /// The key was deleted in this version
    #[serde(default)]
    pub deleted: bool,
    /// Value of this version
    #[serde(default)]
    pub value: Option<Value>,
}

/// Kind of metadata patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataOperationType {
    /// Create the key
    Add,
    /// Overwrite the key
    Replace,
    /// Remove the key
    Remove,
}

/// One operation of a [`MetadataPatchRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataPatchOperation {
    /// Operation kind
    #[serde(rename = "op")]
    pub kind: MetadataOperationType,
    /// Target key
    pub key: String,
    /// New value for `add`/`replace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl MetadataPatchOperation {
    /// Overwrite `key` with `value`
    pub fn replace(key: impl Into<String>, value: Value) -> Self {
        Self {
            kind: MetadataOperationType::Replace,
            key: key.into(),
            value: Some(value),
        }
    }

    /// Remove `key`
    pub fn remove(key: impl Into<String>) -> Self {
        Self {
            kind: MetadataOperationType::Remove,
            key: key.into(),
            value: None,
        }
    }
}

/// Ordered metadata operations.
pub type MetadataPatchRequest = Vec<MetadataPatchOperation>;

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct MetadataConflictListResponse {
    #[serde(default)]
    pub data: Vec<MetadataConflict>,
}
