//! Bucket store request and response types.

use crate::error::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// State of a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketResponse {
    /// Content hash, changes on every mutation
    #[serde(default)]
    pub hash: String,
    /// Opaque lifecycle state
    #[serde(default)]
    pub state: String,
}

/// One entry of a file listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path of the file inside the bucket
    pub path: String,
    /// Opaque hash assigned by the store
    #[serde(default)]
    pub hash: String,
    /// Inline value, when the listing includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// A page of a file listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileListResponse {
    /// Entries of this page
    #[serde(rename = "data", default)]
    pub files: Vec<FileEntry>,
    /// Cursor of the next page, empty on the last one
    #[serde(rename = "next", default)]
    pub next_marker: String,
}

/// Options of a single listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Only list paths starting with this prefix
    pub prefix: String,
    /// Cursor returned by the previous page
    pub marker: String,
    /// Page size; 0 means the default of 10
    pub limit: usize,
}

/// Options of [`VBaseClient::save_file`](super::VBaseClient::save_file).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveFileOptions {
    /// `Content-Type` of the body
    pub content_type: Option<String>,
    /// Ask the store to unzip the body into the bucket
    pub unzip: bool,
    /// Save without conflict detection (last writer wins)
    pub ignore_conflicts: bool,
}

/// Content of a file read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResponse {
    /// `Content-Type` reported by the store
    pub content_type: String,
    /// Raw content
    pub body: Bytes,
}

impl FileResponse {
    /// Deserialize the content as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// The versions of one conflicting file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    /// Path of the conflicting file
    pub path: String,
    /// Last common ancestor
    #[serde(default)]
    pub base: Option<ConflictEntry>,
    /// Version submitted by the writer that got the 409
    #[serde(default)]
    pub mine: Option<ConflictEntry>,
    /// Version currently stored
    #[serde(default)]
    pub master: Option<ConflictEntry>,
}

/// One version of a conflicting file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictEntry {
    /// The file was deleted in this version
    #[serde(default)]
    pub deleted: bool,
    /// MIME type of the content
    #[serde(default)]
    pub mime_type: String,
    /// Content bytes, base64 on the wire
    #[serde(default, with = "base64_bytes")]
    pub content: Vec<u8>,
    /// The store elided the content
    #[serde(default)]
    pub content_omitted: bool,
}

impl ConflictEntry {
    /// Content, or `None` when the store omitted it.
    ///
    /// Omitted content is unknown, not empty.
    pub fn known_content(&self) -> Option<&[u8]> {
        if self.content_omitted {
            None
        } else {
            Some(self.content.as_slice())
        }
    }
}

/// Ordered operations resolving the conflicts of one bucket.
pub type PatchRequest = Vec<PatchOperation>;

/// Kind of patch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    /// Replace the file with the given value
    Replace,
    /// Remove the file
    Remove,
}

/// One operation of a [`PatchRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    /// Operation kind
    #[serde(rename = "op")]
    pub kind: OperationType,
    /// Path of the file
    pub path: String,
    /// New value for `replace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PatchValue>,
}

impl PatchOperation {
    /// Replace `path` with `content`
    pub fn replace(path: impl Into<String>, mime_type: impl Into<String>, content: Value) -> Self {
        Self {
            kind: OperationType::Replace,
            path: path.into(),
            value: Some(PatchValue {
                mime_type: mime_type.into(),
                content,
            }),
        }
    }

    /// Remove `path`
    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            kind: OperationType::Remove,
            path: path.into(),
            value: None,
        }
    }
}

/// Value of a `replace` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchValue {
    /// MIME type of the content
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Content as JSON
    pub content: Value,
}

/// Wrapper of the conflict listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ConflictListResponse {
    #[serde(default)]
    pub data: Vec<Conflict>,
}

mod base64_bytes {
    use super::*;

    pub fn serialize<S: Serializer>(
        bytes: &[u8],
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Vec<u8>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(s) => STANDARD.decode(s).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}
