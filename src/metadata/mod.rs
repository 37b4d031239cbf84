//! Keyed metadata store client.
//!
//! Same bucket model as the [bucket store](crate::vbase), addressed by key instead of
//! path (`/buckets/{app}/{bucket}/metadata/{key}`), with JSON values. Entry reads,
//! writes and deletes go through the [conflict protocol](crate::conflict); bucket
//! lifecycle calls, `delete_all` and the conflict endpoints do not.

mod client;
mod types;

pub use client::MetadataClient;
pub use types::{
    MetadataConflict, MetadataConflictEntry, MetadataEntry, MetadataListOptions,
    MetadataListResponse, MetadataOperationType, MetadataPatchOperation, MetadataPatchRequest,
};
