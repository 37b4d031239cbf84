//! Versioned bucket store ("vbase") client.
//!
//! Buckets are named partitions of an application's store inside a workspace. Every
//! read and write returns the entry's `ETag`. Every operation except conflict
//! listing and resolution runs through the [conflict protocol](crate::conflict) when
//! the client has a resolver.
//!
//! # Endpoints
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | [`VBaseClient::get_bucket`] | `GET /buckets/{app}/{bucket}` |
//! | [`VBaseClient::set_bucket_state`] | `PUT /buckets/{app}/{bucket}/state` |
//! | [`VBaseClient::get_file`] | `GET /buckets/{app}/{bucket}/files/{path}` |
//! | [`VBaseClient::save_file`] | `PUT /buckets/{app}/{bucket}/files/{path}` |
//! | [`VBaseClient::delete_file`] | `DELETE /buckets/{app}/{bucket}/files/{path}` |
//! | [`VBaseClient::list_files`] | `GET /buckets/{app}/{bucket}/files` |
//! | [`VBaseClient::delete_all_files`] | `DELETE /buckets/{app}/{bucket}/files` |
//! | [`VBaseClient::list_all_conflicts`] | `GET /buckets/{app}/{bucket}/conflicts` |
//! | [`VBaseClient::resolve_conflicts`] | `PATCH /buckets/{app}/{bucket}/conflicts` |
//! | [`VBaseChronosClient::get_json`] | `GET /buckets/{app}/{bucket}/config/files/{path}?atDate=` |
//! | [`VBaseChronosClient::save_json`] | `PUT /buckets/{app}/{bucket}/config/files/{path}` |

mod chronos;
mod client;
mod types;

pub use chronos::VBaseChronosClient;
pub use client::VBaseClient;
pub use types::{
    BucketResponse, Conflict, ConflictEntry, FileEntry, FileListResponse, FileResponse,
    ListOptions, OperationType, PatchOperation, PatchRequest, PatchValue, SaveFileOptions,
};
