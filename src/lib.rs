#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Platform clients
//!
//! Typed asynchronous clients for the platform storage services, built on a shared
//! request pipeline that handles endpoints, authentication, request ids and
//! response-header recording.
//!
//! ## Conflict resolution
//!
//! Buckets are shared by concurrent writers. When a client is given a
//! [`ConflictResolver`], every bucket operation asks the store to detect conflicts.
//! A `409 Conflict` then triggers one resolve-and-replay cycle:
//!
//! - the resolver runs against a guarded copy of the client, which never detects
//!   conflicts itself
//! - a declined or failed resolution is returned to the caller as is
//! - the original request is replayed exactly once with the same bytes
//! - a second 409 is terminal
//! - a successful replay carries `X-Vtex-Solved-Conflicts: <bucket>`
//!
//! The master workspace never detects conflicts.
//!
//! ## Usage
//!
//! ```ignore
//! use platform_clients::{ClientConfig, ConflictResolver, VBaseClient};
//! use platform_clients::vbase::PatchOperation;
//! use std::sync::Arc;
//!
//! struct KeepMaster;
//!
//! #[async_trait::async_trait]
//! impl ConflictResolver<VBaseClient> for KeepMaster {
//!     async fn resolve(&self, client: &VBaseClient, bucket: &str) -> platform_clients::Result<bool> {
//!         let conflicts = client.list_all_conflicts(bucket).await?;
//!         let patch = conflicts.iter().map(|c| PatchOperation::remove(&c.path)).collect();
//!         client.resolve_conflicts(bucket, &patch).await?;
//!         Ok(true)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> platform_clients::Result<()> {
//!     let config = ClientConfig {
//!         account: "acme".into(),
//!         workspace: "dev".into(),
//!         user_agent: "my-app/1.0.0".into(),
//!         ..Default::default()
//!     };
//!     let client = VBaseClient::new(&config, Some(Arc::new(KeepMaster)))?;
//!     client.save_json("userdata", "prefs.json", &serde_json::json!({"theme": "dark"})).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[client]** - Configuration, transport, pipeline and recorders
//! - **[conflict]** - Conflict resolver contract and interceptor
//! - **[vbase]** - Versioned bucket store client and its date-addressed variant
//! - **[metadata]** - Keyed metadata store client
//! - **[fallback]** - Bucket store reads with metadata fallback
//! - **[protocol]** - Header names, endpoint paths and parsing helpers
//! - **[error]** - Error types and result handling

pub mod client;
pub mod conflict;
pub mod error;
pub mod fallback;
pub mod metadata;
pub mod protocol;
pub mod vbase;

pub use client::{ClientConfig, IoHeadersRecorder, Pipeline, RequestRecorder};
pub use conflict::{ConflictResolver, DeclineResolver};
pub use error::{ClientError, Result};
pub use fallback::VBaseWithFallback;
pub use metadata::MetadataClient;
pub use vbase::{VBaseChronosClient, VBaseClient};

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;
