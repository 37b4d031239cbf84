//! Bucket store client.
//!
//! # Examples
//!
//! ## Reading and writing JSON
//!
//! ```ignore
//! use platform_clients::client::ClientConfig;
//! use platform_clients::vbase::VBaseClient;
//!
//! #[tokio::main]
//! async fn main() -> platform_clients::Result<()> {
//!     let config = ClientConfig {
//!         account: "acme".into(),
//!         workspace: "dev".into(),
//!         user_agent: "my-app/1.0.0".into(),
//!         ..Default::default()
//!     };
//!     let client = VBaseClient::new(&config, None)?;
//!
//!     let etag = client.save_json("userdata", "prefs.json", &serde_json::json!({"theme": "dark"})).await?;
//!     let (prefs, _): (serde_json::Value, String) = client.get_json("userdata", "prefs.json").await?;
//!     println!("{} @ {}", prefs, etag);
//!     Ok(())
//! }
//! ```
//!
//! ## Resolving conflicts transparently
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! let client = VBaseClient::new(&config, Some(Arc::new(KeepMaster)))?;
//! // A 409 on this save runs KeepMaster, then replays the save once.
//! client.save_json("userdata", "prefs.json", &prefs).await?;
//! ```

use super::types::{
    BucketResponse, Conflict, ConflictListResponse, FileListResponse, FileResponse, ListOptions,
    PatchRequest, SaveFileOptions,
};
use crate::client::{CapturedRequest, ClientConfig, Pipeline, RawResponse, Transport};
use crate::conflict::{ConflictAware, ConflictInterceptor, ConflictResolver};
use crate::error::{ClientError, Result};
use crate::protocol::{paths, user_agent_name};
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

const SERVICE: &str = "vbase";
const DEFAULT_PAGE_SIZE: usize = 10;
const LIST_ALL_PAGE_SIZE: usize = 100;

/// Client of the versioned bucket store.
///
/// Cheap to clone; clones share the connection pool and the resolver.
#[derive(Clone)]
pub struct VBaseClient {
    pipeline: Pipeline,
    app_name: String,
    workspace: String,
    resolver: Option<Arc<dyn ConflictResolver<VBaseClient>>>,
    resolving_conflicts: bool,
}

impl VBaseClient {
    /// Create a client whose buckets belong to the app named by the user agent.
    ///
    /// Fails with [`ClientError::MissingUserAgent`] when the user agent is empty.
    pub fn new(
        config: &ClientConfig,
        resolver: Option<Arc<dyn ConflictResolver<VBaseClient>>>,
    ) -> Result<Self> {
        let app_name = user_agent_name(&config.user_agent);
        if app_name.is_empty() {
            return Err(ClientError::MissingUserAgent("VBase"));
        }
        Self::for_app(app_name, config, resolver)
    }

    /// Create a client for the buckets of `app_name`
    pub fn for_app(
        app_name: impl Into<String>,
        config: &ClientConfig,
        resolver: Option<Arc<dyn ConflictResolver<VBaseClient>>>,
    ) -> Result<Self> {
        let pipeline = Pipeline::new(SERVICE, config, true)?;
        Ok(Self::from_pipeline(pipeline, app_name, config, resolver))
    }

    /// Create a client sending through a custom transport
    pub fn with_transport(
        app_name: impl Into<String>,
        config: &ClientConfig,
        resolver: Option<Arc<dyn ConflictResolver<VBaseClient>>>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let pipeline = Pipeline::with_transport(SERVICE, config, true, transport)?;
        Ok(Self::from_pipeline(pipeline, app_name, config, resolver))
    }

    fn from_pipeline(
        pipeline: Pipeline,
        app_name: impl Into<String>,
        config: &ClientConfig,
        resolver: Option<Arc<dyn ConflictResolver<VBaseClient>>>,
    ) -> Self {
        Self {
            pipeline,
            app_name: app_name.into(),
            workspace: config.workspace.clone(),
            resolver,
            resolving_conflicts: false,
        }
    }

    /// Application owning the buckets
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Describe the current state of a bucket
    pub async fn get_bucket(&self, bucket: &str) -> Result<(BucketResponse, String)> {
        let request = self.request(Method::GET, paths::bucket(&self.app_name, bucket))?;
        let response = self.send_detecting(bucket, request).await?;
        Ok((response.json()?, response.etag()))
    }

    /// Set the lifecycle state of a bucket
    pub async fn set_bucket_state(&self, bucket: &str, state: &str) -> Result<()> {
        let request = self
            .request(Method::PUT, paths::bucket_state(&self.app_name, bucket))?
            .with_json(state)?;
        self.send_detecting(bucket, request).await?;
        Ok(())
    }

    /// Read a file's content
    pub async fn get_file(&self, bucket: &str, path: &str) -> Result<(FileResponse, String)> {
        let request = self.request(Method::GET, paths::file(&self.app_name, bucket, path))?;
        let response = self.send_detecting(bucket, request).await?;
        let etag = response.etag();
        let file = FileResponse {
            content_type: response.content_type(),
            body: response.body,
        };
        Ok((file, etag))
    }

    /// Read a file, assuming it is serialized as JSON
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        bucket: &str,
        path: &str,
    ) -> Result<(T, String)> {
        let (file, etag) = self.get_file(bucket, path).await?;
        Ok((file.json()?, etag))
    }

    /// Save raw content to a file, returning the new ETag
    pub async fn save_file(
        &self,
        bucket: &str,
        path: &str,
        body: impl Into<Bytes>,
        opts: SaveFileOptions,
    ) -> Result<String> {
        let mut request = self
            .request(Method::PUT, paths::file(&self.app_name, bucket, path))?
            .with_query("unzip", if opts.unzip { "true" } else { "false" })
            .with_body(body);
        if let Some(content_type) = opts.content_type.as_deref().filter(|c| !c.is_empty()) {
            request = request.with_header(CONTENT_TYPE, HeaderValue::from_str(content_type)?);
        }

        let response = if opts.ignore_conflicts {
            self.pipeline.send(request).await?
        } else {
            self.send_detecting(bucket, request).await?
        };
        Ok(response.etag())
    }

    /// Serialize `data` as JSON and save it, returning the new ETag
    pub async fn save_json<T: Serialize + ?Sized>(
        &self,
        bucket: &str,
        path: &str,
        data: &T,
    ) -> Result<String> {
        let request = self
            .request(Method::PUT, paths::file(&self.app_name, bucket, path))?
            .with_json(data)?;
        let response = self.send_detecting(bucket, request).await?;
        Ok(response.etag())
    }

    /// Delete a file
    pub async fn delete_file(&self, bucket: &str, path: &str) -> Result<()> {
        let request = self.request(Method::DELETE, paths::file(&self.app_name, bucket, path))?;
        self.send_detecting(bucket, request).await?;
        Ok(())
    }

    /// Delete every file of a bucket
    pub async fn delete_all_files(&self, bucket: &str) -> Result<()> {
        let request = self.request(Method::DELETE, paths::file_list(&self.app_name, bucket))?;
        self.send_detecting(bucket, request).await?;
        Ok(())
    }

    /// List one page of files
    pub async fn list_files(
        &self,
        bucket: &str,
        options: &ListOptions,
    ) -> Result<(FileListResponse, String)> {
        let limit = if options.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            options.limit
        };

        let request = self
            .request(Method::GET, paths::file_list(&self.app_name, bucket))?
            .with_query("prefix", &options.prefix)
            .with_query("_next", &options.marker)
            .with_query("_limit", &limit.to_string());
        let response = self.send_detecting(bucket, request).await?;
        Ok((response.json()?, response.etag()))
    }

    /// List every file under `prefix`, following the page cursor to the end.
    ///
    /// Entries are concatenated in page order; the returned ETag is the last page's.
    pub async fn list_all_files(
        &self,
        bucket: &str,
        prefix: &str,
    ) -> Result<(FileListResponse, String)> {
        let mut options = ListOptions {
            prefix: prefix.to_string(),
            marker: String::new(),
            limit: LIST_ALL_PAGE_SIZE,
        };

        let (mut list, mut etag) = self.list_files(bucket, &options).await?;
        while !list.next_marker.is_empty() {
            options.marker = std::mem::take(&mut list.next_marker);

            let (page, page_etag) = self.list_files(bucket, &options).await?;
            list.files.extend(page.files);
            list.next_marker = page.next_marker;
            etag = page_etag;
        }

        Ok((list, etag))
    }

    /// List the conflicts of a bucket. Never runs conflict detection.
    pub async fn list_all_conflicts(&self, bucket: &str) -> Result<Vec<Conflict>> {
        let request = self.request(Method::GET, paths::conflicts(&self.app_name, bucket))?;
        let response = self.pipeline.send(request).await?;
        let list: ConflictListResponse = response.json()?;
        Ok(list.data)
    }

    /// Apply a resolution patch to the conflicts of a bucket. Never runs conflict
    /// detection.
    pub async fn resolve_conflicts(&self, bucket: &str, patch: &PatchRequest) -> Result<()> {
        let request = self
            .request(Method::PATCH, paths::conflicts(&self.app_name, bucket))?
            .with_json(patch)?;
        self.pipeline.send(request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: paths::Segments) -> Result<CapturedRequest> {
        self.pipeline.request(method, path)
    }

    async fn send_detecting(&self, bucket: &str, request: CapturedRequest) -> Result<RawResponse> {
        match ConflictInterceptor::for_client(self, bucket) {
            Some(interceptor) => self.pipeline.send_with(request, &interceptor).await,
            None => self.pipeline.send(request).await,
        }
    }
}

impl ConflictAware for VBaseClient {
    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    fn workspace(&self) -> &str {
        &self.workspace
    }

    fn conflict_resolver(&self) -> Option<&Arc<dyn ConflictResolver<Self>>> {
        self.resolver.as_ref()
    }

    fn is_resolving_conflicts(&self) -> bool {
        self.resolving_conflicts
    }

    fn with_resolution_in_progress(&self) -> Self {
        Self {
            resolving_conflicts: true,
            ..self.clone()
        }
    }
}

impl fmt::Debug for VBaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VBaseClient")
            .field("base_url", &self.pipeline.base_url().as_str())
            .field("app_name", &self.app_name)
            .field("workspace", &self.workspace)
            .field("resolver", &self.resolver.is_some())
            .field("resolving_conflicts", &self.resolving_conflicts)
            .finish()
    }
}
