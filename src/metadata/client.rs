//! Metadata store client.

use super::types::{
    MetadataConflict, MetadataConflictListResponse, MetadataListOptions, MetadataListResponse,
    MetadataOperationType, MetadataPatchRequest,
};
use crate::client::{CapturedRequest, ClientConfig, Pipeline, RawResponse, Transport};
use crate::conflict::{ConflictAware, ConflictInterceptor, ConflictResolver};
use crate::error::{ClientError, Result};
use crate::protocol::{paths, user_agent_name};
use crate::vbase::BucketResponse;
use futures::future::join_all;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

const SERVICE: &str = "metadata";
const DEFAULT_PAGE_SIZE: usize = 10;
const LIST_ALL_PAGE_SIZE: usize = 100;

/// Client of the keyed metadata store.
///
/// A resolver is optional; when set it is called for every conflict detected by
/// the entry operations.
#[derive(Clone)]
pub struct MetadataClient {
    pipeline: Pipeline,
    app_name: String,
    workspace: String,
    resolver: Option<Arc<dyn ConflictResolver<MetadataClient>>>,
    resolving_conflicts: bool,
}

impl MetadataClient {
    /// Create a client whose buckets belong to the app named by the user agent
    pub fn new(
        config: &ClientConfig,
        resolver: Option<Arc<dyn ConflictResolver<MetadataClient>>>,
    ) -> Result<Self> {
        let app_name = user_agent_name(&config.user_agent);
        if app_name.is_empty() {
            return Err(ClientError::MissingUserAgent("Metadata"));
        }
        Self::for_app(app_name, config, resolver)
    }

    /// Create a client for the buckets of `app_name`
    pub fn for_app(
        app_name: impl Into<String>,
        config: &ClientConfig,
        resolver: Option<Arc<dyn ConflictResolver<MetadataClient>>>,
    ) -> Result<Self> {
        let pipeline = Pipeline::new(SERVICE, config, true)?;
        Ok(Self::from_pipeline(pipeline, app_name, config, resolver))
    }

    /// Create a client sending through a custom transport
    pub fn with_transport(
        app_name: impl Into<String>,
        config: &ClientConfig,
        resolver: Option<Arc<dyn ConflictResolver<MetadataClient>>>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let pipeline = Pipeline::with_transport(SERVICE, config, true, transport)?;
        Ok(Self::from_pipeline(pipeline, app_name, config, resolver))
    }

    fn from_pipeline(
        pipeline: Pipeline,
        app_name: impl Into<String>,
        config: &ClientConfig,
        resolver: Option<Arc<dyn ConflictResolver<MetadataClient>>>,
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
        let response = self.pipeline.send(request).await?;
        Ok((response.json()?, response.etag()))
    }

    /// Set the lifecycle state of a bucket
    pub async fn set_bucket_state(&self, bucket: &str, state: &str) -> Result<()> {
        let request = self
            .request(Method::PUT, paths::bucket_state(&self.app_name, bucket))?
            .with_json(state)?;
        self.pipeline.send(request).await?;
        Ok(())
    }

    /// List one page of entries
    pub async fn list(
        &self,
        bucket: &str,
        options: &MetadataListOptions,
    ) -> Result<(MetadataListResponse, String)> {
        let limit = if options.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            options.limit
        };

        let request = self
            .request(Method::GET, paths::metadata(&self.app_name, bucket))?
            .with_query("value", if options.include_value { "true" } else { "false" })
            .with_query("_limit", &limit.to_string())
            .with_query("_marker", &options.marker);
        let response = self.send_detecting(bucket, request).await?;
        Ok((response.json()?, response.etag()))
    }

    /// List every entry, following the page cursor to the end
    pub async fn list_all(
        &self,
        bucket: &str,
        include_value: bool,
    ) -> Result<(MetadataListResponse, String)> {
        let mut options = MetadataListOptions {
            include_value,
            limit: LIST_ALL_PAGE_SIZE,
            marker: String::new(),
        };

        let (mut list, mut etag) = self.list(bucket, &options).await?;
        while !list.next_marker.is_empty() {
            options.marker = std::mem::take(&mut list.next_marker);

            let (page, page_etag) = self.list(bucket, &options).await?;
            list.data.extend(page.data);
            list.next_marker = page.next_marker;
            etag = page_etag;
        }

        Ok((list, etag))
    }

    /// Read the JSON value of `key`
    pub async fn get<T: DeserializeOwned>(&self, bucket: &str, key: &str) -> Result<(T, String)> {
        let request = self.request(Method::GET, paths::metadata_key(&self.app_name, bucket, key))?;
        let response = self.send_detecting(bucket, request).await?;
        Ok((response.json()?, response.etag()))
    }

    /// Save `data` under `key`, returning the new ETag
    pub async fn save<T: Serialize + ?Sized>(
        &self,
        bucket: &str,
        key: &str,
        data: &T,
    ) -> Result<String> {
        let request = self
            .request(Method::PUT, paths::metadata_key(&self.app_name, bucket, key))?
            .with_json(data)?;
        let response = self.send_detecting(bucket, request).await?;
        Ok(response.etag())
    }

    /// Save several keys at once, returning the new ETag
    pub async fn save_all(&self, bucket: &str, data: &Map<String, Value>) -> Result<String> {
        let request = self
            .request(Method::PUT, paths::metadata(&self.app_name, bucket))?
            .with_json(data)?;
        let response = self.send_detecting(bucket, request).await?;
        Ok(response.etag())
    }

    /// Delete `key`; `Ok(false)` when it did not exist
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<bool> {
        let request = self.request(
            Method::DELETE,
            paths::metadata_key(&self.app_name, bucket, key),
        )?;
        match self.send_detecting(bucket, request).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete every entry of a bucket
    pub async fn delete_all(&self, bucket: &str) -> Result<()> {
        let request = self.request(Method::DELETE, paths::metadata(&self.app_name, bucket))?;
        self.pipeline.send(request).await?;
        Ok(())
    }

    /// Apply a patch: `add`/`replace` operations are saved in one request while
    /// `remove` operations run concurrently. All failures are reported together.
    pub async fn do_all(&self, bucket: &str, patch: &MetadataPatchRequest) -> Result<()> {
        let mut to_save = Map::new();
        let mut to_delete = Vec::new();
        for op in patch {
            match op.kind {
                MetadataOperationType::Add | MetadataOperationType::Replace => {
                    to_save.insert(op.key.clone(), op.value.clone().unwrap_or(Value::Null));
                }
                MetadataOperationType::Remove => to_delete.push(op.key.as_str()),
            }
        }

        let deletes = join_all(to_delete.iter().map(|key| async move {
            self.delete(bucket, key)
                .await
                .map_err(|e| format!("Delete {}: {}", key, e))
        }));
        let save = async {
            if to_save.is_empty() {
                return Ok(());
            }
            self.save_all(bucket, &to_save).await.map(|_| ()).map_err(|e| {
                let keys: Vec<&String> = to_save.keys().collect();
                format!("Save keys {:?}: {}", keys, e)
            })
        };
        let (delete_results, save_result) = futures::join!(deletes, save);

        let errors: Vec<String> = delete_results
            .into_iter()
            .filter_map(|r| r.err())
            .chain(save_result.err())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Patch {
                bucket: bucket.to_string(),
                errors,
            })
        }
    }

    /// List the conflicts of a bucket. Never runs conflict detection.
    pub async fn list_all_conflicts(&self, bucket: &str) -> Result<Vec<MetadataConflict>> {
        let request = self.request(Method::GET, paths::conflicts(&self.app_name, bucket))?;
        let response = self.pipeline.send(request).await?;
        let list: MetadataConflictListResponse = response.json()?;
        Ok(list.data)
    }

    /// Apply a resolution patch to the conflicts of a bucket. Never runs conflict
    /// detection.
    pub async fn resolve_conflicts(
        &self,
        bucket: &str,
        patch: &MetadataPatchRequest,
    ) -> Result<()> {
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

impl ConflictAware for MetadataClient {
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

impl fmt::Debug for MetadataClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataClient")
            .field("base_url", &self.pipeline.base_url().as_str())
            .field("app_name", &self.app_name)
            .field("workspace", &self.workspace)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}
