//! Bucket store reads with a metadata store fallback.
//!
//! Used while migrating data from the metadata store to the bucket store: a read that
//! misses the bucket store is served from the metadata bucket and written back to
//! the bucket store, so the next read hits.

use crate::client::ClientConfig;
use crate::conflict::ConflictAware;
use crate::error::Result;
use crate::metadata::MetadataClient;
use crate::vbase::VBaseClient;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Bucket store client that falls back to the metadata store on reads.
#[derive(Clone, Debug)]
pub struct VBaseWithFallback {
    vbase: VBaseClient,
    metadata: MetadataClient,
}

impl VBaseWithFallback {
    /// Create both clients from one configuration, without conflict resolvers
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            vbase: VBaseClient::new(config, None)?,
            metadata: MetadataClient::new(config, None)?,
        })
    }

    /// Combine existing clients
    pub fn from_clients(vbase: VBaseClient, metadata: MetadataClient) -> Self {
        Self { vbase, metadata }
    }

    /// Read `path` from `bucket`; on any failure read `path` from
    /// `metadata_bucket` and copy it into `bucket`.
    ///
    /// Returns the value and the bucket store ETag.
    pub async fn get_json<T: DeserializeOwned + Serialize>(
        &self,
        bucket: &str,
        path: &str,
        metadata_bucket: &str,
    ) -> Result<(T, String)> {
        match self.vbase.get_json::<T>(bucket, path).await {
            Ok(found) => Ok(found),
            Err(e) => {
                if self.vbase.pipeline().logging_enabled() {
                    tracing::debug!(
                        bucket,
                        path,
                        error = %e,
                        "bucket store miss, reading metadata"
                    );
                }
                let (data, _) = self.metadata.get::<T>(metadata_bucket, path).await?;
                let etag = self.vbase.save_json(bucket, path, &data).await?;
                Ok((data, etag))
            }
        }
    }

    /// Save to the bucket store
    pub async fn save_json<T: Serialize + ?Sized>(
        &self,
        bucket: &str,
        path: &str,
        data: &T,
    ) -> Result<String> {
        self.vbase.save_json(bucket, path, data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, ScriptedTransport};
    use http::{Method, StatusCode};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    #[tokio::test]
    async fn test_migrates_from_metadata() {
        let vbase_transport = Arc::new(ScriptedTransport::new([
            testing::status(StatusCode::NOT_FOUND),
            testing::json(StatusCode::OK, "v2", ""),
        ]));
        let metadata_transport = Arc::new(ScriptedTransport::new([testing::json(
            StatusCode::OK,
            "m1",
            r#"{"theme":"dark"}"#,
        )]));
        let config = testing::config("dev");
        let client = VBaseWithFallback::from_clients(
            VBaseClient::with_transport("my-app", &config, None, vbase_transport.clone()).unwrap(),
            MetadataClient::with_transport("my-app", &config, None, metadata_transport.clone())
                .unwrap(),
        );

        let (value, etag): (Value, String) =
            client.get_json("userdata", "prefs", "legacy").await.unwrap();

        assert_eq!(value, json!({"theme": "dark"}));
        assert_eq!(etag, "v2");
        let saved = &vbase_transport.sent()[1];
        assert_eq!(saved.method, Method::PUT);
        assert_eq!(&saved.body[..], br#"{"theme":"dark"}"#);
        assert!(metadata_transport.sent()[0]
            .url
            .path()
            .ends_with("/buckets/my-app/legacy/metadata/prefs"));
    }

    #[tokio::test]
    async fn test_hit_skips_metadata() {
        let vbase_transport =
            Arc::new(ScriptedTransport::new([testing::json(StatusCode::OK, "v1", "7")]));
        let metadata_transport = Arc::new(ScriptedTransport::new([]));
        let config = testing::config("dev");
        let client = VBaseWithFallback::from_clients(
            VBaseClient::with_transport("my-app", &config, None, vbase_transport).unwrap(),
            MetadataClient::with_transport("my-app", &config, None, metadata_transport.clone())
                .unwrap(),
        );

        let (value, etag): (u32, String) = client.get_json("b", "n", "legacy").await.unwrap();

        assert_eq!((value, etag.as_str()), (7, "v1"));
        assert!(metadata_transport.sent().is_empty());
    }

    #[derive(Clone, Default)]
    struct EventCount(Arc<AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for EventCount {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_quiet_when_logging_disabled() {
        let vbase_transport =
            Arc::new(ScriptedTransport::new([testing::status(StatusCode::NOT_FOUND)]));
        let metadata_transport =
            Arc::new(ScriptedTransport::new([testing::json(StatusCode::OK, "m1", "1")]));
        let config = ClientConfig {
            enable_logging: false,
            ..testing::config("dev")
        };
        let client = VBaseWithFallback::from_clients(
            VBaseClient::with_transport("my-app", &config, None, vbase_transport).unwrap(),
            MetadataClient::with_transport("my-app", &config, None, metadata_transport).unwrap(),
        );

        let events = EventCount::default();
        let subscriber = tracing_subscriber::registry().with(events.clone());
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("baseline");
            let (value, _): (u32, String) =
                tokio_test::block_on(client.get_json("b", "n", "legacy")).unwrap();
            assert_eq!(value, 1);
        });

        assert_eq!(events.0.load(Ordering::SeqCst), 1);
    }
}
