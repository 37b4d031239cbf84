//! Date-addressed bucket store client.
//!
//! Chronos keeps every saved version of a configuration file. Reads can ask for the
//! version that was current at a given instant. This store never detects conflicts.

use crate::client::{CapturedRequest, ClientConfig, Pipeline, Transport};
use crate::error::{ClientError, Result};
use crate::protocol::{paths, user_agent_name};
use chrono::{DateTime, SecondsFormat, Utc};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const SERVICE: &str = "vbase";

/// Client of the date-addressed configuration store.
#[derive(Clone)]
pub struct VBaseChronosClient {
    pipeline: Pipeline,
    app_name: String,
}

impl VBaseChronosClient {
    /// Create a client whose buckets belong to the app named by the user agent
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let app_name = user_agent_name(&config.user_agent);
        if app_name.is_empty() {
            return Err(ClientError::MissingUserAgent("VBaseChronos"));
        }
        Self::for_app(app_name, config)
    }

    /// Create a client for the buckets of `app_name`
    pub fn for_app(app_name: impl Into<String>, config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            pipeline: Pipeline::new(SERVICE, config, true)?,
            app_name: app_name.into(),
        })
    }

    /// Create a client sending through a custom transport
    pub fn with_transport(
        app_name: impl Into<String>,
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        Ok(Self {
            pipeline: Pipeline::with_transport(SERVICE, config, true, transport)?,
            app_name: app_name.into(),
        })
    }

    /// Application owning the buckets
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Read a JSON file as it was at `at`, or its latest version when `None`.
    ///
    /// The instant is sent as an RFC 3339 `atDate` query parameter, in whole seconds.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        bucket: &str,
        path: &str,
        at: Option<DateTime<Utc>>,
    ) -> Result<(T, String)> {
        let mut request =
            self.request(Method::GET, paths::chronos_file(&self.app_name, bucket, path))?;
        if let Some(at) = at {
            let at = at.to_rfc3339_opts(SecondsFormat::Secs, true);
            request = request.with_query("atDate", &at);
        }

        let response = self.pipeline.send(request).await?;
        Ok((response.json()?, response.etag()))
    }

    /// Save a new version of a JSON file, returning its ETag
    pub async fn save_json<T: Serialize + ?Sized>(
        &self,
        bucket: &str,
        path: &str,
        data: &T,
    ) -> Result<String> {
        let request = self
            .request(Method::PUT, paths::chronos_file(&self.app_name, bucket, path))?
            .with_json(data)?;
        let response = self.pipeline.send(request).await?;
        Ok(response.etag())
    }

    /// Delete a file from the workspace's regular file store
    pub async fn delete_file(&self, bucket: &str, path: &str) -> Result<()> {
        let request = self.request(Method::DELETE, paths::file(&self.app_name, bucket, path))?;
        self.pipeline.send(request).await?;
        Ok(())
    }

    fn request(&self, method: Method, path: paths::Segments) -> Result<CapturedRequest> {
        self.pipeline.request(method, path)
    }
}

impl std::fmt::Debug for VBaseChronosClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VBaseChronosClient")
            .field("base_url", &self.pipeline.base_url().as_str())
            .field("app_name", &self.app_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::headers;
    use crate::testing::{self, ScriptedTransport};
    use chrono::TimeZone;
    use http::StatusCode;
    use serde_json::{json, Value};

    fn client(transport: Arc<ScriptedTransport>) -> VBaseChronosClient {
        VBaseChronosClient::with_transport("my-app", &testing::config("dev"), transport).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_at_date() {
        let transport = Arc::new(ScriptedTransport::new([testing::json(
            StatusCode::OK,
            "c1",
            r#"{"flag":true}"#,
        )]));
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let (value, etag): (Value, String) = client(transport.clone())
            .get_json("settings", "flags.json", Some(at))
            .await
            .unwrap();

        assert_eq!(value, json!({"flag": true}));
        assert_eq!(etag, "c1");
        let sent = &transport.sent()[0];
        assert_eq!(
            sent.url.path(),
            "/acme/dev/buckets/my-app/settings/config/files/flags.json"
        );
        let pairs: Vec<(String, String)> = sent.url.query_pairs().into_owned().collect();
        assert_eq!(pairs, vec![("atDate".to_string(), "2024-03-01T12:30:00Z".to_string())]);
    }

    #[tokio::test]
    async fn test_get_json_without_date_has_no_query() {
        let transport =
            Arc::new(ScriptedTransport::new([testing::json(StatusCode::OK, "c2", "3")]));

        let (value, _): (u32, String) = client(transport.clone())
            .get_json("settings", "n.json", None)
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(transport.sent()[0].url.query(), None);
    }

    #[tokio::test]
    async fn test_never_detects_conflicts() {
        let transport = Arc::new(ScriptedTransport::new([testing::status(StatusCode::CONFLICT)]));

        let err = client(transport.clone())
            .save_json("settings", "flags.json", &json!({"flag": false}))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::PUT);
        assert!(sent[0].headers.get(headers::DETECT_CONFLICTS).is_none());
    }

    #[tokio::test]
    async fn test_delete_targets_file_store() {
        let transport = Arc::new(ScriptedTransport::new([]));
        client(transport.clone())
            .delete_file("settings", "flags.json")
            .await
            .unwrap();

        let sent = &transport.sent()[0];
        assert_eq!(sent.method, Method::DELETE);
        assert_eq!(sent.url.path(), "/acme/dev/buckets/my-app/settings/files/flags.json");
    }

    #[test]
    fn test_missing_user_agent() {
        let config = ClientConfig {
            user_agent: String::new(),
            ..testing::config("dev")
        };
        assert!(matches!(
            VBaseChronosClient::new(&config),
            Err(ClientError::MissingUserAgent("VBaseChronos"))
        ));
    }
}
