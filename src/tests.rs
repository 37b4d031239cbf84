//! End-to-end tests of the clients against a mock HTTP server.

use crate::client::{ClientConfig, IoHeadersRecorder};
use crate::conflict::{ConflictResolver, DeclineResolver};
use crate::error::{ClientError, Result};
use crate::metadata::MetadataClient;
use crate::protocol::constants::headers;
use crate::vbase::{PatchOperation, VBaseClient};
use async_trait::async_trait;
use mockito::Matcher;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const DETECT: &str = "x-vtex-detect-conflicts";

fn config(server: &mockito::ServerGuard, workspace: &str) -> ClientConfig {
    ClientConfig {
        account: "acme".into(),
        workspace: workspace.into(),
        endpoint: Some(server.url()),
        auth_token: Some("tok".into()),
        user_agent: "my-app/1.0.0".into(),
        ..Default::default()
    }
}

/// Keeps the writer's version of every conflicting file.
#[derive(Default)]
struct KeepMine {
    calls: AtomicUsize,
    nested_conflicts: AtomicUsize,
}

#[async_trait]
impl ConflictResolver<VBaseClient> for KeepMine {
    async fn resolve(&self, client: &VBaseClient, bucket: &str) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let conflicts = client.list_all_conflicts(bucket).await?;
        let mut patch = Vec::new();
        for conflict in conflicts {
            match client.get_file(bucket, &conflict.path).await {
                Err(e) if e.is_conflict() => {
                    self.nested_conflicts.fetch_add(1, Ordering::SeqCst);
                }
                other => {
                    other?;
                }
            }

            let mine = conflict.mine.unwrap_or_default();
            let content: serde_json::Value = match mine.known_content() {
                Some(bytes) => serde_json::from_slice(bytes)?,
                None => return Ok(false),
            };
            patch.push(PatchOperation::replace(conflict.path, mine.mime_type, content));
        }

        client.resolve_conflicts(bucket, &patch).await?;
        Ok(true)
    }
}

struct AlwaysResolved(AtomicUsize);

#[async_trait]
impl ConflictResolver<VBaseClient> for AlwaysResolved {
    async fn resolve(&self, _client: &VBaseClient, _bucket: &str) -> Result<bool> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}

#[tokio::test]
async fn test_conflict_resolved_and_replayed() {
    crate::testing::init_tracing();
    let mut server = mockito::Server::new_async().await;
    let file_path = "/acme/dev/buckets/my-app/userdata/files/prefs.json";
    let body = json!({"theme": "dark"});

    let first = server
        .mock("PUT", file_path)
        .match_header(DETECT, "true")
        .match_body(Matcher::Json(body.clone()))
        .with_status(409)
        .with_body(r#"{"code":"Conflict","message":"diverged"}"#)
        .expect(1)
        .create_async()
        .await;
    let replay = server
        .mock("PUT", file_path)
        .match_header(DETECT, "true")
        .match_body(Matcher::Json(body.clone()))
        .with_status(200)
        .with_header("etag", "h2")
        .expect(1)
        .create_async()
        .await;
    let list_conflicts = server
        .mock("GET", "/acme/dev/buckets/my-app/userdata/conflicts")
        .match_header(DETECT, Matcher::Missing)
        .with_status(200)
        .with_body(
            json!({"data": [{
                "path": "prefs.json",
                "base": null,
                "mine": {"deleted": false, "mimeType": "application/json", "content": "eyJ0aGVtZSI6ImRhcmsifQ==", "contentOmitted": false},
                "master": {"deleted": false, "mimeType": "application/json", "content": "", "contentOmitted": true}
            }]})
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let nested_read = server
        .mock("GET", file_path)
        .match_header(DETECT, Matcher::Missing)
        .with_status(409)
        .expect(1)
        .create_async()
        .await;
    let resolve = server
        .mock("PATCH", "/acme/dev/buckets/my-app/userdata/conflicts")
        .match_header(DETECT, Matcher::Missing)
        .match_body(Matcher::Json(json!([
            {"op": "replace", "path": "prefs.json", "value": {"mimeType": "application/json", "content": {"theme": "dark"}}}
        ])))
        .with_status(204)
        .expect(1)
        .create_async()
        .await;

    let recorder = Arc::new(IoHeadersRecorder::new(None));
    let resolver = Arc::new(KeepMine::default());
    let client = VBaseClient::new(
        &config(&server, "dev").with_recorder(recorder.clone()),
        Some(resolver.clone()),
    )
    .unwrap();

    let etag = client.save_json("userdata", "prefs.json", &body).await.unwrap();

    assert_eq!(etag, "h2");
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(resolver.nested_conflicts.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.recorded(&headers::SOLVED_CONFLICTS), vec!["userdata"]);

    first.assert_async().await;
    replay.assert_async().await;
    list_conflicts.assert_async().await;
    nested_read.assert_async().await;
    resolve.assert_async().await;
}

#[tokio::test]
async fn test_persistent_conflict_stops_after_one_replay() {
    let mut server = mockito::Server::new_async().await;
    let put = server
        .mock("PUT", "/acme/dev/buckets/my-app/userdata/files/a.json")
        .match_header(DETECT, "true")
        .with_status(409)
        .expect(2)
        .create_async()
        .await;

    let resolver = Arc::new(AlwaysResolved(AtomicUsize::new(0)));
    let client = VBaseClient::new(&config(&server, "dev"), Some(resolver.clone())).unwrap();

    let err = client.save_json("userdata", "a.json", &json!(1)).await.unwrap_err();

    assert!(matches!(err, ClientError::StillConflicting { ref bucket } if bucket == "userdata"));
    assert!(err.to_string().contains("still has conflicts"));
    assert_eq!(resolver.0.load(Ordering::SeqCst), 1);
    put.assert_async().await;
}

#[tokio::test]
async fn test_no_resolver_returns_conflict() {
    let mut server = mockito::Server::new_async().await;
    let put = server
        .mock("PUT", "/acme/dev/buckets/my-app/userdata/files/a.json")
        .match_header(DETECT, Matcher::Missing)
        .with_status(409)
        .with_body(r#"{"code":"Conflict","message":"diverged"}"#)
        .expect(1)
        .create_async()
        .await;

    let client = VBaseClient::new(&config(&server, "dev"), None).unwrap();
    let err = client.save_json("userdata", "a.json", &json!(1)).await.unwrap_err();

    match err {
        ClientError::Response { status, code, message, .. } => {
            assert_eq!(status.as_u16(), 409);
            assert_eq!(code, "Conflict");
            assert_eq!(message, "diverged");
        }
        other => panic!("unexpected: {:?}", other),
    }
    put.assert_async().await;
}

#[tokio::test]
async fn test_master_workspace_never_detects() {
    let mut server = mockito::Server::new_async().await;
    let put = server
        .mock("PUT", "/acme/master/buckets/my-app/userdata/files/a.json")
        .match_header(DETECT, Matcher::Missing)
        .with_status(409)
        .expect(1)
        .create_async()
        .await;

    let resolver = Arc::new(AlwaysResolved(AtomicUsize::new(0)));
    let client = VBaseClient::new(&config(&server, "master"), Some(resolver.clone())).unwrap();
    let err = client.save_json("userdata", "a.json", &json!(1)).await.unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(resolver.0.load(Ordering::SeqCst), 0);
    put.assert_async().await;
}

#[tokio::test]
async fn test_list_all_files_follows_markers() {
    let mut server = mockito::Server::new_async().await;
    let path = Matcher::Regex(r"^/acme/dev/buckets/my-app/img/files(\?.*)?$".to_string());
    let page = |marker: &str| {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("prefix".into(), "thumbs/".into()),
            Matcher::UrlEncoded("_next".into(), marker.into()),
            Matcher::UrlEncoded("_limit".into(), "100".into()),
        ])
    };

    let p1 = server
        .mock("GET", path.clone())
        .match_query(page(""))
        .with_status(200)
        .with_header("etag", "e1")
        .with_body(r#"{"data":[{"path":"thumbs/1"},{"path":"thumbs/2"}],"next":"m1"}"#)
        .expect(1)
        .create_async()
        .await;
    let p2 = server
        .mock("GET", path.clone())
        .match_query(page("m1"))
        .with_status(200)
        .with_header("etag", "e2")
        .with_body(r#"{"data":[{"path":"thumbs/3"}],"next":"m2"}"#)
        .expect(1)
        .create_async()
        .await;
    let p3 = server
        .mock("GET", path)
        .match_query(page("m2"))
        .with_status(200)
        .with_header("etag", "e3")
        .with_body(r#"{"data":[{"path":"thumbs/4"}],"next":""}"#)
        .expect(1)
        .create_async()
        .await;

    let client = VBaseClient::new(&config(&server, "dev"), None).unwrap();
    let (list, etag) = client.list_all_files("img", "thumbs/").await.unwrap();

    let paths: Vec<&str> = list.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, vec!["thumbs/1", "thumbs/2", "thumbs/3", "thumbs/4"]);
    assert!(list.next_marker.is_empty());
    assert_eq!(etag, "e3");
    p1.assert_async().await;
    p2.assert_async().await;
    p3.assert_async().await;
}

#[tokio::test]
async fn test_metadata_declined_resolution() {
    let mut server = mockito::Server::new_async().await;
    let put = server
        .mock("PUT", "/acme/dev/buckets/my-app/settings/metadata/k")
        .match_header(DETECT, "true")
        .with_status(409)
        .expect(1)
        .create_async()
        .await;

    let client =
        MetadataClient::new(&config(&server, "dev"), Some(Arc::new(DeclineResolver))).unwrap();
    let err = client.save("settings", "k", &json!({"a": 1})).await.unwrap_err();

    assert!(matches!(err, ClientError::ConflictsNotSolved { ref bucket } if bucket == "settings"));
    put.assert_async().await;
}

#[tokio::test]
async fn test_transport_error_is_terminal() {
    let config = ClientConfig {
        account: "acme".into(),
        workspace: "dev".into(),
        endpoint: Some("127.0.0.1:1".into()),
        user_agent: "my-app/1.0.0".into(),
        request_timeout_ms: 1000,
        ..Default::default()
    };
    let resolver = Arc::new(AlwaysResolved(AtomicUsize::new(0)));
    let client = VBaseClient::new(&config, Some(resolver.clone())).unwrap();

    let err = client.get_bucket("userdata").await.unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)));
    assert_eq!(resolver.0.load(Ordering::SeqCst), 0);
}
