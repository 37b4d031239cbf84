//! The conflict-detection interceptor.
//!
//! # State Machine
//!
//! ```text
//!                 ┌──────────── status != 409 ───────────────► pass through
//!   send ─► response
//!                 └─ 409 ─► resolve ─┬─ Err ──────────────────► ResolutionFailed
//!                                    ├─ Ok(false) ────────────► ConflictsNotSolved
//!                                    └─ Ok(true) ─► replay ─┬─ 409 ─► StillConflicting
//!                                                           └─ other ─► response + X-Vtex-Solved-Conflicts
//! ```
//!
//! The replay sends the exact request the first attempt sent, at most once, and only
//! after the resolver returned.

use super::resolver::{run_resolver, ConflictAware, ConflictResolver};
use crate::client::{CapturedRequest, Interceptor, Pipeline, RawResponse};
use crate::error::{ClientError, Result};
use crate::protocol::constants::{headers, MASTER_WORKSPACE};
use async_trait::async_trait;
use http::{HeaderValue, StatusCode};

/// Interceptor resolving 409 responses for one bucket.
pub struct ConflictInterceptor<'a, C: ConflictAware> {
    client: &'a C,
    resolver: &'a dyn ConflictResolver<C>,
    bucket: &'a str,
}

impl<'a, C: ConflictAware> ConflictInterceptor<'a, C> {
    /// Interceptor for a call on `client` against `bucket`.
    ///
    /// Returns `None` when detection does not apply: no resolver is configured, the
    /// client is already resolving conflicts, or it is bound to the master workspace.
    pub fn for_client(client: &'a C, bucket: &'a str) -> Option<Self> {
        if client.is_resolving_conflicts() || client.workspace() == MASTER_WORKSPACE {
            return None;
        }
        let resolver = client.conflict_resolver()?;

        Some(Self {
            client,
            resolver: resolver.as_ref(),
            bucket,
        })
    }

    /// Bucket this interceptor resolves conflicts for
    pub fn bucket(&self) -> &str {
        self.bucket
    }
}

#[async_trait]
impl<'a, C: ConflictAware> Interceptor for ConflictInterceptor<'a, C> {
    fn before_send(&self, request: &mut CapturedRequest) -> Result<()> {
        request
            .headers
            .insert(headers::DETECT_CONFLICTS, HeaderValue::from_static("true"));
        Ok(())
    }

    async fn after_receive(
        &self,
        pipeline: &Pipeline,
        request: &CapturedRequest,
        response: RawResponse,
    ) -> Result<RawResponse> {
        if response.status != StatusCode::CONFLICT {
            return Ok(response);
        }

        let logging = pipeline.logging_enabled();
        if logging {
            tracing::info!(
                bucket = self.bucket,
                url = %request.url,
                "conflict detected, resolving"
            );
        }

        if let Err(e) = run_resolver(self.client, self.resolver, self.bucket).await {
            if logging {
                tracing::warn!(
                    bucket = self.bucket,
                    error = %e,
                    "conflict resolution did not succeed"
                );
            }
            return Err(e);
        }

        let mut replayed = pipeline.dispatch(request).await.map_err(|e| match e {
            ClientError::Transport(msg) => ClientError::Transport(format!(
                "retrying request after conflicts resolution: {}",
                msg
            )),
            other => other,
        })?;

        if replayed.status == StatusCode::CONFLICT {
            if logging {
                tracing::warn!(
                    bucket = self.bucket,
                    url = %request.url,
                    "conflict persisted after resolution"
                );
            }
            return Err(ClientError::StillConflicting {
                bucket: self.bucket.to_string(),
            });
        }

        replayed
            .headers
            .insert(headers::SOLVED_CONFLICTS, HeaderValue::from_str(self.bucket)?);
        if logging {
            tracing::info!(
                bucket = self.bucket,
                status = replayed.status.as_u16(),
                "conflicts solved, request replayed"
            );
        }

        Ok(replayed)
    }
}
