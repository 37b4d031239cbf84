//! The resolver contract.

use crate::client::Pipeline;
use crate::error::{ClientError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Application-supplied conflict resolution strategy.
///
/// `client` is a copy of the calling client with the resolution guard set: calls made
/// through it never trigger conflict detection again, so the resolver is free to list
/// conflicts, read or write the bucket, and patch the conflict set.
///
/// Return `Ok(true)` once the conflicts are gone, `Ok(false)` to decline (the caller
/// then gets [`ClientError::ConflictsNotSolved`]), or an error when the attempt failed
/// mechanically (the caller then gets [`ClientError::ResolutionFailed`]). Nothing is
/// retried automatically in either failure case.
///
/// # Examples
///
/// ```ignore
/// use platform_clients::conflict::ConflictResolver;
/// use platform_clients::vbase::{PatchOperation, VBaseClient};
///
/// struct KeepMaster;
///
/// #[async_trait::async_trait]
/// impl ConflictResolver<VBaseClient> for KeepMaster {
///     async fn resolve(&self, client: &VBaseClient, bucket: &str) -> platform_clients::Result<bool> {
///         let conflicts = client.list_all_conflicts(bucket).await?;
///         let patch = conflicts.iter().map(|c| PatchOperation::remove(&c.path)).collect();
///         client.resolve_conflicts(bucket, &patch).await?;
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait ConflictResolver<C>: Send + Sync {
    /// Resolve the conflicts of `bucket`
    async fn resolve(&self, client: &C, bucket: &str) -> Result<bool>;
}

/// Resolver that declines every conflict.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineResolver;

#[async_trait]
impl<C: Sync> ConflictResolver<C> for DeclineResolver {
    async fn resolve(&self, _client: &C, _bucket: &str) -> Result<bool> {
        Ok(false)
    }
}

/// A client that speaks the conflict protocol.
///
/// The guard is a plain value: [`with_resolution_in_progress`](Self::with_resolution_in_progress)
/// returns a new client with the flag set and leaves `self` untouched, so concurrent
/// calls on the original client keep detecting conflicts.
pub trait ConflictAware: Sized + Send + Sync {
    /// Pipeline requests are sent through
    fn pipeline(&self) -> &Pipeline;

    /// Workspace the client is bound to
    fn workspace(&self) -> &str;

    /// Configured resolver, if any
    fn conflict_resolver(&self) -> Option<&Arc<dyn ConflictResolver<Self>>>;

    /// Whether this client is the handle given to a running resolver
    fn is_resolving_conflicts(&self) -> bool;

    /// Copy of this client with the resolution guard set
    fn with_resolution_in_progress(&self) -> Self;
}

/// Run `resolver` for `bucket` through a guarded copy of `client`.
pub(crate) async fn run_resolver<C: ConflictAware>(
    client: &C,
    resolver: &dyn ConflictResolver<C>,
    bucket: &str,
) -> Result<()> {
    let guarded = client.with_resolution_in_progress();

    match resolver.resolve(&guarded, bucket).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(ClientError::ConflictsNotSolved {
            bucket: bucket.to_string(),
        }),
        Err(e) => Err(ClientError::ResolutionFailed {
            bucket: bucket.to_string(),
            source: Box::new(e),
        }),
    }
}
