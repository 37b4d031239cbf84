//! Optimistic-concurrency conflict resolution.
//!
//! Buckets are shared by several writers. A write whose base diverged from the
//! stored version is rejected with `409 Conflict` when the request carries
//! `X-Vtex-Detect-Conflicts: true`. This module turns such rejections into a single,
//! bounded resolve-and-replay cycle:
//!
//! 1. [`ConflictInterceptor`] marks the request and keeps the exact bytes it sent
//! 2. On 409 it runs the client's [`ConflictResolver`] through a guarded client copy
//! 3. If the resolver succeeded, the request is replayed once
//! 4. The replayed response is returned with `X-Vtex-Solved-Conflicts: <bucket>`
//!
//! Detection is skipped when no resolver is configured, inside a resolver, and on the
//! master workspace. Conflict listing and resolution endpoints never use it.
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConflictResolver`] | Pluggable merge strategy |
//! | [`ConflictAware`] | Clients that carry a resolver and the resolution guard |
//! | [`ConflictInterceptor`] | The [`Interceptor`](crate::client::Interceptor) implementing the cycle |
//! | [`DeclineResolver`] | Resolver that always declines |

mod interceptor;
mod resolver;

pub use interceptor::ConflictInterceptor;
pub use resolver::{ConflictAware, ConflictResolver, DeclineResolver};
