// SPDX-License-Identifier: Apache-2.0

//! Per-request association between executing code and its [`MetadataContext`].
//!
//! The association lives in a tokio task-local, so it is inherited by every
//! continuation of one logical request and is invisible to unrelated requests
//! interleaved on the same worker. Leaving the scope tears the slot down on
//! every exit path (success, error, panic, cancellation drop), which is the
//! guaranteed-release half of the lifecycle contract.

use crate::context::MetadataContext;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::task_local;
use tracing::debug;

task_local! {
    static CURRENT: RefCell<Option<Arc<MetadataContext>>>;
}

/// Runs a future inside a fresh request scope. All tasks and continuations
/// spawned from within inherit the association; it is released when the
/// future completes or is dropped.
pub async fn scope<F>(fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(RefCell::new(None), fut).await
}

/// Synchronous counterpart of [`scope`] for thread-confined request handling.
pub fn sync_scope<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    CURRENT.sync_scope(RefCell::new(None), f)
}

/// Seeds the current scope with a new context built from the two merged
/// inbound fragments (the disposable seed lands in
/// [`Fragment::UpstreamDisposable`](crate::context::Fragment)) and returns a
/// handle to it.
///
/// Intended to be called exactly once per inbound request, before handler
/// code runs. A second call within the same scope replaces the association.
/// Outside any scope the context is still returned, just not associated.
pub fn init(
    transitive: HashMap<String, String>,
    disposable: HashMap<String, String>,
) -> Arc<MetadataContext> {
    let context = Arc::new(MetadataContext::with_fragments(transitive, disposable));
    let stored = CURRENT.try_with(|cell| {
        if cell.borrow().is_some() {
            debug!("metadata context re-initialized within an active scope");
        }
        *cell.borrow_mut() = Some(context.clone());
    });
    if stored.is_err() {
        debug!("metadata context initialized outside any request scope");
    }
    context
}

/// Returns the context associated with the current scope, or a fresh empty
/// context when none is associated. Never fails: code running outside a
/// request must not crash due to missing metadata.
pub fn current() -> Arc<MetadataContext> {
    CURRENT
        .try_with(|cell| cell.borrow().clone())
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Severs the association for the current scope. Idempotent; a no-op outside
/// any scope. Scope teardown performs the same release unconditionally, so
/// explicit calls are only needed by transports that sever early.
pub fn remove() {
    let _ = CURRENT.try_with(|cell| cell.borrow_mut().take());
}
