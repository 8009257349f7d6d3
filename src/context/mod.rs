// SPDX-License-Identifier: Apache-2.0

use http::Extensions;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Named sub-mappings of a [`MetadataContext`]. The set is fixed; fragment
/// contents are free-form string keys and values supplied by callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Propagated to every downstream hop until overridden or disposed.
    Transitive,
    /// One-hop metadata added at this hop; sent downstream once and dropped
    /// by the receiver before further forwarding.
    Disposable,
    /// One-hop metadata received from the immediate upstream. Read locally
    /// and used to strip forwarded transitive entries; never re-forwarded.
    UpstreamDisposable,
    /// Single-entry fragment whose key is a comma-separated list of header
    /// names nominated for verbatim capture. The value is unused.
    RawTransHeaders,
    /// Header name -> header value pairs captured from the current inbound
    /// request. Local scaffolding, never re-serialized onto the wire.
    RawTransHeadersKv,
}

/// Per-request metadata, grouped into fragments.
///
/// One instance is owned by exactly one request scope. The lock exists so an
/// `Arc` handle can also be stashed in a transport attribute store within the
/// same request; no two concurrent scopes ever hold the same instance.
#[derive(Debug, Default)]
pub struct MetadataContext {
    fragments: RwLock<HashMap<Fragment, HashMap<String, String>>>,
}

impl MetadataContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context seeded with the two merged inbound fragments. The
    /// disposable seed is what the immediate upstream marked one-hop, so it
    /// lands in [`Fragment::UpstreamDisposable`].
    pub fn with_fragments(
        transitive: HashMap<String, String>,
        upstream_disposable: HashMap<String, String>,
    ) -> Self {
        let mut fragments = HashMap::new();
        if !transitive.is_empty() {
            fragments.insert(Fragment::Transitive, transitive);
        }
        if !upstream_disposable.is_empty() {
            fragments.insert(Fragment::UpstreamDisposable, upstream_disposable);
        }
        MetadataContext {
            fragments: RwLock::new(fragments),
        }
    }

    /// Returns a snapshot of the fragment's contents, empty if absent.
    pub fn fragment(&self, fragment: Fragment) -> HashMap<String, String> {
        let guard = self
            .fragments
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.get(&fragment).cloned().unwrap_or_default()
    }

    /// Inserts or overwrites a single entry in the named fragment, creating
    /// the fragment if absent. Entries persist for the request's lifetime.
    pub fn put(&self, fragment: Fragment, key: impl Into<String>, value: impl Into<String>) {
        let mut guard = self
            .fragments
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard
            .entry(fragment)
            .or_default()
            .insert(key.into(), value.into());
    }

    /// Attaches a context handle to a transport attribute store so later
    /// stages of the same request can retrieve it without scope access.
    pub fn attach(extensions: &mut Extensions, context: Arc<MetadataContext>) {
        extensions.insert(context);
    }

    /// Retrieves a previously attached context handle, if any.
    pub fn from_extensions(extensions: &Extensions) -> Option<Arc<MetadataContext>> {
        extensions.get::<Arc<MetadataContext>>().cloned()
    }
}
