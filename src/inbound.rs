// SPDX-License-Identifier: Apache-2.0

//! Inbound side: reconstructs the metadata context from the dedicated
//! headers, merges in resolver contributions and seeds the request scope.

use crate::codec;
use crate::context::{Fragment, MetadataContext};
use crate::resolver::CustomMetadataResolver;
use crate::scope;
use http::{HeaderMap, HeaderName};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

pub(crate) fn decode(
    custom_metadata_header: &HeaderName,
    custom_disposable_metadata_header: &HeaderName,
    trans_headers_key: &str,
    resolver: Option<&dyn CustomMetadataResolver>,
    headers: &HeaderMap,
) -> Arc<MetadataContext> {
    let internal_transitive = read_metadata_header(headers, custom_metadata_header);
    let custom_transitive = resolver
        .map(|r| r.resolve(headers))
        .unwrap_or_default();

    // custom entries overwrite internal ones on key collision
    let mut merged_transitive = internal_transitive;
    merged_transitive.extend(custom_transitive);

    let merged_disposable = read_metadata_header(headers, custom_disposable_metadata_header);

    let context = scope::init(merged_transitive, merged_disposable);

    // The trans-header list travels inside the transitive blob under the
    // reserved key. Mirror it into its own fragment; the transitive entry
    // stays so downstream hops keep capturing.
    if let Some(list) = context.fragment(Fragment::Transitive).get(trans_headers_key) {
        if !list.is_empty() {
            context.put(Fragment::RawTransHeaders, list.clone(), "");
        }
    }

    capture_trans_headers(&context, headers);
    context
}

/// Captures the literal value of every inbound header nominated by the
/// `RawTransHeaders` fragment into `RawTransHeadersKv`.
///
/// The fragment holds the comma-joined name list as its one meaningful key;
/// if more than one key exists, the lexically first wins. Matching defers to
/// the transport's header-name rules; a nominated name with no matching
/// inbound header produces no entry. Multi-valued headers are rendered as a
/// JSON array in arrival order.
pub(crate) fn capture_trans_headers(context: &MetadataContext, headers: &HeaderMap) {
    let raw = context.fragment(Fragment::RawTransHeaders);
    if raw.is_empty() {
        return;
    }
    let mut keys: Vec<&String> = raw.keys().collect();
    keys.sort();
    let list = keys[0];

    for candidate in list.split(',') {
        if candidate.is_empty() {
            continue;
        }
        let mut values = Vec::new();
        for value in headers.get_all(candidate) {
            match value.to_str() {
                Ok(v) => values.push(v.to_string()),
                Err(e) => {
                    warn!(header = candidate, error = %e, "skipping non-UTF-8 trans-header value");
                }
            }
        }
        let rendered = match values.len() {
            0 => continue,
            1 => values.remove(0),
            _ => serde_json::to_string(&values).unwrap_or_default(),
        };
        context.put(Fragment::RawTransHeadersKv, candidate, rendered);
    }
}

fn read_metadata_header(headers: &HeaderMap, name: &HeaderName) -> HashMap<String, String> {
    let Some(value) = headers.get(name) else {
        return HashMap::new();
    };
    match value.to_str() {
        Ok(raw) => codec::decode_value(raw),
        Err(e) => {
            warn!(header = %name, error = %e, "discarding non-UTF-8 metadata header");
            HashMap::new()
        }
    }
}
