// SPDX-License-Identifier: Apache-2.0

//! Outbound side: re-encodes the current context onto a downstream request.

use crate::codec;
use crate::context::{Fragment, MetadataContext};
use crate::inbound::capture_trans_headers;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use tracing::warn;

pub(crate) fn encode(
    custom_metadata_header: &HeaderName,
    custom_disposable_metadata_header: &HeaderName,
    context: &MetadataContext,
    inbound_headers: &HeaderMap,
    outbound: &mut HeaderMap,
) {
    let transitive = context.fragment(Fragment::Transitive);
    let disposable = context.fragment(Fragment::Disposable);
    let upstream_disposable = context.fragment(Fragment::UpstreamDisposable);

    // Disposable entries travel exactly one hop: anything marked disposable,
    // by the immediate upstream or at this hop, is stripped from the
    // forwarded transitive set even if also present there. Only this hop's
    // own disposable additions go back on the wire.
    let forwarded: HashMap<String, String> = transitive
        .into_iter()
        .filter(|(key, _)| {
            !disposable.contains_key(key) && !upstream_disposable.contains_key(key)
        })
        .collect();

    attach_metadata_header(outbound, custom_metadata_header, &forwarded);
    attach_metadata_header(outbound, custom_disposable_metadata_header, &disposable);

    // Capture runs against the original inbound request: forwarded custom
    // headers reflect what this hop received, however many outbound calls it
    // makes.
    capture_trans_headers(context, inbound_headers);
}

fn attach_metadata_header(
    headers: &mut HeaderMap,
    name: &HeaderName,
    metadata: &HashMap<String, String>,
) {
    if metadata.is_empty() {
        return;
    }
    let encoded = codec::encode_value(metadata);
    match HeaderValue::from_str(&encoded) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => {
            // best effort: send the unencoded serialized form rather than
            // dropping the metadata
            let raw = codec::encode_value_raw(metadata);
            match HeaderValue::from_str(&raw) {
                Ok(value) => {
                    headers.insert(name, value);
                }
                Err(e) => {
                    warn!(header = %name, error = %e, "unable to attach metadata header");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(value: &'static str) -> HeaderName {
        HeaderName::from_static(value)
    }

    fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn encode_default(context: &MetadataContext, inbound: &HeaderMap, outbound: &mut HeaderMap) {
        encode(
            &name("x-custom-metadata"),
            &name("x-custom-disposable-metadata"),
            context,
            inbound,
            outbound,
        );
    }

    fn decoded_header(headers: &HeaderMap, header: &'static str) -> HashMap<String, String> {
        codec::decode_value(headers.get(header).unwrap().to_str().unwrap())
    }

    #[test]
    fn upstream_disposable_keys_are_stripped_from_forwarded_transitive() {
        let ctx = MetadataContext::with_fragments(
            map(&[("a", "1"), ("b", "2")]),
            map(&[("a", "1")]),
        );
        let mut outbound = HeaderMap::new();
        encode_default(&ctx, &HeaderMap::new(), &mut outbound);

        assert_eq!(
            decoded_header(&outbound, "x-custom-metadata"),
            map(&[("b", "2")])
        );
        // upstream one-hop marks are not re-forwarded
        assert!(outbound.get("x-custom-disposable-metadata").is_none());
    }

    #[test]
    fn local_disposable_additions_are_sent_and_stripped() {
        let ctx = MetadataContext::with_fragments(map(&[("a", "1"), ("b", "2")]), HashMap::new());
        ctx.put(Fragment::Disposable, "a", "1");
        let mut outbound = HeaderMap::new();
        encode_default(&ctx, &HeaderMap::new(), &mut outbound);

        assert_eq!(
            decoded_header(&outbound, "x-custom-metadata"),
            map(&[("b", "2")])
        );
        assert_eq!(
            decoded_header(&outbound, "x-custom-disposable-metadata"),
            map(&[("a", "1")])
        );
    }

    #[test]
    fn empty_fragments_produce_no_headers() {
        let ctx = MetadataContext::new();
        let mut outbound = HeaderMap::new();
        encode_default(&ctx, &HeaderMap::new(), &mut outbound);

        assert!(outbound.get("x-custom-metadata").is_none());
        assert!(outbound.get("x-custom-disposable-metadata").is_none());
    }

    #[test]
    fn transitive_only_omits_disposable_header() {
        let ctx = MetadataContext::with_fragments(map(&[("k", "v")]), HashMap::new());
        let mut outbound = HeaderMap::new();
        encode_default(&ctx, &HeaderMap::new(), &mut outbound);

        assert_eq!(decoded_header(&outbound, "x-custom-metadata"), map(&[("k", "v")]));
        assert!(outbound.get("x-custom-disposable-metadata").is_none());
    }

    #[test]
    fn capture_runs_against_inbound_not_outbound() {
        let ctx = MetadataContext::new();
        ctx.put(Fragment::Transitive, "k", "v");
        ctx.put(Fragment::RawTransHeaders, "x-tenant", "");

        let mut inbound = HeaderMap::new();
        inbound.insert(name("x-tenant"), HeaderValue::from_static("acme"));
        let mut outbound = HeaderMap::new();
        outbound.insert(name("x-tenant"), HeaderValue::from_static("other"));

        encode_default(&ctx, &inbound, &mut outbound);

        assert_eq!(
            ctx.fragment(Fragment::RawTransHeadersKv),
            map(&[("x-tenant", "acme")])
        );
    }

    #[test]
    fn encoding_survives_awkward_values() {
        let ctx = MetadataContext::with_fragments(
            map(&[("key with space", "value\u{7f}ctl")]),
            HashMap::new(),
        );
        let mut outbound = HeaderMap::new();
        encode_default(&ctx, &HeaderMap::new(), &mut outbound);

        // percent-encoding keeps even control characters header-safe
        assert_eq!(
            decoded_header(&outbound, "x-custom-metadata"),
            map(&[("key with space", "value\u{7f}ctl")])
        );
    }
}
