// SPDX-License-Identifier: Apache-2.0

//! Wire codec for the dedicated metadata headers: a flat string-to-string
//! mapping serialized as JSON, then percent-encoded.
//!
//! Decoding never fails the request it decorates. Malformed input is logged
//! and treated as empty; the internal error type exists so the failure detail
//! reaches the log, never the caller.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

// URLEncoder-compatible set: alphanumerics and *-._ pass through. Space is
// escaped as %20 rather than + so decode(encode(m)) stays byte-exact.
const METADATA_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("percent-decoded value is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed metadata mapping: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serializes a metadata mapping for transport in a header value.
pub fn encode_value(metadata: &HashMap<String, String>) -> String {
    // serializing a string-to-string map cannot fail
    let json = serde_json::to_string(metadata).unwrap_or_default();
    utf8_percent_encode(&json, METADATA_ENCODE_SET).to_string()
}

/// Serializes a metadata mapping without the percent-encoding pass. Fallback
/// form used when the encoded value is rejected by the transport.
pub fn encode_value_raw(metadata: &HashMap<String, String>) -> String {
    serde_json::to_string(metadata).unwrap_or_default()
}

/// Deserializes a header value into a metadata mapping. Absent or empty input
/// yields an empty mapping; malformed input is logged and yields an empty
/// mapping as well.
pub fn decode_value(raw: &str) -> HashMap<String, String> {
    if raw.is_empty() {
        return HashMap::new();
    }
    match try_decode(raw) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!(error = %e, "discarding malformed metadata header value");
            HashMap::new()
        }
    }
}

fn try_decode(raw: &str) -> Result<HashMap<String, String>, CodecError> {
    let decoded = percent_decode_str(raw).decode_utf8()?;
    Ok(serde_json::from_str(&decoded)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn round_trip() {
        let m = map(&[("region", "us-east"), ("trace-opt", "on")]);
        assert_eq!(decode_value(&encode_value(&m)), m);
    }

    #[test]
    fn round_trip_reserved_and_unicode() {
        let m = map(&[
            ("k&=?", "a b+c"),
            ("路径", "值/100%"),
            ("empty", ""),
        ]);
        assert_eq!(decode_value(&encode_value(&m)), m);
    }

    #[test]
    fn encoded_form_is_header_safe() {
        let m = map(&[("a b", "c\"d")]);
        let encoded = encode_value(&m);
        assert!(encoded.is_ascii());
        assert!(!encoded.contains(' '));
        assert!(!encoded.contains('"'));
    }

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(decode_value("").is_empty());
        assert_eq!(decode_value(&encode_value(&HashMap::new())), HashMap::new());
    }

    #[test]
    fn malformed_json_yields_empty_map() {
        assert!(decode_value("%7B%22unterminated").is_empty());
        assert!(decode_value("not-json-at-all").is_empty());
    }

    #[test]
    fn invalid_utf8_yields_empty_map() {
        // %FF is not valid UTF-8 once percent-decoded
        assert!(decode_value("%FF%FE").is_empty());
    }
}
