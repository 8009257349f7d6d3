// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

pub const DEFAULT_CUSTOM_METADATA_HEADER: &str = "x-custom-metadata";
pub const DEFAULT_CUSTOM_DISPOSABLE_METADATA_HEADER: &str = "x-custom-disposable-metadata";

/// Reserved transitive key whose value lists additional header names to
/// capture verbatim. Travels inside the transitive blob, not as its own
/// wire header.
pub const DEFAULT_TRANS_HEADERS_KEY: &str = "trans-headers";

/// Deployment configuration. Header names are fixed per deployment and must
/// match across every hop of the call graph.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_custom_metadata_header")]
    pub custom_metadata_header: String,

    #[serde(default = "default_custom_disposable_metadata_header")]
    pub custom_disposable_metadata_header: String,

    #[serde(default = "default_trans_headers_key")]
    pub trans_headers_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            custom_metadata_header: default_custom_metadata_header(),
            custom_disposable_metadata_header: default_custom_disposable_metadata_header(),
            trans_headers_key: default_trans_headers_key(),
        }
    }
}

fn default_custom_metadata_header() -> String {
    DEFAULT_CUSTOM_METADATA_HEADER.to_string()
}

fn default_custom_disposable_metadata_header() -> String {
    DEFAULT_CUSTOM_DISPOSABLE_METADATA_HEADER.to_string()
}

fn default_trans_headers_key() -> String {
    DEFAULT_TRANS_HEADERS_KEY.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.custom_metadata_header, "x-custom-metadata");
        assert_eq!(
            config.custom_disposable_metadata_header,
            "x-custom-disposable-metadata"
        );
        assert_eq!(config.trans_headers_key, "trans-headers");
    }

    #[test]
    fn deserialize_partial_overrides() {
        let config: Config =
            serde_json::from_str(r#"{"custom_metadata_header": "x-acme-metadata"}"#).unwrap();
        assert_eq!(config.custom_metadata_header, "x-acme-metadata");
        assert_eq!(config.trans_headers_key, "trans-headers");
    }
}
