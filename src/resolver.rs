// SPDX-License-Identifier: Apache-2.0

use http::HeaderMap;
use std::collections::HashMap;

/// Extension point contributing additional transitive metadata beyond what
/// arrived in the dedicated metadata header.
///
/// Implementations inspect the live inbound request read-only and return
/// entries that are merged over the decoded ones (resolver wins on key
/// collision). Zero or one resolver is composed at startup via
/// [`crate::MetadataTransferBuilder::with_resolver`]; no resolver behaves as
/// an empty contribution.
pub trait CustomMetadataResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> HashMap<String, String>;
}

impl<F> CustomMetadataResolver for F
where
    F: Fn(&HeaderMap) -> HashMap<String, String> + Send + Sync,
{
    fn resolve(&self, headers: &HeaderMap) -> HashMap<String, String> {
        self(headers)
    }
}
