// SPDX-License-Identifier: Apache-2.0

//! Request-scoped metadata propagation across service hops.
//!
//! An inbound request carries transitive and disposable metadata in two
//! dedicated headers. [`MetadataTransfer::decode_inbound`] reconstructs them
//! into a per-request [`MetadataContext`] held by the [`scope`] module;
//! application code reads and augments the context during handling;
//! [`MetadataTransfer::encode_outbound`] re-attaches the headers to each
//! downstream call, stripping anything the upstream marked disposable.
//! Metadata handling never fails the request it decorates.

pub mod codec;
pub mod config;
pub mod context;
pub mod scope;

mod inbound;
mod outbound;
mod resolver;

pub use config::Config;
pub use context::{Fragment, MetadataContext};
pub use resolver::CustomMetadataResolver;

use http::{Extensions, HeaderMap, HeaderName};
use std::sync::Arc;

#[derive(Default)]
pub struct MetadataTransferBuilder {
    config: Config,
    resolver: Option<Arc<dyn CustomMetadataResolver>>,
}

impl MetadataTransferBuilder {
    pub fn with_config(mut self, config: Config) -> MetadataTransferBuilder {
        self.config = config;
        self
    }

    pub fn with_resolver(
        mut self,
        resolver: Arc<dyn CustomMetadataResolver>,
    ) -> MetadataTransferBuilder {
        self.resolver = Some(resolver);
        self
    }

    /// Validates the configured header names once, at startup.
    pub fn build(self) -> Result<MetadataTransfer, http::Error> {
        Ok(MetadataTransfer {
            custom_metadata_header: HeaderName::try_from(
                self.config.custom_metadata_header.as_str(),
            )?,
            custom_disposable_metadata_header: HeaderName::try_from(
                self.config.custom_disposable_metadata_header.as_str(),
            )?,
            trans_headers_key: self.config.trans_headers_key,
            resolver: self.resolver,
        })
    }
}

/// Decode/encode entry points for one deployment's header configuration,
/// composed once at startup with an optional [`CustomMetadataResolver`].
pub struct MetadataTransfer {
    custom_metadata_header: HeaderName,
    custom_disposable_metadata_header: HeaderName,
    trans_headers_key: String,
    resolver: Option<Arc<dyn CustomMetadataResolver>>,
}

impl MetadataTransfer {
    pub fn builder() -> MetadataTransferBuilder {
        Default::default()
    }

    /// Decodes inbound metadata, seeds the current request scope and returns
    /// the context. Call once per inbound request, inside [`scope::scope`],
    /// before handler code runs.
    pub fn decode_inbound(&self, headers: &HeaderMap) -> Arc<MetadataContext> {
        inbound::decode(
            &self.custom_metadata_header,
            &self.custom_disposable_metadata_header,
            &self.trans_headers_key,
            self.resolver.as_deref(),
            headers,
        )
    }

    /// [`decode_inbound`](Self::decode_inbound) plus a context copy stashed
    /// in the transport's attribute store for later stages of this request.
    pub fn decode_inbound_into(
        &self,
        headers: &HeaderMap,
        extensions: &mut Extensions,
    ) -> Arc<MetadataContext> {
        let context = self.decode_inbound(headers);
        MetadataContext::attach(extensions, context.clone());
        context
    }

    /// Attaches the two metadata headers to an outbound request. The capture
    /// step runs against `inbound_headers`, the original request this hop
    /// received, not against the outbound map being built.
    pub fn encode_outbound(
        &self,
        context: &MetadataContext,
        inbound_headers: &HeaderMap,
        outbound: &mut HeaderMap,
    ) {
        outbound::encode(
            &self.custom_metadata_header,
            &self.custom_disposable_metadata_header,
            context,
            inbound_headers,
            outbound,
        );
    }

    /// [`encode_outbound`](Self::encode_outbound) against the context of the
    /// current scope, preferring a transport-attribute copy when one was
    /// stashed.
    pub fn encode_outbound_current(
        &self,
        extensions: Option<&Extensions>,
        inbound_headers: &HeaderMap,
        outbound: &mut HeaderMap,
    ) {
        let context = extensions
            .and_then(MetadataContext::from_extensions)
            .unwrap_or_else(scope::current);
        self.encode_outbound(&context, inbound_headers, outbound);
    }
}
