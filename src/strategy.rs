use crate::{Domain, ScrapeClient, ScrapeContext, UnfurlError, UnfurlRaw};
use async_trait::async_trait;

/// Turns a URL into an [`UnfurlRaw`] for one resource type.
///
/// The client is built fresh for the call; strategies should issue all of their
/// requests through it so they are identified, proxied and metered.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    async fn extract(
        &self,
        ctx: &ScrapeContext,
        url: &str,
        domain: &Domain,
        client: &ScrapeClient,
    ) -> Result<UnfurlRaw, UnfurlError>;
}
