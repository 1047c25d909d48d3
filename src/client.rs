use crate::instrument::{
    InstrumentationStorage, NetworkInstrumenter, NoopInstrumentationStorage, INSTRUMENTATION_TAG,
};
use crate::{NetworkConfig, UnfurlError};
use bytes::Bytes;
use reqwest::header::{CONNECTION, CONTENT_TYPE, UPGRADE_INSECURE_REQUESTS};
use reqwest::{Client, ClientBuilder};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; UnfurlBot; +https://github.com/unfurl-scraper/unfurl-scraper)";

/// Settings every scrape client is built from.
///
/// # Examples
/// ```ignore
/// let config = ClientConfig::default()
///     .with_network(NetworkConfig::with_proxy(ProxyType::Socks, "localhost:9050"))
///     .with_instrumentation(Arc::new(MemoryInstrumentationStorage::new()));
/// let factory = ClientFactory::new(config);
/// let client = factory.make_client()?;
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub network: NetworkConfig,
    pub instrumentation: Arc<dyn InstrumentationStorage>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            network: NetworkConfig::default(),
            instrumentation: Arc::new(NoopInstrumentationStorage),
        }
    }
}

impl ClientConfig {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_network(mut self, network: NetworkConfig) -> Self {
        self.network = network;
        self
    }

    pub fn with_instrumentation(mut self, storage: Arc<dyn InstrumentationStorage>) -> Self {
        self.instrumentation = storage;
        self
    }
}

/// Builds a fresh [`ScrapeClient`] per scrape. Holds no mutable state.
#[derive(Clone)]
pub struct ClientFactory {
    config: ClientConfig,
}

impl Default for ClientFactory {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl ClientFactory {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// A rejected proxy setting is logged and the client is built without one.
    pub fn make_client(&self) -> Result<ScrapeClient, UnfurlError> {
        let builder = Client::builder().user_agent(self.config.user_agent.as_str());

        let (builder, proxy): (ClientBuilder, Option<String>) =
            match self.config.network.resolve_proxy() {
                Ok(Some((address, proxy))) => {
                    debug!(proxy = %address, "Routing scrape client through proxy");
                    (builder.proxy(proxy), Some(address))
                }
                Ok(None) => (builder.no_proxy(), None),
                Err(e) => {
                    e.log();
                    warn!("makeClient: continuing without proxy");
                    (builder.no_proxy(), None)
                }
            };

        let inner = builder.build().map_err(|e| {
            error!(error = %e, "Failed to create HTTP client");
            UnfurlError::ClientBuildError(e.to_string())
        })?;

        Ok(ScrapeClient {
            inner,
            storage: Arc::clone(&self.config.instrumentation),
            proxy,
            user_agent: self.config.user_agent.clone(),
        })
    }
}

/// A body fetched by [`ScrapeClient::get`]. Non-success statuses are returned
/// as-is for the strategy to judge.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    fn mime(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
    }

    pub fn is_image(&self) -> bool {
        self.mime().is_some_and(|mime| mime.starts_with("image/"))
    }

    pub fn is_video(&self) -> bool {
        self.mime().is_some_and(|mime| mime.starts_with("video/"))
    }
}

/// HTTP client handed to extraction strategies for a single scrape.
///
/// Every request carries the identification user agent plus keep-alive and
/// upgrade-insecure-requests headers, and is metered through the configured
/// instrumentation storage.
#[derive(Clone)]
pub struct ScrapeClient {
    inner: Client,
    storage: Arc<dyn InstrumentationStorage>,
    proxy: Option<String>,
    user_agent: String,
}

impl std::fmt::Debug for ScrapeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapeClient")
            .field("proxy", &self.proxy)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl ScrapeClient {
    /// The proxy address in use, if any.
    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, url: &str) -> Result<FetchedPage, UnfurlError> {
        let record = NetworkInstrumenter::new(Arc::clone(&self.storage), INSTRUMENTATION_TAG, url);

        let response = match self
            .inner
            .get(url)
            .header(CONNECTION, "keep-alive")
            .header(UPGRADE_INSECURE_REQUESTS, "1")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, url = %url, "Failed to send request");
                finish_failed(record, url).await;
                return Err(UnfurlError::FetchError(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, url = %url, "Failed to read response body");
                finish_failed(record, url).await;
                return Err(UnfurlError::FetchError(e.to_string()));
            }
        };

        if let Err(e) = record.record_and_finish(body.len() as u64).await {
            warn!(url = %url, error = %e, "Unable to instrument network request");
        }

        debug!(url = %url, status, content_length = body.len(), "Fetched resource");
        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status,
            content_type,
            body,
        })
    }
}

async fn finish_failed(record: NetworkInstrumenter, url: &str) {
    if let Err(e) = record.record_failure().await {
        warn!(url = %url, error = %e, "Unable to instrument failed network request");
    }
}
