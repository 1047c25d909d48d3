use crate::{
    classify, extract_domain, CacheStrategy, ClientConfig, ClientFactory, ExtractionStrategy,
    OpenGraphStrategy, ResourceType, ScrapeContext, UnfurlCache, UnfurlError, UnfurlRaw,
    DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

pub struct ScraperConfig {
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
    pub cache_strategy: CacheStrategy,
    pub client: ClientConfig,
    pub generic_strategy: Option<Arc<dyn ExtractionStrategy>>,
    pub image_service_strategy: Option<Arc<dyn ExtractionStrategy>>,
    pub map_strategy: Option<Arc<dyn ExtractionStrategy>>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_strategy: CacheStrategy::UseCache,
            client: ClientConfig::default(),
            generic_strategy: None,
            image_service_strategy: None,
            map_strategy: None,
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_strategy(mut self, cache_strategy: CacheStrategy) -> Self {
        self.cache_strategy = cache_strategy;
        self
    }

    pub fn with_client_config(mut self, client: ClientConfig) -> Self {
        self.client = client;
        self
    }

    /// Replaces the built-in [`OpenGraphStrategy`].
    pub fn with_generic_strategy(mut self, strategy: Arc<dyn ExtractionStrategy>) -> Self {
        self.generic_strategy = Some(strategy);
        self
    }

    pub fn with_image_service_strategy(mut self, strategy: Arc<dyn ExtractionStrategy>) -> Self {
        self.image_service_strategy = Some(strategy);
        self
    }

    pub fn with_map_strategy(mut self, strategy: Arc<dyn ExtractionStrategy>) -> Self {
        self.map_strategy = Some(strategy);
        self
    }
}

/// Entry point for unfurling: cache, classify, dispatch, cache again.
///
/// Each call is one attempt with no retries. Types without a registered
/// strategy are handled by the generic one.
#[derive(Clone)]
pub struct Scraper {
    cache: UnfurlCache,
    cache_strategy: CacheStrategy,
    client_factory: ClientFactory,
    generic: Arc<dyn ExtractionStrategy>,
    image_service: Option<Arc<dyn ExtractionStrategy>>,
    map: Option<Arc<dyn ExtractionStrategy>>,
}

impl Default for Scraper {
    fn default() -> Self {
        Self::new(ScraperConfig::default())
    }
}

impl Scraper {
    pub fn new(config: ScraperConfig) -> Self {
        debug!(
            cache_capacity = config.cache_capacity,
            cache_ttl = ?config.cache_ttl,
            "Initializing Scraper"
        );

        Self {
            cache: UnfurlCache::new(config.cache_capacity, config.cache_ttl),
            cache_strategy: config.cache_strategy,
            client_factory: ClientFactory::new(config.client),
            generic: config
                .generic_strategy
                .unwrap_or_else(|| Arc::new(OpenGraphStrategy::new())),
            image_service: config.image_service_strategy,
            map: config.map_strategy,
        }
    }

    pub fn cache(&self) -> &UnfurlCache {
        &self.cache
    }

    pub fn client_factory(&self) -> &ClientFactory {
        &self.client_factory
    }

    fn strategy_for(&self, typ: ResourceType) -> &dyn ExtractionStrategy {
        match typ {
            ResourceType::Generic => self.generic.as_ref(),
            ResourceType::ImageService => self
                .image_service
                .as_deref()
                .unwrap_or(self.generic.as_ref()),
            ResourceType::Map => self.map.as_deref().unwrap_or(self.generic.as_ref()),
        }
    }

    /// Unfurls `url`, dispatching on `forced` if given instead of classifying.
    ///
    /// Only successful results are cached, keyed by `url` as passed in.
    ///
    /// Besides parse and extraction failures, a miss can fail with
    /// [`UnfurlError::Cancelled`] or [`UnfurlError::DeadlineExceeded`] from
    /// `ctx`, or with [`UnfurlError::ClientBuildError`] when no HTTP client
    /// can be built at all.
    #[instrument(level = "debug", skip(self, ctx))]
    pub async fn scrape(
        &self,
        ctx: &ScrapeContext,
        url: &str,
        forced: Option<ResourceType>,
    ) -> Result<UnfurlRaw, UnfurlError> {
        let use_cache = self.cache_strategy == CacheStrategy::UseCache;
        if use_cache {
            if let Some(cached) = self.cache.get(url).await {
                debug!(url = %url, "Scrape: using cached value");
                return Ok(cached);
            }
        }

        let domain = extract_domain(url).inspect_err(|e| e.log())?;

        let typ = match forced {
            Some(typ) => {
                debug!(url = %url, %typ, "Scrape: forced resource type");
                typ
            }
            None => classify(&domain),
        };
        debug!(url = %url, domain = %domain, %typ, "Scrape: dispatching");

        ctx.check().inspect_err(|e| e.log())?;
        let client = self.client_factory.make_client()?;
        let strategy = self.strategy_for(typ);
        let raw = ctx
            .run(strategy.extract(ctx, url, &domain, &client))
            .await
            .inspect_err(|e| e.log())?;

        if use_cache {
            self.cache.put(url, raw.clone()).await;
        }
        Ok(raw)
    }

    /// Scrapes each URL concurrently under the same context. Results are in input order.
    pub async fn scrape_batch(
        &self,
        ctx: &ScrapeContext,
        urls: &[&str],
    ) -> Vec<Result<UnfurlRaw, UnfurlError>> {
        let scrapes = urls.iter().map(|url| self.scrape(ctx, url, None));
        futures::future::join_all(scrapes).await
    }
}
