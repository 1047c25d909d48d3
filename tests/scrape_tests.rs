use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use unfurl_scraper::{
    CacheStrategy, ClientConfig, Domain, ExtractionStrategy, GenericPreview, ImagePreview,
    MapPreview, ResourceType, ScrapeClient, ScrapeContext, Scraper, ScraperConfig, UnfurlError,
    UnfurlRaw,
};

struct StubStrategy {
    produces: ResourceType,
    calls: AtomicUsize,
    fail: bool,
    delay: Option<Duration>,
}

impl StubStrategy {
    fn new(produces: ResourceType) -> Arc<Self> {
        Arc::new(Self {
            produces,
            calls: AtomicUsize::new(0),
            fail: false,
            delay: None,
        })
    }

    fn failing(produces: ResourceType) -> Arc<Self> {
        Arc::new(Self {
            produces,
            calls: AtomicUsize::new(0),
            fail: true,
            delay: None,
        })
    }

    fn slow(produces: ResourceType, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            produces,
            calls: AtomicUsize::new(0),
            fail: false,
            delay: Some(delay),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionStrategy for StubStrategy {
    async fn extract(
        &self,
        _ctx: &ScrapeContext,
        url: &str,
        domain: &Domain,
        _client: &ScrapeClient,
    ) -> Result<UnfurlRaw, UnfurlError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(UnfurlError::ExtractError(format!("stub failed for {domain}")));
        }

        let title = Some(format!("call-{call}@{domain}"));
        Ok(match self.produces {
            ResourceType::Generic => UnfurlRaw::Generic(GenericPreview {
                url: url.to_string(),
                title,
                ..Default::default()
            }),
            ResourceType::ImageService => UnfurlRaw::ImageService(ImagePreview {
                url: url.to_string(),
                image_url: Some(format!("{url}/giphy.gif")),
                ..Default::default()
            }),
            ResourceType::Map => UnfurlRaw::Map(MapPreview {
                url: url.to_string(),
                title,
                latitude: Some(40.7),
                longitude: Some(-74.0),
                ..Default::default()
            }),
        })
    }
}

struct Stubs {
    generic: Arc<StubStrategy>,
    image: Arc<StubStrategy>,
    map: Arc<StubStrategy>,
}

impl Stubs {
    fn new() -> Self {
        Self {
            generic: StubStrategy::new(ResourceType::Generic),
            image: StubStrategy::new(ResourceType::ImageService),
            map: StubStrategy::new(ResourceType::Map),
        }
    }

    fn config(&self) -> ScraperConfig {
        ScraperConfig::new()
            .with_generic_strategy(self.generic.clone())
            .with_image_service_strategy(self.image.clone())
            .with_map_strategy(self.map.clone())
    }
}

const MAP_URL: &str = "https://maps.example.com/place/123";

#[tokio::test]
async fn map_url_dispatches_to_map_strategy_and_caches_by_url() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config());
    let ctx = ScrapeContext::background();

    let raw = scraper.scrape(&ctx, MAP_URL, None).await.unwrap();
    assert_eq!(raw.resource_type(), ResourceType::Map);
    assert_eq!(raw.title(), Some("call-1@maps.example.com"));
    assert_eq!(stubs.map.calls(), 1);
    assert_eq!(stubs.generic.calls(), 0);
    assert_eq!(stubs.image.calls(), 0);

    assert_eq!(scraper.cache().get(MAP_URL).await, Some(raw));
    assert!(scraper.cache().get("maps.example.com").await.is_none());
}

#[tokio::test]
async fn second_scrape_is_served_from_cache() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config());
    let ctx = ScrapeContext::background();

    let first = scraper.scrape(&ctx, MAP_URL, None).await.unwrap();
    let second = scraper.scrape(&ctx, MAP_URL, None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(stubs.map.calls(), 1);
}

#[tokio::test]
async fn classification_routes_each_type() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config());
    let ctx = ScrapeContext::background();

    let gif = scraper
        .scrape(&ctx, "https://media.giphy.com/media/abc/giphy.gif", None)
        .await
        .unwrap();
    assert_eq!(gif.resource_type(), ResourceType::ImageService);

    let page = scraper
        .scrape(&ctx, "https://www.rust-lang.org/learn", None)
        .await
        .unwrap();
    assert_eq!(page.resource_type(), ResourceType::Generic);
    assert_eq!(page.title(), Some("call-1@rust-lang.org"));

    assert_eq!(stubs.image.calls(), 1);
    assert_eq!(stubs.generic.calls(), 1);
    assert_eq!(stubs.map.calls(), 0);
}

#[tokio::test]
async fn forced_type_bypasses_classification() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config());
    let ctx = ScrapeContext::background();

    let raw = scraper
        .scrape(&ctx, "https://giphy.com/gifs/cat", Some(ResourceType::Map))
        .await
        .unwrap();
    assert_eq!(raw.resource_type(), ResourceType::Map);
    assert_eq!(stubs.map.calls(), 1);
    assert_eq!(stubs.image.calls(), 0);

    let raw = scraper
        .scrape(&ctx, MAP_URL, Some(ResourceType::Generic))
        .await
        .unwrap();
    assert_eq!(raw.resource_type(), ResourceType::Generic);
    assert_eq!(stubs.generic.calls(), 1);
    assert_eq!(stubs.map.calls(), 1);
}

#[tokio::test]
async fn unregistered_types_fall_back_to_generic() {
    let generic = StubStrategy::new(ResourceType::Generic);
    let scraper = Scraper::new(ScraperConfig::new().with_generic_strategy(generic.clone()));
    let ctx = ScrapeContext::background();

    let raw = scraper.scrape(&ctx, MAP_URL, None).await.unwrap();
    assert_eq!(raw.resource_type(), ResourceType::Generic);
    let raw = scraper
        .scrape(&ctx, "https://giphy.com/gifs/cat", None)
        .await
        .unwrap();
    assert_eq!(raw.resource_type(), ResourceType::Generic);
    assert_eq!(generic.calls(), 2);
}

#[tokio::test]
async fn malformed_url_is_a_parse_error_without_side_effects() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config());
    let ctx = ScrapeContext::background();

    let err = scraper.scrape(&ctx, "not a url", None).await.unwrap_err();
    assert!(err.is_parse_error(), "unexpected error: {err:?}");
    assert!(scraper.cache().is_empty().await);
    assert_eq!(
        stubs.generic.calls() + stubs.image.calls() + stubs.map.calls(),
        0
    );
}

#[tokio::test]
async fn extraction_failures_are_not_cached() {
    let failing = StubStrategy::failing(ResourceType::Generic);
    let scraper = Scraper::new(ScraperConfig::new().with_generic_strategy(failing.clone()));
    let ctx = ScrapeContext::background();
    let url = "https://example.com/broken";

    let err = scraper.scrape(&ctx, url, None).await.unwrap_err();
    match err {
        UnfurlError::ExtractError(msg) => assert_eq!(msg, "stub failed for example.com"),
        other => panic!("expected ExtractError, got {other:?}"),
    }
    assert!(scraper.cache().get(url).await.is_none());

    // no negative caching: the next call tries again
    assert!(scraper.scrape(&ctx, url, None).await.is_err());
    assert_eq!(failing.calls(), 2);
}

#[tokio::test]
async fn no_cache_strategy_always_dispatches() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config().with_cache_strategy(CacheStrategy::NoCache));
    let ctx = ScrapeContext::background();

    scraper.scrape(&ctx, MAP_URL, None).await.unwrap();
    scraper.scrape(&ctx, MAP_URL, None).await.unwrap();
    assert_eq!(stubs.map.calls(), 2);
    assert!(scraper.cache().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn expired_entries_are_scraped_again() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config().with_cache_ttl(Duration::from_secs(60)));
    let ctx = ScrapeContext::background();

    scraper.scrape(&ctx, MAP_URL, None).await.unwrap();
    tokio::time::advance(Duration::from_secs(61)).await;
    let raw = scraper.scrape(&ctx, MAP_URL, None).await.unwrap();

    assert_eq!(stubs.map.calls(), 2);
    assert_eq!(raw.title(), Some("call-2@maps.example.com"));
}

#[tokio::test]
async fn cancellation_aborts_without_caching() {
    let slow = StubStrategy::slow(ResourceType::Generic, Duration::from_secs(30));
    let scraper = Scraper::new(ScraperConfig::new().with_generic_strategy(slow.clone()));
    let ctx = ScrapeContext::background();
    let url = "https://example.com/slow";

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let err = scraper.scrape(&ctx, url, None).await.unwrap_err();
    assert!(matches!(err, UnfurlError::Cancelled));
    assert_eq!(slow.calls(), 1);
    assert!(scraper.cache().get(url).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_the_fetch() {
    let slow = StubStrategy::slow(ResourceType::Generic, Duration::from_secs(30));
    let scraper = Scraper::new(ScraperConfig::new().with_generic_strategy(slow));
    let ctx = ScrapeContext::with_timeout(Duration::from_secs(2));
    let url = "https://example.com/slow";

    let err = scraper.scrape(&ctx, url, None).await.unwrap_err();
    assert!(matches!(err, UnfurlError::DeadlineExceeded));
    assert!(scraper.cache().get(url).await.is_none());
}

#[tokio::test]
async fn cancelled_context_still_serves_cache_hits() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config());
    let cached = scraper
        .scrape(&ScrapeContext::background(), MAP_URL, None)
        .await
        .unwrap();

    let ctx = ScrapeContext::background();
    ctx.cancel();
    assert_eq!(scraper.scrape(&ctx, MAP_URL, None).await.unwrap(), cached);

    let err = scraper
        .scrape(&ctx, "https://example.com/new", None)
        .await
        .unwrap_err();
    assert!(matches!(err, UnfurlError::Cancelled));
    assert_eq!(stubs.generic.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_misses_both_fetch_and_last_put_wins() {
    let slow = StubStrategy::slow(ResourceType::Generic, Duration::from_millis(50));
    let scraper = Scraper::new(ScraperConfig::new().with_generic_strategy(slow.clone()));
    let url = "https://example.com/race";

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let scraper = scraper.clone();
            tokio::spawn(async move {
                scraper
                    .scrape(&ScrapeContext::background(), url, None)
                    .await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    assert_eq!(slow.calls(), 2);
    assert_ne!(results[0], results[1]);
    assert_eq!(scraper.cache().len().await, 1);
    let cached = scraper.cache().get(url).await.unwrap();
    assert!(results.contains(&cached));
}

#[tokio::test]
async fn batch_keeps_input_order() {
    let stubs = Stubs::new();
    let scraper = Scraper::new(stubs.config());
    let ctx = ScrapeContext::background();

    let results = scraper
        .scrape_batch(
            &ctx,
            &[MAP_URL, "::::", "https://giphy.com/gifs/dog", "https://example.com/"],
        )
        .await;

    assert_eq!(results.len(), 4);
    assert_eq!(
        results[0].as_ref().unwrap().resource_type(),
        ResourceType::Map
    );
    assert!(results[1].as_ref().unwrap_err().is_parse_error());
    assert_eq!(
        results[2].as_ref().unwrap().resource_type(),
        ResourceType::ImageService
    );
    assert_eq!(
        results[3].as_ref().unwrap().resource_type(),
        ResourceType::Generic
    );
}

#[tokio::test]
async fn finished_context_fails_before_building_a_client() {
    let stubs = Stubs::new();
    let config = stubs
        .config()
        .with_client_config(ClientConfig::default().with_user_agent("bad\nagent"));
    let scraper = Scraper::new(config);
    let url = "https://example.com/page";

    let err = scraper
        .scrape(&ScrapeContext::background(), url, None)
        .await
        .unwrap_err();
    assert!(matches!(err, UnfurlError::ClientBuildError(_)));

    let ctx = ScrapeContext::background();
    ctx.cancel();
    let err = scraper.scrape(&ctx, url, None).await.unwrap_err();
    assert!(matches!(err, UnfurlError::Cancelled));
    assert_eq!(stubs.generic.calls(), 0);
}
