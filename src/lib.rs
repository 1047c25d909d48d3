use serde::{Deserialize, Serialize};
use std::fmt;

mod cache;
mod classify;
mod client;
mod context;
mod domain;
mod error;
mod extractor;
mod instrument;
#[cfg(feature = "logging")]
mod logging;
mod orchestrator;
mod proxy;
mod strategy;

pub use cache::{CacheStrategy, UnfurlCache, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL};
pub use classify::{classify, classify_url};
pub use client::{ClientConfig, ClientFactory, FetchedPage, ScrapeClient, DEFAULT_USER_AGENT};
pub use context::ScrapeContext;
pub use domain::{extract_domain, Domain};
pub use error::UnfurlError;
pub use extractor::OpenGraphStrategy;
pub use instrument::{
    InstrumentationStorage, MemoryInstrumentationStorage, NetworkInstrumenter, NetworkRecord,
    NoopInstrumentationStorage, INSTRUMENTATION_TAG,
};
#[cfg(feature = "logging")]
pub use logging::{log_error_card, log_unfurl_card, setup_logging, LogConfig, LogLevelGuard};
pub use orchestrator::{Scraper, ScraperConfig};
pub use proxy::{build_proxy_address_with_protocol, NetworkConfig, ProxyType};
pub use strategy::ExtractionStrategy;

/// The extraction strategy family a URL is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Generic,
    ImageService,
    Map,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Generic => f.write_str("generic"),
            ResourceType::ImageService => f.write_str("image_service"),
            ResourceType::Map => f.write_str("map"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericPreview {
    pub url: String,
    pub title: Option<String>,
    pub site_name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub favicon_url: Option<String>,
    /// Unix seconds.
    pub publish_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagePreview {
    pub url: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub favicon_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapPreview {
    pub url: String,
    pub title: Option<String>,
    pub site_name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Raw unfurl result, one variant per [`ResourceType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnfurlRaw {
    Generic(GenericPreview),
    ImageService(ImagePreview),
    Map(MapPreview),
}

impl UnfurlRaw {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            UnfurlRaw::Generic(_) => ResourceType::Generic,
            UnfurlRaw::ImageService(_) => ResourceType::ImageService,
            UnfurlRaw::Map(_) => ResourceType::Map,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            UnfurlRaw::Generic(p) => &p.url,
            UnfurlRaw::ImageService(p) => &p.url,
            UnfurlRaw::Map(p) => &p.url,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            UnfurlRaw::Generic(p) => p.title.as_deref(),
            UnfurlRaw::ImageService(_) => None,
            UnfurlRaw::Map(p) => p.title.as_deref(),
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            UnfurlRaw::Generic(p) => p.image_url.as_deref(),
            UnfurlRaw::ImageService(p) => p.image_url.as_deref(),
            UnfurlRaw::Map(p) => p.image_url.as_deref(),
        }
    }
}
