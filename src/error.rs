use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum UnfurlError {
    #[error("Failed to parse URL: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("Failed to fetch content: {0}")]
    FetchError(String),

    #[error("HTTP {status} returned for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to extract metadata: {0}")]
    ExtractError(String),

    #[error("Scrape cancelled")]
    Cancelled,

    #[error("Scrape deadline exceeded")]
    DeadlineExceeded,

    #[error("Failed to build HTTP client: {0}")]
    ClientBuildError(String),

    #[error("Invalid proxy configuration: {0}")]
    ProxyConfigError(String),

    #[error("Failed to record network instrumentation: {0}")]
    InstrumentationError(String),
}

impl UnfurlError {
    /// True for the malformed-URL family, which fails before any network activity.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            UnfurlError::UrlParseError(_) | UnfurlError::MissingHost(_)
        )
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, UnfurlError::Cancelled | UnfurlError::DeadlineExceeded)
    }

    pub fn log(&self) {
        match self {
            UnfurlError::UrlParseError(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            UnfurlError::MissingHost(url) => {
                warn!(url = %url, "URL has no host");
            }
            UnfurlError::FetchError(e) => {
                error!(error = %e, "Content fetch failed");
            }
            UnfurlError::HttpStatus { status, url } => {
                warn!(status = *status, url = %url, "Unexpected HTTP status");
            }
            UnfurlError::ExtractError(e) => {
                error!(error = %e, "Metadata extraction failed");
            }
            UnfurlError::Cancelled => {
                warn!("Scrape cancelled by caller");
            }
            UnfurlError::DeadlineExceeded => {
                warn!("Scrape deadline exceeded");
            }
            UnfurlError::ClientBuildError(e) => {
                error!(error = %e, "HTTP client construction failed");
            }
            UnfurlError::ProxyConfigError(e) => {
                warn!(error = %e, "Proxy configuration rejected");
            }
            UnfurlError::InstrumentationError(e) => {
                warn!(error = %e, "Network instrumentation failed");
            }
        }
    }
}
