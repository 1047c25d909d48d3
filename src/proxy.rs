use crate::UnfurlError;
use std::str::FromStr;
use tracing::{debug, warn};
use url::Url;

pub const PROXY_TYPE_ENV: &str = "UNFURL_PROXY_TYPE";
pub const PROXY_ADDRESS_ENV: &str = "UNFURL_PROXY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyType {
    #[default]
    NoProxy,
    Socks,
    HttpConnect,
}

impl FromStr for ProxyType {
    type Err = UnfurlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "no_proxy" => Ok(ProxyType::NoProxy),
            "socks" | "socks5" => Ok(ProxyType::Socks),
            "http_connect" | "http" | "https" => Ok(ProxyType::HttpConnect),
            other => Err(UnfurlError::ProxyConfigError(format!(
                "unknown proxy type: {other}"
            ))),
        }
    }
}

/// Process network settings consulted each time a scrape client is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    pub proxy_type: ProxyType,
    pub proxy_address: String,
}

impl NetworkConfig {
    pub fn no_proxy() -> Self {
        Self::default()
    }

    pub fn with_proxy(proxy_type: ProxyType, proxy_address: impl Into<String>) -> Self {
        Self {
            proxy_type,
            proxy_address: proxy_address.into(),
        }
    }

    /// Reads `UNFURL_PROXY_TYPE` and `UNFURL_PROXY`. An unrecognized proxy
    /// type is logged and treated as no proxy.
    pub fn from_env() -> Self {
        let proxy_type = match std::env::var(PROXY_TYPE_ENV) {
            Ok(value) => value.parse().unwrap_or_else(|e: UnfurlError| {
                warn!(error = %e, "Ignoring {}", PROXY_TYPE_ENV);
                ProxyType::NoProxy
            }),
            Err(_) => ProxyType::NoProxy,
        };
        let proxy_address = std::env::var(PROXY_ADDRESS_ENV).unwrap_or_default();
        debug!(?proxy_type, "Loaded network configuration from environment");

        Self {
            proxy_type,
            proxy_address,
        }
    }

    pub fn proxy_enabled(&self) -> bool {
        self.proxy_type != ProxyType::NoProxy
    }

    /// Resolves the proxy to route through, `Ok(None)` when proxying is off.
    pub(crate) fn resolve_proxy(&self) -> Result<Option<(String, reqwest::Proxy)>, UnfurlError> {
        if !self.proxy_enabled() {
            return Ok(None);
        }

        let address = build_proxy_address_with_protocol(self.proxy_type, &self.proxy_address);
        let parsed = Url::parse(&address)
            .map_err(|e| UnfurlError::ProxyConfigError(format!("{address}: {e}")))?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(UnfurlError::ProxyConfigError(format!(
                "{address}: missing host"
            )));
        }

        let proxy = reqwest::Proxy::all(parsed.as_str())
            .map_err(|e| UnfurlError::ProxyConfigError(format!("{address}: {e}")))?;
        Ok(Some((address, proxy)))
    }
}

/// Prefixes `address` with the scheme for `proxy_type` unless it already has one.
pub fn build_proxy_address_with_protocol(proxy_type: ProxyType, address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        return address.to_string();
    }
    match proxy_type {
        ProxyType::NoProxy => address.to_string(),
        ProxyType::Socks => format!("socks5://{address}"),
        ProxyType::HttpConnect => format!("http://{address}"),
    }
}
