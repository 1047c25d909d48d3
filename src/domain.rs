use crate::UnfurlError;
use std::fmt;
use url::Url;

/// Normalized host of a URL, used as the classification key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Domain(String);

impl Domain {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Parses `url` and returns its normalized host.
///
/// The host is lowercased, the port and a trailing root dot are dropped, and a
/// single leading `www.` label is removed, so `http://WWW.Example.com:8080/a`
/// and `https://example.com/b` share the domain `example.com`.
pub fn extract_domain(url: &str) -> Result<Domain, UnfurlError> {
    let parsed = Url::parse(url.trim())?;
    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| UnfurlError::MissingHost(url.to_string()))?;

    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let host = match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    };

    Ok(Domain(host))
}
