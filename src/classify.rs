use crate::domain::{extract_domain, Domain};
use crate::{ResourceType, UnfurlError};

#[derive(Debug, Clone, Copy)]
enum DomainPattern {
    Exact(&'static str),
    /// The domain itself or any subdomain of it.
    Suffix(&'static str),
    /// Domains whose leading label matches, e.g. `maps.`.
    Prefix(&'static str),
}

impl DomainPattern {
    fn matches(&self, domain: &str) -> bool {
        match *self {
            DomainPattern::Exact(pattern) => domain == pattern,
            DomainPattern::Suffix(pattern) => {
                domain == pattern
                    || domain
                        .strip_suffix(pattern)
                        .is_some_and(|rest| rest.ends_with('.'))
            }
            DomainPattern::Prefix(pattern) => {
                domain.len() > pattern.len() && domain.starts_with(pattern)
            }
        }
    }
}

// First match wins.
const DOMAIN_TABLE: &[(DomainPattern, ResourceType)] = &[
    (DomainPattern::Suffix("giphy.com"), ResourceType::ImageService),
    (DomainPattern::Suffix("gph.is"), ResourceType::ImageService),
    (DomainPattern::Exact("keybasemaps"), ResourceType::Map),
    (DomainPattern::Prefix("maps."), ResourceType::Map),
    (DomainPattern::Suffix("openstreetmap.org"), ResourceType::Map),
];

/// Maps a normalized domain to the extraction strategy it needs.
/// Unknown domains are `Generic`.
pub fn classify(domain: &Domain) -> ResourceType {
    DOMAIN_TABLE
        .iter()
        .find(|(pattern, _)| pattern.matches(domain.as_str()))
        .map(|(_, typ)| *typ)
        .unwrap_or(ResourceType::Generic)
}

pub fn classify_url(url: &str) -> Result<ResourceType, UnfurlError> {
    extract_domain(url).map(|domain| classify(&domain))
}
