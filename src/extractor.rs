use crate::{
    Domain, ExtractionStrategy, FetchedPage, GenericPreview, ScrapeClient, ScrapeContext,
    UnfurlError, UnfurlRaw,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

/// Generic webpage strategy: OpenGraph tags first, plain HTML metadata as fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGraphStrategy;

impl OpenGraphStrategy {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_from_page(&self, page: &FetchedPage) -> Result<GenericPreview, UnfurlError> {
        if !page.is_success() {
            return Err(UnfurlError::HttpStatus {
                status: page.status,
                url: page.url.clone(),
            });
        }

        if page.is_image() {
            debug!(url = %page.url, "Resource is an image, using it as the preview image");
            return Ok(GenericPreview {
                url: page.url.clone(),
                image_url: Some(page.final_url.clone()),
                ..Default::default()
            });
        }

        let base = Url::parse(&page.final_url).or_else(|_| Url::parse(&page.url))?;
        self.extract_from_html(&page.text(), &page.url, &base)
    }

    pub fn extract_from_html(
        &self,
        html: &str,
        url: &str,
        base: &Url,
    ) -> Result<GenericPreview, UnfurlError> {
        let document = Html::parse_document(html);

        let title = extract_title(&document);
        let description = extract_description(&document);
        if title.is_none() && description.is_none() {
            return Err(UnfurlError::ExtractError(format!(
                "no title or description found at {url}"
            )));
        }

        Ok(GenericPreview {
            url: url.to_string(),
            title,
            site_name: extract_site_name(&document),
            description,
            image_url: extract_image(&document).and_then(|src| resolve(base, &src)),
            favicon_url: extract_favicon(&document).and_then(|src| resolve(base, &src)),
            publish_time: extract_publish_time(&document),
        })
    }
}

#[async_trait]
impl ExtractionStrategy for OpenGraphStrategy {
    #[instrument(level = "debug", skip(self, _ctx, domain, client), fields(domain = %domain))]
    async fn extract(
        &self,
        _ctx: &ScrapeContext,
        url: &str,
        domain: &Domain,
        client: &ScrapeClient,
    ) -> Result<UnfurlRaw, UnfurlError> {
        let page = client.get(url).await?;
        self.extract_from_page(&page).map(UnfurlRaw::Generic)
    }
}

fn resolve(base: &Url, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    base.join(src).ok().map(String::from)
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|s| s.trim())
        .find(|s| !s.is_empty())
        .map(String::from)
}

fn extract_title(document: &Html) -> Option<String> {
    let og_title = first_attr(
        document,
        "meta[property='og:title'], meta[name='twitter:title']",
        "content",
    );

    // If there is no Open Graph title, try to get the regular title
    og_title.or_else(|| {
        let title_selector = Selector::parse("title").ok()?;
        document
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

fn extract_description(document: &Html) -> Option<String> {
    first_attr(document, "meta[property='og:description']", "content")
        .or_else(|| first_attr(document, "meta[name='description']", "content"))
}

fn extract_image(document: &Html) -> Option<String> {
    first_attr(
        document,
        "meta[property='og:image'], meta[property='og:image:url'], meta[itemprop='image']",
        "content",
    )
    .or_else(|| first_attr(document, "meta[name='twitter:image']", "content"))
}

fn extract_favicon(document: &Html) -> Option<String> {
    first_attr(
        document,
        "link[rel='icon'], link[rel='shortcut icon'], link[rel='apple-touch-icon']",
        "href",
    )
}

fn extract_site_name(document: &Html) -> Option<String> {
    first_attr(document, "meta[property='og:site_name']", "content")
}

fn extract_publish_time(document: &Html) -> Option<i64> {
    let raw = first_attr(
        document,
        "meta[property='article:published_time'], meta[property='og:published_time']",
        "content",
    )?;
    parse_publish_time(&raw)
}

fn parse_publish_time(raw: &str) -> Option<i64> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.timestamp());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}
