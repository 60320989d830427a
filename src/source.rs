use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use scraper::Html;
use tracing::debug;

use crate::error::FetchError;
use crate::settings::Settings;

/// A fetched and parsed document together with the location it came from.
pub struct Page {
    pub url: Url,
    pub html: Html,
}

impl Page {
    pub fn parse(url: Url, body: &str) -> Self {
        Page {
            url,
            html: Html::parse_document(body),
        }
    }

    /// Resolve a link found on this page to an absolute location.
    pub fn resolve(&self, href: &str) -> Result<Url, FetchError> {
        self.url.join(href.trim()).map_err(|e| FetchError::InvalidUrl {
            url: href.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Anything that can turn a location into a parsed page.
pub trait DocumentSource {
    fn fetch(&self, url: &Url) -> Result<Page, FetchError>;
}

pub fn parse_url(raw: &str) -> Result<Url, FetchError> {
    Url::parse(raw).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Blocking HTTP source. One request at a time, no retries.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(settings: &Settings) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .user_agent(&settings.user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl DocumentSource for HttpSource {
    fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        let start = Instant::now();
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.clone()).send().map_err(http_err)?;
        if let Some(e) = missing_page(url, response.status()) {
            return Err(e);
        }
        let body = response
            .error_for_status()
            .and_then(|r| r.text())
            .map_err(http_err)?;

        debug!(
            "Fetched {} ({} bytes) in {}ms",
            url,
            body.len(),
            start.elapsed().as_millis()
        );
        Ok(Page::parse(url.clone(), &body))
    }
}

/// 404 and 410 mean the page is gone rather than the request failing.
fn missing_page(url: &Url, status: StatusCode) -> Option<FetchError> {
    matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE)
        .then(|| FetchError::NotFound(url.to_string()))
}

/// In-memory source serving HTML fixtures by exact URL.
#[cfg(test)]
pub(crate) struct StaticSource {
    pages: std::collections::HashMap<String, String>,
    fetched: std::cell::RefCell<Vec<String>>,
}

#[cfg(test)]
impl StaticSource {
    pub(crate) fn new() -> Self {
        Self {
            pages: std::collections::HashMap::new(),
            fetched: std::cell::RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), html.into());
        self
    }

    pub(crate) fn with_fixture(self, url: &str, fixture: &str) -> Self {
        let html = std::fs::read_to_string(format!("tests/fixtures/{}", fixture)).unwrap();
        self.with_page(url, html)
    }

    pub(crate) fn without_page(mut self, url: &str) -> Self {
        self.pages.remove(url);
        self
    }

    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.borrow().clone()
    }
}

#[cfg(test)]
impl DocumentSource for StaticSource {
    fn fetch(&self, url: &Url) -> Result<Page, FetchError> {
        self.fetched.borrow_mut().push(url.to_string());
        match self.pages.get(url.as_str()) {
            Some(body) => Ok(Page::parse(url.clone(), body)),
            None => Err(FetchError::NotFound(url.to_string())),
        }
    }
}

// ── Tests ──
