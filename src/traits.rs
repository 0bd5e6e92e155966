//! Traits and interfaces for fetching search result pages from the upstream
//! price-comparison site

use async_trait::async_trait;
use reqwest::Url;

use crate::error::ScrapeError;

/// Where and how to reach the upstream search endpoint
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Display name for the website
    pub name: String,
    /// Scheme and host, without a trailing slash
    pub base_url: String,
    /// Path of the search CGI relative to `base_url`
    pub search_path: String,
    /// Results the upstream renders per page
    pub results_per_page: u32,
}

impl UpstreamConfig {
    /// StaticICE Australia, reachable at `base_url`
    pub fn staticice(base_url: &str) -> Self {
        Self {
            name: "StaticICE".to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            search_path: "/cgi-bin/search.cgi".to_string(),
            results_per_page: 20,
        }
    }

    /// Result offset of a 1-based page number: page 1 starts at 1, page 2 at 21.
    pub fn start_offset(&self, page: u32) -> u32 {
        page.saturating_sub(1) * self.results_per_page + 1
    }

    /// URL of one page of paginated results
    pub fn page_url(&self, query: &str, start: u32) -> String {
        format!(
            "{}{}?q={}&start={start}&links={}&showadres=1&pos=1",
            self.base_url,
            self.search_path,
            urlencoding::encode(query),
            self.results_per_page
        )
    }

    /// URL of the plain, non-paginated search
    pub fn single_page_url(&self, query: &str) -> String {
        format!(
            "{}{}?q={}&spos=3",
            self.base_url,
            self.search_path,
            urlencoding::encode(query)
        )
    }

    /// Makes an href found on a result page absolute
    pub fn absolute_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else if href.starts_with("//") {
            format!("https:{href}")
        } else if href.starts_with('/') {
            format!("{}{href}", self.base_url)
        } else {
            format!("{}/{href}", self.base_url)
        }
    }

    /// Whether `url` points at this upstream's origin
    pub fn owns_url(&self, url: &str) -> bool {
        match (Url::parse(url), Url::parse(&self.base_url)) {
            (Ok(candidate), Ok(base)) => candidate.origin() == base.origin(),
            _ => false,
        }
    }
}

/// Source of raw result-page markup
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Get the upstream this source talks to
    fn upstream(&self) -> &UpstreamConfig;

    /// Fetch a complete upstream URL and return the response body
    ///
    /// # Errors
    /// * `ScrapeError::MalformedInput` - the URL is not on the upstream origin
    /// * `ScrapeError::Network` / `ScrapeError::UpstreamStatus` - the fetch failed
    async fn fetch_url(&self, url: &str) -> Result<String, ScrapeError>;

    /// Fetch the page of results starting at `start`
    async fn fetch_page(&self, query: &str, start: u32) -> Result<String, ScrapeError> {
        let query = require_query(query)?;
        let url = self.upstream().page_url(query, start);
        self.fetch_url(&url).await
    }

    /// Fetch the non-paginated search page
    async fn fetch_single(&self, query: &str) -> Result<String, ScrapeError> {
        let query = require_query(query)?;
        let url = self.upstream().single_page_url(query);
        self.fetch_url(&url).await
    }
}

/// Trims a search query, rejecting blank ones
///
/// # Errors
/// * `ScrapeError::MalformedInput` - the query is empty after trimming
pub fn require_query(query: &str) -> Result<&str, ScrapeError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(ScrapeError::MalformedInput(
            "search query must not be empty".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Parses an optional numeric query parameter such as `start` or `pages`.
/// A missing or blank value is `None`.
///
/// # Errors
/// * `ScrapeError::MalformedInput` - the value is not a non-negative integer
pub fn parse_count(name: &str, raw: Option<&str>) -> Result<Option<u32>, ScrapeError> {
    let Some(value) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };

    value.parse().map(Some).map_err(|_| {
        ScrapeError::MalformedInput(format!("{name} must be a non-negative integer, got {value:?}"))
    })
}
