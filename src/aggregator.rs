//! Multi-page collection of search results

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::models::ListingRecord;
use crate::normalize::normalize_listings;
use crate::scrapers::parse_page;
use crate::traits::{PageSource, require_query};

/// Walks consecutive result pages of one query and merges them.
pub struct Aggregator<'a> {
    source: &'a dyn PageSource,
    page_delay: Duration,
}

impl<'a> Aggregator<'a> {
    pub fn new(source: &'a dyn PageSource, page_delay: Duration) -> Self {
        Self { source, page_delay }
    }

    /// Fetches up to `pages` pages and returns the normalized listings.
    ///
    /// A page that fails to fetch is skipped; a page with no listings ends
    /// the walk.
    ///
    /// # Errors
    /// * `ScrapeError::MalformedInput` - the query is blank
    pub async fn collect(&self, query: &str, pages: u32) -> Result<Vec<ListingRecord>, ScrapeError> {
        let query = require_query(query)?;
        let upstream = self.source.upstream();
        let pages = pages.max(1);

        info!("Searching {} for '{}' across up to {} pages", upstream.name, query, pages);

        let mut listings = Vec::new();

        for page in 1..=pages {
            if page > 1 && !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }

            let start = upstream.start_offset(page);
            debug!("Fetching page {} (start {}) for '{}'", page, start, query);

            let html = match self.source.fetch_page(query, start).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(page, error = %e, "Skipping page that failed to fetch");
                    continue;
                }
            };

            let found = parse_page(&html, upstream);
            if found.is_empty() {
                info!("Page {} for '{}' had no listings, stopping", page, query);
                break;
            }

            debug!("Page {} yielded {} listings", page, found.len());
            listings.extend(found);
        }

        let listings = normalize_listings(listings);
        info!("Collected {} listings for '{}'", listings.len(), query);
        Ok(listings)
    }

    /// Fetches the non-paginated search page once.
    ///
    /// # Errors
    /// * `ScrapeError::MalformedInput` - the query is blank
    /// * `ScrapeError::Network` / `ScrapeError::UpstreamStatus` - the fetch failed
    pub async fn collect_single(&self, query: &str) -> Result<Vec<ListingRecord>, ScrapeError> {
        let html = self.source.fetch_single(query).await?;
        let listings = normalize_listings(parse_page(&html, self.source.upstream()));

        info!("Single-page search for '{}' returned {} listings", query.trim(), listings.len());
        Ok(listings)
    }
}
