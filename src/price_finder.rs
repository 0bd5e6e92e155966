use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::config::SearchSettings;
use crate::error::ScrapeError;
use crate::session::{SearchFailure, SearchOutcome, SearchSession, SessionStore};
use crate::traits::{PageSource, require_query};

pub const NO_RESULTS_MESSAGE: &str = "No results found";

/// Runs price searches against the upstream and records their outcome.
#[derive(Clone)]
pub struct PriceFinder {
    source: Arc<dyn PageSource>,
    settings: SearchSettings,
    sessions: SessionStore,
}

impl PriceFinder {
    pub fn new(source: Arc<dyn PageSource>, settings: SearchSettings) -> Self {
        Self {
            source,
            settings,
            sessions: SessionStore::new(),
        }
    }

    pub fn source(&self) -> &dyn PageSource {
        self.source.as_ref()
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Searches `query` across up to `pages` pages, falling back to the
    /// single-page search when the paginated walk finds nothing.
    ///
    /// The search runs on its own task, so it still completes and publishes
    /// its outcome if the caller stops waiting.
    /// Upstream failures end up in the returned outcome, never as `Err`.
    ///
    /// # Errors
    /// * `ScrapeError::MalformedInput` - the query is blank
    /// * `ScrapeError::Interrupted` - the search task was cancelled
    pub async fn search(&self, query: &str, pages: Option<u32>) -> Result<SearchOutcome, ScrapeError> {
        let query = require_query(query)?.to_string();
        let pages = self.settings.clamp_pages(pages);

        let finder = self.clone();
        let handle = tokio::spawn(async move { finder.run(&query, pages).await });

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(ScrapeError::Interrupted(e.to_string())),
        }
    }

    async fn run(&self, query: &str, pages: u32) -> Result<SearchOutcome, ScrapeError> {
        let ticket = self.sessions.begin(query, pages).await;
        let upstream = self.source.upstream();
        let aggregator = Aggregator::new(self.source.as_ref(), self.settings.page_delay);

        let listings = aggregator.collect(query, pages).await?;

        let outcome = if listings.is_empty() {
            info!("No listings across {} pages for '{}', trying single-page search", pages, query);
            let single_url = upstream.single_page_url(query);

            match aggregator.collect_single(query).await {
                Ok(listings) => SearchOutcome::Results(SearchSession {
                    id: ticket,
                    query: query.to_string(),
                    pages_requested: pages,
                    message: listings.is_empty().then(|| NO_RESULTS_MESSAGE.to_string()),
                    listings,
                    source_url: single_url,
                    completed_at: Utc::now(),
                }),
                Err(e) => {
                    warn!(query, error = %e, "Single-page search failed");
                    SearchOutcome::Failed(SearchFailure {
                        query: query.to_string(),
                        attempted_url: single_url.clone(),
                        error: e.to_string(),
                        manual_url: single_url.clone(),
                        embed_url: single_url,
                    })
                }
            }
        } else {
            SearchOutcome::Results(SearchSession {
                id: ticket,
                query: query.to_string(),
                pages_requested: pages,
                listings,
                source_url: upstream.page_url(query, upstream.start_offset(1)),
                message: None,
                completed_at: Utc::now(),
            })
        };

        self.sessions.complete(ticket, outcome.clone()).await;
        Ok(outcome)
    }

    /// Runs the most recent search again with the same page count.
    ///
    /// # Errors
    /// * `ScrapeError::MalformedInput` - there is no previous search
    pub async fn retry(&self) -> Result<SearchOutcome, ScrapeError> {
        let (query, pages) = self.sessions.last_request().await.ok_or_else(|| {
            ScrapeError::MalformedInput("there is no previous search to retry".to_string())
        })?;

        info!("Retrying search for '{}'", query);
        self.search(&query, Some(pages)).await
    }
}
