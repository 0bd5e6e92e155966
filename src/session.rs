//! State of the most recent price search
//!
//! Searches are identified by a monotonically increasing ticket. Only the
//! latest ticket may publish an outcome, so a slow search that was superseded
//! by a newer one cannot overwrite the newer results.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::models::ListingRecord;

/// Generation number of one search
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SearchTicket(u64);

impl fmt::Display for SearchTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A completed search and its normalized listings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSession {
    pub id: SearchTicket,
    pub query: String,
    pub pages_requested: u32,
    pub listings: Vec<ListingRecord>,
    /// Upstream URL the listings were taken from (first page or single page)
    pub source_url: String,
    /// Set when the search succeeded but found nothing
    pub message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Both the paginated and the single-page search failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFailure {
    pub query: String,
    pub attempted_url: String,
    /// Error text exactly as the fetcher reported it
    pub error: String,
    /// Link for opening the search on the upstream site directly
    pub manual_url: String,
    /// Same search, for a best-effort inline frame
    pub embed_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Results(SearchSession),
    Failed(SearchFailure),
}

/// `Idle -> Loading -> {Results | Error}`, back to `Loading` on the next search
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Loading {
        ticket: SearchTicket,
        query: String,
        pages: u32,
    },
    Results(Arc<SearchSession>),
    Error(SearchFailure),
}

impl SearchState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading { .. } => "loading",
            Self::Results(_) => "results",
            Self::Error(_) => "error",
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    issued: u64,
    state: SearchState,
    last_request: Option<(String, u32)>,
    last_session: Option<Arc<SearchSession>>,
}

/// Shared holder of the search state machine
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<Inner>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new ticket and moves to `Loading`.
    ///
    /// The state stays `Loading` until [`SessionStore::complete`] runs for
    /// this ticket or a newer search begins.
    pub async fn begin(&self, query: &str, pages: u32) -> SearchTicket {
        let mut inner = self.inner.lock().await;
        inner.issued += 1;
        let ticket = SearchTicket(inner.issued);

        inner.last_request = Some((query.to_string(), pages));
        inner.state = SearchState::Loading {
            ticket,
            query: query.to_string(),
            pages,
        };

        debug!(%ticket, query, pages, "Search started");
        ticket
    }

    /// Publishes the outcome of `ticket` if it is still the latest search.
    ///
    /// Returns `false` and leaves the state untouched for a stale ticket.
    pub async fn complete(&self, ticket: SearchTicket, outcome: SearchOutcome) -> bool {
        let mut inner = self.inner.lock().await;
        if ticket.0 != inner.issued {
            debug!(
                %ticket,
                latest = inner.issued,
                "Discarding outcome of superseded search"
            );
            return false;
        }

        inner.state = match outcome {
            SearchOutcome::Results(session) => {
                let session = Arc::new(session);
                inner.last_session = Some(Arc::clone(&session));
                SearchState::Results(session)
            }
            SearchOutcome::Failed(failure) => {
                inner.last_session = None;
                SearchState::Error(failure)
            }
        };
        true
    }

    pub async fn snapshot(&self) -> SearchState {
        self.inner.lock().await.state.clone()
    }

    /// Query and page count of the most recent search, for retries
    pub async fn last_request(&self) -> Option<(String, u32)> {
        self.inner.lock().await.last_request.clone()
    }

    /// Most recently completed result set.
    ///
    /// Stays available while a newer search is loading; cleared when the
    /// newest search ends in the error state.
    pub async fn last_session(&self) -> Option<Arc<SearchSession>> {
        self.inner.lock().await.last_session.clone()
    }
}
