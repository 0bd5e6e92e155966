use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::ScrapeError;
use crate::models::ListingRecord;
use crate::presentation::{PriceSummary, StoreFilter, export_csv, export_filename, render_table};
use crate::session::{SearchFailure, SearchOutcome, SearchSession, SearchState, SearchTicket};
use crate::traits::parse_count;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    pub q: Option<String>,
    pub pages: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StoresQuery {
    pub stores: Option<String>,
}

/// JSON form of the search state machine
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub(super) enum SearchView<'a> {
    Idle,
    Loading {
        ticket: SearchTicket,
        query: &'a str,
        pages: u32,
    },
    Results(ResultsView<'a>),
    Error(&'a SearchFailure),
}

#[derive(Debug, Serialize)]
pub(super) struct ResultsView<'a> {
    #[serde(flatten)]
    session: &'a SearchSession,
    summary: PriceSummary,
}

impl<'a> SearchView<'a> {
    fn results(session: &'a SearchSession) -> Self {
        Self::Results(ResultsView {
            summary: PriceSummary::from_listings(&session.listings),
            session,
        })
    }

    fn of_state(state: &'a SearchState) -> Self {
        match state {
            SearchState::Idle => Self::Idle,
            SearchState::Loading {
                ticket,
                query,
                pages,
            } => Self::Loading {
                ticket: *ticket,
                query,
                pages: *pages,
            },
            SearchState::Results(session) => Self::results(session),
            SearchState::Error(failure) => Self::Error(failure),
        }
    }

    fn of_outcome(outcome: &'a SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Results(session) => Self::results(session),
            SearchOutcome::Failed(failure) => Self::Error(failure),
        }
    }
}

/// Store-filtered slice of the last completed search
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FilteredView<'a> {
    query: &'a str,
    stores: Vec<&'a str>,
    summary: PriceSummary,
    listings: Vec<&'a ListingRecord>,
}

fn search_error(error: &ScrapeError) -> ApiError {
    match error {
        ScrapeError::MalformedInput(_) => ApiError::bad_request("Invalid search", error.to_string()),
        _ => {
            tracing::error!(error = %error, "Search did not complete");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Search failed")
        }
    }
}

async fn last_session(state: &AppState) -> Result<Arc<SearchSession>, ApiError> {
    state
        .finder
        .sessions()
        .last_session()
        .await
        .ok_or_else(|| ApiError::not_found("Search results"))
}

/// `GET /api/price-search?q=&pages=`
pub(super) async fn run_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let query = params.q.unwrap_or_default();
    let pages = parse_count("pages", params.pages.as_deref()).map_err(|e| search_error(&e))?;
    let outcome = state
        .finder
        .search(&query, pages)
        .await
        .map_err(|e| search_error(&e))?;

    Ok(Json(SearchView::of_outcome(&outcome)).into_response())
}

/// `POST /api/price-search/retry`
pub(super) async fn retry_search(State(state): State<AppState>) -> Result<Response, ApiError> {
    let outcome = state.finder.retry().await.map_err(|e| search_error(&e))?;
    Ok(Json(SearchView::of_outcome(&outcome)).into_response())
}

/// `GET /api/price-search/state`
pub(super) async fn search_state(State(state): State<AppState>) -> Response {
    let snapshot = state.finder.sessions().snapshot().await;
    Json(SearchView::of_state(&snapshot)).into_response()
}

/// `GET /api/price-search/view?stores=a,b`
pub(super) async fn filtered_view(
    State(state): State<AppState>,
    Query(params): Query<StoresQuery>,
) -> Result<Response, ApiError> {
    let session = last_session(&state).await?;
    let filter = StoreFilter::from_query(params.stores.as_deref());
    let listings = filter.apply(&session.listings);

    let view = FilteredView {
        query: &session.query,
        stores: filter.selected().collect(),
        summary: PriceSummary::from_listings(listings.iter().copied()),
        listings,
    };
    Ok(Json(view).into_response())
}

/// `GET /api/price-search/table?stores=`
pub(super) async fn results_table(
    State(state): State<AppState>,
    Query(params): Query<StoresQuery>,
) -> Result<Html<String>, ApiError> {
    let session = last_session(&state).await?;
    let filter = StoreFilter::from_query(params.stores.as_deref());

    Ok(Html(render_table(&filter.apply(&session.listings))))
}

/// `GET /api/price-search/export?stores=`
pub(super) async fn export_results(
    State(state): State<AppState>,
    Query(params): Query<StoresQuery>,
) -> Result<Response, ApiError> {
    let session = last_session(&state).await?;
    let filter = StoreFilter::from_query(params.stores.as_deref());
    let listings = filter.apply(&session.listings);
    if listings.is_empty() {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "No data to export"));
    }

    let csv = export_csv(&listings).map_err(|e| {
        tracing::error!(error = %e, "CSV export failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Export failed")
    })?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export_filename(&session.query)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}
