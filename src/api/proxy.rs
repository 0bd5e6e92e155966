use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScrapeError;
use crate::traits::{parse_count, require_query};

use super::AppState;

/// Response of the proxy endpoints, successful or not
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProxyEnvelope {
    fn fetched(url: String, query: Option<String>, content: String) -> Self {
        Self {
            success: true,
            content: Some(content),
            url,
            query,
            error: None,
            message: None,
        }
    }

    fn failed(url: String, query: Option<String>, error: &ScrapeError) -> (StatusCode, Self) {
        let (status, summary) = if error.is_upstream_unavailable() {
            (StatusCode::BAD_GATEWAY, "Failed to fetch upstream page")
        } else {
            (StatusCode::BAD_REQUEST, "Invalid proxy request")
        };

        (
            status,
            Self {
                success: false,
                content: None,
                url,
                query,
                error: Some(summary.to_string()),
                message: Some(error.to_string()),
            },
        )
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchProxyQuery {
    pub q: Option<String>,
    pub start: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PageProxyQuery {
    pub url: Option<String>,
}

/// `GET /api/staticice-proxy?q=&start=`
///
/// Without `start` the plain single-page search is fetched.
pub(super) async fn proxy_search(
    State(state): State<AppState>,
    Query(params): Query<SearchProxyQuery>,
) -> (StatusCode, Json<ProxyEnvelope>) {
    let source = state.finder.source();
    let raw_query = params.q.unwrap_or_default();

    let query = match require_query(&raw_query) {
        Ok(query) => query,
        Err(e) => {
            let (status, envelope) = ProxyEnvelope::failed(String::new(), None, &e);
            return (status, Json(envelope));
        }
    };

    let start = match parse_count("start", params.start.as_deref()) {
        Ok(start) => start,
        Err(e) => {
            let (status, envelope) = ProxyEnvelope::failed(String::new(), Some(query.to_string()), &e);
            return (status, Json(envelope));
        }
    };

    let url = match start {
        Some(start) => source.upstream().page_url(query, start),
        None => source.upstream().single_page_url(query),
    };

    match source.fetch_url(&url).await {
        Ok(content) => (
            StatusCode::OK,
            Json(ProxyEnvelope::fetched(url, Some(query.to_string()), content)),
        ),
        Err(e) => {
            warn!(%url, error = %e, "Proxy search failed");
            let (status, envelope) = ProxyEnvelope::failed(url, Some(query.to_string()), &e);
            (status, Json(envelope))
        }
    }
}

/// `GET /api/staticice-proxy-multipage?url=`
///
/// Only URLs on the upstream origin are fetched.
pub(super) async fn proxy_page(
    State(state): State<AppState>,
    Query(params): Query<PageProxyQuery>,
) -> (StatusCode, Json<ProxyEnvelope>) {
    let url = params.url.map(|url| url.trim().to_string()).unwrap_or_default();
    if url.is_empty() {
        let error = ScrapeError::MalformedInput("url parameter is required".to_string());
        let (status, envelope) = ProxyEnvelope::failed(url, None, &error);
        return (status, Json(envelope));
    }

    match state.finder.source().fetch_url(&url).await {
        Ok(content) => (StatusCode::OK, Json(ProxyEnvelope::fetched(url, None, content))),
        Err(e) => {
            warn!(%url, error = %e, "Proxy page fetch failed");
            let (status, envelope) = ProxyEnvelope::failed(url, None, &e);
            (status, Json(envelope))
        }
    }
}
