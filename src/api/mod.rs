mod favorites;
mod proxy;
mod quotations;
mod search;

use std::path::Path;

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::database::Database;
use crate::models::QuotationInputError;
use crate::price_finder::PriceFinder;

pub use proxy::ProxyEnvelope;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub finder: PriceFinder,
}

/// Error body of the quotation and favorites routes
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    pub fn bad_request(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            details: Some(details.into()),
            ..Self::new(StatusCode::BAD_REQUEST, error)
        }
    }

    pub fn database(error: &anyhow::Error) -> Self {
        tracing::error!(error = %error, "database query failed");
        Self {
            details: Some(format!("{error:#}")),
            ..Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

impl From<QuotationInputError> for ApiError {
    fn from(error: QuotationInputError) -> Self {
        Self::bad_request("Invalid quotation", error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/staticice-proxy", get(proxy::proxy_search))
        .route("/api/staticice-proxy-multipage", get(proxy::proxy_page))
        .route("/api/price-search", get(search::run_search))
        .route("/api/price-search/retry", post(search::retry_search))
        .route("/api/price-search/state", get(search::search_state))
        .route("/api/price-search/view", get(search::filtered_view))
        .route("/api/price-search/table", get(search::results_table))
        .route("/api/price-search/export", get(search::export_results))
        .route("/api/quotations", get(quotations::list_quotations))
        .route("/api/quotation", post(quotations::create_quotation))
        .route("/api/quotation/latest", get(quotations::latest_quotation))
        .route(
            "/api/quotation/{id}",
            get(quotations::get_quotation)
                .put(quotations::update_quotation)
                .delete(quotations::delete_quotation),
        )
        .route("/quotation", post(quotations::submit_table))
        .route("/api/favorites", get(favorites::list_favorites))
        .route(
            "/api/favorites/{id}",
            post(favorites::add_favorite).delete(favorites::remove_favorite),
        )
}

/// Builds the application router; unmatched paths are served from
/// `static_dir` when one is given.
pub fn build_app(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = api_router();
    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors()),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.database.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthData {
                status: "ok",
                database: "ok",
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthData {
                    status: "degraded",
                    database: "unavailable",
                }),
            )
        }
    }
}
