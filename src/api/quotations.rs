use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{Quotation, QuotationDraft, TableSubmission};

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub(super) struct Deleted {
    message: &'static str,
    id: i64,
}

pub(super) async fn list_quotations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Quotation>>, ApiError> {
    let quotations = state
        .database
        .list_quotations()
        .await
        .map_err(|e| ApiError::database(&e))?;

    Ok(Json(quotations))
}

pub(super) async fn latest_quotation(
    State(state): State<AppState>,
) -> Result<Json<Quotation>, ApiError> {
    state
        .database
        .latest_quotation()
        .await
        .map_err(|e| ApiError::database(&e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quotation"))
}

pub(super) async fn get_quotation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Quotation>, ApiError> {
    state
        .database
        .get_quotation(id)
        .await
        .map_err(|e| ApiError::database(&e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quotation"))
}

/// `POST /api/quotation` with the flat record
pub(super) async fn create_quotation(
    State(state): State<AppState>,
    Json(record): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Quotation>), ApiError> {
    let draft = QuotationDraft::from_flat(&record)?;
    let quotation = state
        .database
        .create_quotation(&draft)
        .await
        .map_err(|e| ApiError::database(&e))?;

    Ok((StatusCode::CREATED, Json(quotation)))
}

pub(super) async fn update_quotation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(record): Json<Map<String, Value>>,
) -> Result<Json<Quotation>, ApiError> {
    let draft = QuotationDraft::from_flat(&record)?;

    state
        .database
        .update_quotation(id, &draft)
        .await
        .map_err(|e| ApiError::database(&e))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quotation"))
}

pub(super) async fn delete_quotation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Deleted>, ApiError> {
    let deleted = state
        .database
        .delete_quotation(id)
        .await
        .map_err(|e| ApiError::database(&e))?;

    if !deleted {
        return Err(ApiError::not_found("Quotation"));
    }

    Ok(Json(Deleted {
        message: "Quotation deleted",
        id,
    }))
}

/// `POST /quotation` with the new-quotation table form
pub(super) async fn submit_table(
    State(state): State<AppState>,
    Json(form): Json<TableSubmission>,
) -> Result<(StatusCode, Json<Quotation>), ApiError> {
    let draft = QuotationDraft::from_table(&form)?;
    let quotation = state
        .database
        .create_quotation(&draft)
        .await
        .map_err(|e| ApiError::database(&e))?;

    tracing::info!(
        "Quotation {} submitted from table with {} rows",
        quotation.id,
        form.table_data.len()
    );
    Ok((StatusCode::CREATED, Json(quotation)))
}
