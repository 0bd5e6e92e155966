use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use super::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub(super) struct FavoriteChange {
    id: i64,
    favorite: bool,
}

/// Ids of favorite quotations
pub(super) async fn list_favorites(State(state): State<AppState>) -> Result<Json<Vec<i64>>, ApiError> {
    let ids = state
        .database
        .list_favorites()
        .await
        .map_err(|e| ApiError::database(&e))?;

    Ok(Json(ids))
}

pub(super) async fn add_favorite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FavoriteChange>, ApiError> {
    let added = state
        .database
        .add_favorite(id)
        .await
        .map_err(|e| ApiError::database(&e))?;

    if !added {
        return Err(ApiError::not_found("Quotation"));
    }

    Ok(Json(FavoriteChange { id, favorite: true }))
}

/// Removing a quotation that is not a favorite is not an error.
pub(super) async fn remove_favorite(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<FavoriteChange>, ApiError> {
    state
        .database
        .remove_favorite(id)
        .await
        .map_err(|e| ApiError::database(&e))?;

    Ok(Json(FavoriteChange {
        id,
        favorite: false,
    }))
}
