use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use super::collections::ContributorPayload;
use super::{validation, ApiJson};
use crate::db::models::ContributorChanges;
use crate::error::ApiError;
use crate::AppState;

pub async fn list_contributors(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let contributors = crate::db::list_contributors(&state.db).await?;
    Ok(Json(json!({ "data": contributors })))
}

pub async fn show_contributor(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let contributor = crate::db::get_contributor(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Contributor not found."))?;
    Ok(Json(json!({ "data": contributor })))
}

async fn apply_contributor_changes(
    state: &AppState,
    id: i64,
    changes: ContributorChanges,
) -> Result<impl IntoResponse, ApiError> {
    if !crate::db::update_contributor(&state.db, id, changes).await? {
        return Err(ApiError::NotFound("Contributor not found."));
    }
    Ok(Json(json!({ "message": "Contributor updated." })))
}

pub async fn replace_contributor(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContributorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = ContributorChanges {
        user_name: Some(validation::text(
            "userName",
            validation::required("userName", req.user_name)?,
        )?),
        amount: Some(validation::amount(
            "amount",
            validation::required("amount", req.amount)?,
        )?),
    };
    apply_contributor_changes(&state, id, changes).await
}

pub async fn update_contributor(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ContributorPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let changes = ContributorChanges {
        user_name: validation::optional_text("userName", req.user_name)?,
        amount: req.amount.map(|a| validation::amount("amount", a)).transpose()?,
    };
    apply_contributor_changes(&state, id, changes).await
}

pub async fn delete_contributor(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    if !crate::db::delete_contributor(&state.db, id).await? {
        return Err(ApiError::NotFound("Contributor not found."));
    }
    tracing::info!(contributor_id = id, "contributor deleted");
    Ok(StatusCode::NO_CONTENT)
}
