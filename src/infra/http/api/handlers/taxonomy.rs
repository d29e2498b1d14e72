//! Category and tag maintenance handlers

use axum::Json;
use axum::extract::{Extension, State};
use axum::response::IntoResponse;

use crate::application::auth::AdminPrincipal;
use crate::domain::types::TaxonomyKind;

use super::taxonomy_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::TaxonomyUpsertRequest;
use crate::infra::http::api::state::ApiState;

pub async fn list_categories(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .taxonomy
        .list(TaxonomyKind::Category)
        .await
        .map_err(taxonomy_to_api)?;
    Ok(Json(records))
}

pub async fn upsert_category(
    State(state): State<ApiState>,
    Extension(principal): Extension<AdminPrincipal>,
    Json(payload): Json<TaxonomyUpsertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .taxonomy
        .upsert(
            ApiState::actor_label(principal),
            TaxonomyKind::Category,
            payload.into(),
        )
        .await
        .map_err(taxonomy_to_api)?;
    Ok(Json(record))
}

pub async fn list_tags(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let records = state
        .taxonomy
        .list(TaxonomyKind::Tag)
        .await
        .map_err(taxonomy_to_api)?;
    Ok(Json(records))
}

pub async fn upsert_tag(
    State(state): State<ApiState>,
    Extension(principal): Extension<AdminPrincipal>,
    Json(payload): Json<TaxonomyUpsertRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .taxonomy
        .upsert(
            ApiState::actor_label(principal),
            TaxonomyKind::Tag,
            payload.into(),
        )
        .await
        .map_err(taxonomy_to_api)?;
    Ok(Json(record))
}
