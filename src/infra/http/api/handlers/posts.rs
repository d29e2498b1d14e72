//! Posts handlers

use axum::Json;
use axum::extract::{Extension, Query, State};
use axum::response::IntoResponse;

use crate::application::auth::AdminPrincipal;

use super::admin_post_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    OkResponse, PostCreateRequest, PostDeleteQuery, PostMutationResponse, PostUpdateRequest,
};
use crate::infra::http::api::state::ApiState;

pub async fn list_posts(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let posts = state.posts.list_posts().await.map_err(admin_post_to_api)?;
    Ok(Json(posts))
}

pub async fn create_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<AdminPrincipal>,
    Json(payload): Json<PostCreateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let command = payload.into_command()?;
    let post = state
        .posts
        .save_post(ApiState::actor_label(principal), command)
        .await
        .map_err(admin_post_to_api)?;

    Ok(Json(PostMutationResponse { ok: true, post }))
}

pub async fn update_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<AdminPrincipal>,
    Json(payload): Json<PostUpdateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .posts
        .update_post(ApiState::actor_label(principal), payload.into())
        .await
        .map_err(admin_post_to_api)?;

    Ok(Json(PostMutationResponse { ok: true, post }))
}

pub async fn delete_post(
    State(state): State<ApiState>,
    Extension(principal): Extension<AdminPrincipal>,
    Query(query): Query<PostDeleteQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .posts
        .delete_post(ApiState::actor_label(principal), query.id.as_deref())
        .await
        .map_err(admin_post_to_api)?;

    Ok(Json(OkResponse::OK))
}
