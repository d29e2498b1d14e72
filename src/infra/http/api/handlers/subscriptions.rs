//! Newsletter subscription handlers

use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use super::{repo_to_api, subscribe_to_api, unsubscribe_to_api};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{
    MessageResponse, SubscribeRequest, SubscriberCountResponse, UnsubscribeQuery,
};
use crate::infra::http::api::state::ApiState;

pub async fn subscribe(
    State(state): State<ApiState>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .subscriptions
        .subscribe(payload.email.as_deref().unwrap_or_default())
        .await
        .map_err(subscribe_to_api)?;

    Ok(Json(MessageResponse {
        message: "Successfully subscribed! Please check your email for confirmation.",
    }))
}

pub async fn unsubscribe(
    State(state): State<ApiState>,
    Query(query): Query<UnsubscribeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .subscriptions
        .unsubscribe(query.token.as_deref())
        .await
        .map_err(unsubscribe_to_api)?;

    Ok(Json(MessageResponse {
        message: "Successfully unsubscribed from the newsletter.",
    }))
}

pub async fn subscriber_count(
    State(state): State<ApiState>,
) -> Result<impl IntoResponse, ApiError> {
    let count = state
        .subscriptions
        .active_count()
        .await
        .map_err(repo_to_api)?;
    Ok(Json(SubscriberCountResponse { count }))
}
