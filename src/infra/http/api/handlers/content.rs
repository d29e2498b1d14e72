//! Public content handlers, scoped by locale.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;

use crate::application::content::TaxonomyEntryView;
use crate::domain::types::TaxonomyKind;

use super::{content_to_api, parse_locale};
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::LatestPostsParams;
use crate::infra::http::api::state::ApiState;

pub async fn latest_posts(
    State(state): State<ApiState>,
    Path(locale): Path<String>,
    Query(params): Query<LatestPostsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let locale = parse_locale(&locale)?;
    let posts = state
        .content
        .latest_posts(locale, params.into())
        .await
        .map_err(content_to_api)?;
    Ok(Json(posts))
}

/// Responds with `null` when nothing is published in the locale.
pub async fn featured_post(
    State(state): State<ApiState>,
    Path(locale): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let locale = parse_locale(&locale)?;
    let post = state
        .content
        .featured_post(locale)
        .await
        .map_err(content_to_api)?;
    Ok(Json(post))
}

pub async fn post_detail(
    State(state): State<ApiState>,
    Path((locale, slug)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let locale = parse_locale(&locale)?;
    let post = state
        .content
        .post_detail(locale, &slug)
        .await
        .map_err(content_to_api)?;
    Ok(Json(post))
}

pub async fn localized_categories(
    State(state): State<ApiState>,
    Path(locale): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    localized_taxonomy(&state, TaxonomyKind::Category, &locale).await
}

pub async fn localized_category(
    State(state): State<ApiState>,
    Path((locale, slug)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    localized_taxonomy_entry(&state, TaxonomyKind::Category, &locale, &slug).await
}

pub async fn localized_tags(
    State(state): State<ApiState>,
    Path(locale): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    localized_taxonomy(&state, TaxonomyKind::Tag, &locale).await
}

pub async fn localized_tag(
    State(state): State<ApiState>,
    Path((locale, slug)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    localized_taxonomy_entry(&state, TaxonomyKind::Tag, &locale, &slug).await
}

async fn localized_taxonomy(
    state: &ApiState,
    kind: TaxonomyKind,
    locale: &str,
) -> Result<Json<Vec<TaxonomyEntryView>>, ApiError> {
    let locale = parse_locale(locale)?;
    let entries = state
        .content
        .taxonomy(kind, locale)
        .await
        .map_err(content_to_api)?;
    Ok(Json(entries))
}

async fn localized_taxonomy_entry(
    state: &ApiState,
    kind: TaxonomyKind,
    locale: &str,
    slug: &str,
) -> Result<Json<TaxonomyEntryView>, ApiError> {
    let locale = parse_locale(locale)?;
    let entry = state
        .content
        .taxonomy_by_slug(kind, slug, locale)
        .await
        .map_err(content_to_api)?;
    Ok(Json(entry))
}
