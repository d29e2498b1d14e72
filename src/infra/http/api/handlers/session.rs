//! Admin session cookie handlers

use axum::Json;
use axum::extract::State;
use axum::http::header::CACHE_CONTROL;
use axum::response::IntoResponse;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::application::auth::ADMIN_COOKIE_NAME;

use super::session_to_api;
use crate::infra::http::api::error::ApiError;
use crate::infra::http::api::models::{OkResponse, SessionRequest};
use crate::infra::http::api::state::ApiState;

/// Exchange the admin key for an `admin_key` cookie.
pub async fn open_session(
    State(state): State<ApiState>,
    jar: CookieJar,
    Json(payload): Json<SessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let key = state
        .gate
        .open_session(payload.key.as_deref())
        .map_err(session_to_api)?;

    let max_age = time::Duration::seconds(
        i64::try_from(state.session_max_age.as_secs()).unwrap_or(i64::MAX),
    );
    let cookie = session_cookie(key.to_string(), max_age);

    Ok((
        [(CACHE_CONTROL, "no-store")],
        jar.add(cookie),
        Json(OkResponse::OK),
    ))
}

pub async fn close_session(jar: CookieJar) -> impl IntoResponse {
    let cookie = session_cookie(String::new(), time::Duration::ZERO);
    (
        [(CACHE_CONTROL, "no-store")],
        jar.add(cookie),
        Json(OkResponse::OK),
    )
}

fn session_cookie(value: String, max_age: time::Duration) -> Cookie<'static> {
    Cookie::build((ADMIN_COOKIE_NAME, value))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}
