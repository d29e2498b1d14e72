use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::application::auth::{ADMIN_COOKIE_NAME, AdminCredentials};

use super::error::ApiError;
use super::state::ApiState;

/// Reject requests that neither the platform identity service nor the
/// admin key cookie vouch for. The resolved principal is stored in the
/// request extensions and echoed on the response for access logging.
pub async fn admin_auth(
    State(state): State<ApiState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let cookie_header = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let credentials = AdminCredentials {
        cookie_header: cookie_header.as_deref(),
        admin_key_cookie: jar.get(ADMIN_COOKIE_NAME).map(|cookie| cookie.value()),
    };

    let Some(principal) = state.gate.authorize(credentials).await else {
        return ApiError::unauthorized().into_response();
    };

    request.extensions_mut().insert(principal);
    let mut response = next.run(request).await;
    response.extensions_mut().insert(principal);
    response
}
