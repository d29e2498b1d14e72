//! API handlers organized by resource type.
//!
//! Each submodule contains handlers for one resource. Conversions from
//! service errors to API errors are shared here.

mod content;
mod posts;
mod session;
mod subscriptions;
mod taxonomy;

pub use content::*;
pub use posts::*;
pub use session::*;
pub use subscriptions::*;
pub use taxonomy::*;

use axum::http::StatusCode;

use crate::application::admin::posts::AdminPostError;
use crate::application::admin::taxonomy::AdminTaxonomyError;
use crate::application::auth::SessionError;
use crate::application::content::ContentError;
use crate::application::repos::RepoError;
use crate::application::subscriptions::{SubscribeError, UnsubscribeError};
use crate::domain::error::DomainError;
use crate::domain::subscriptions::TokenRejection;
use crate::domain::types::Locale;

use super::error::ApiError;

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    let detail = err.to_string();
    match err {
        RepoError::Duplicate { .. } => {
            ApiError::new(StatusCode::CONFLICT, "Duplicate record", Some(detail))
        }
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => {
            ApiError::new(StatusCode::BAD_REQUEST, "Invalid input", Some(message))
        }
        RepoError::Integrity { .. } => ApiError::new(
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            Some(detail),
        ),
        RepoError::Timeout => {
            ApiError::internal(StatusCode::SERVICE_UNAVAILABLE, "Database timeout", detail)
        }
        RepoError::Persistence(_) => ApiError::internal(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable",
            detail,
        ),
    }
}

pub(crate) fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::UnsupportedLocale(_) => ApiError::bad_request(err.to_string()),
    }
}

/// Public routes answer unknown locales with 404.
pub(crate) fn parse_locale(raw: &str) -> Result<Locale, ApiError> {
    raw.parse::<Locale>()
        .map_err(|_| ApiError::not_found("Unknown locale"))
}

pub(crate) fn content_to_api(err: ContentError) -> ApiError {
    match err {
        ContentError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
        ContentError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn subscribe_to_api(err: SubscribeError) -> ApiError {
    match err {
        SubscribeError::InvalidEmail => ApiError::bad_request("Invalid email address"),
        SubscribeError::AlreadySubscribed => {
            ApiError::bad_request("You are already subscribed to our newsletter.")
        }
        other => ApiError::internal(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to subscribe. Please try again later.",
            error_chain(&other),
        ),
    }
}

pub(crate) fn unsubscribe_to_api(err: UnsubscribeError) -> ApiError {
    match err {
        UnsubscribeError::MissingToken => ApiError::bad_request("Unsubscribe token is required"),
        UnsubscribeError::UnknownToken => ApiError::bad_request("Invalid unsubscribe token"),
        UnsubscribeError::Rejected(TokenRejection::Expired) => {
            ApiError::bad_request("Unsubscribe token has expired")
        }
        UnsubscribeError::Rejected(TokenRejection::AlreadyUsed) => {
            ApiError::bad_request("This unsubscribe link has already been used")
        }
        UnsubscribeError::Repo(err) => ApiError::internal(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to unsubscribe. Please try again later.",
            err.to_string(),
        ),
    }
}

pub(crate) fn admin_post_to_api(err: AdminPostError) -> ApiError {
    match err {
        AdminPostError::NotFound => ApiError::not_found("Post not found"),
        AdminPostError::Repo(err) => repo_to_api(err),
        other => ApiError::bad_request(other.to_string()),
    }
}

pub(crate) fn taxonomy_to_api(err: AdminTaxonomyError) -> ApiError {
    match err {
        AdminTaxonomyError::MissingSlug => ApiError::bad_request("Missing slug"),
        AdminTaxonomyError::InvalidLocale(err) => domain_to_api(err),
        AdminTaxonomyError::Repo(err) => repo_to_api(err),
    }
}

pub(crate) fn session_to_api(err: SessionError) -> ApiError {
    match err {
        SessionError::NotConfigured => ApiError::internal(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Admin key not configured",
            "admin session requested without a configured admin key".to_string(),
        ),
        SessionError::InvalidKey => ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Invalid admin key",
            None,
        ),
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(inner) = current {
        parts.push(inner.to_string());
        current = inner.source();
    }
    parts.join(": ")
}
