use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::domain::types::{Locale, PostStatus};

#[derive(Debug, Error)]
pub enum AdminPostError {
    #[error("Missing title or slug")]
    MissingSlug,
    #[error("Missing post ID")]
    MissingId,
    #[error("missing required field `{0}`")]
    ConstraintViolation(&'static str),
    #[error("unknown {kind} `{slug}`")]
    UnknownTaxonomy { kind: &'static str, slug: String },
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Serialize)]
pub struct PostSummarySnapshot<'a> {
    pub slug: &'a str,
    pub locale: Locale,
    pub title: &'a str,
    pub status: PostStatus,
}

/// Create-or-update keyed on `(slug, locale)`.
///
/// `categories` and `tags` hold slugs; `None` leaves existing links alone
/// and `Some(vec![])` clears them.
#[derive(Debug, Clone, Default)]
pub struct CreatePostCommand {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub locale: Locale,
    pub slug: Option<String>,
    pub status: PostStatus,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdatePostCommand {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
    pub categories: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
}

/// Subscribers hear about a post only when a save moves it into
/// `Published` from any other state, including not existing yet.
pub fn should_notify(previous: Option<PostStatus>, next: PostStatus) -> bool {
    next.is_published() && !previous.is_some_and(PostStatus::is_published)
}

/// Blank ids are missing; ids that are not UUIDs cannot match any post.
pub fn parse_post_id(raw: Option<&str>) -> Result<Uuid, AdminPostError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(AdminPostError::MissingId)?;
    Uuid::parse_str(raw).map_err(|_| AdminPostError::NotFound)
}

pub fn ensure_non_empty(value: Option<&str>, field: &'static str) -> Result<(), AdminPostError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(()),
        _ => Err(AdminPostError::ConstraintViolation(field)),
    }
}
