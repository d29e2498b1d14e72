//! Slug derivation for posts, categories and tags.
//!
//! Titles are run through `slug::slugify`, which transliterates non-ASCII
//! text, lowercases, and collapses every run of other characters into a
//! single `-`.

use slug::slugify;
use thiserror::Error;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Use the editor-supplied slug when present, otherwise derive one from the
/// title. A supplied slug is kept verbatim.
pub fn resolve_slug(supplied: Option<&str>, title: Option<&str>) -> Result<String, SlugError> {
    match supplied.map(str::trim).filter(|slug| !slug.is_empty()) {
        Some(slug) => Ok(slug.to_string()),
        None => derive_slug(title.unwrap_or_default()),
    }
}
