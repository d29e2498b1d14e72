//! Domain entities mirrored from persistent storage.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::types::{ActivityStatus, Locale, PostStatus, TokenType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: Uuid,
    pub slug: String,
    pub locale: Locale,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub status: PostStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationRecord {
    pub locale: Locale,
    pub name: String,
}

/// A category or tag. Both share the same shape: a locale-independent slug,
/// a default name and optional per-locale display names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomyRecord {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub translations: Vec<TranslationRecord>,
}

impl TaxonomyRecord {
    pub fn display_name(&self, locale: Locale) -> &str {
        crate::domain::localization::localized_name(&self.translations, locale, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriberRecord {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionTokenRecord {
    pub id: Uuid,
    pub token: String,
    pub subscriber_id: Uuid,
    pub token_type: TokenType,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub used_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityLogRecord {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub resource: Option<String>,
    pub status: ActivityStatus,
    pub payload: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
