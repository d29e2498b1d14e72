use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::PostRecord;
use crate::domain::types::{Locale, PostStatus};

pub(super) const POST_COLUMNS: &str =
    "p.id, p.slug, p.locale, p.title, p.summary, p.content, p.status, p.created_at, p.updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct PostRow {
    pub(crate) id: Uuid,
    pub(crate) slug: String,
    pub(crate) locale: Locale,
    pub(crate) title: String,
    pub(crate) summary: Option<String>,
    pub(crate) content: String,
    pub(crate) status: PostStatus,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) updated_at: OffsetDateTime,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            locale: row.locale,
            title: row.title,
            summary: row.summary,
            content: row.content,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct SitemapRow {
    pub(crate) slug: String,
    pub(crate) locale: Locale,
    pub(crate) updated_at: OffsetDateTime,
}
