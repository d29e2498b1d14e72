//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    ActivityLogRecord, PostRecord, SubscriberRecord, SubscriptionTokenRecord, TaxonomyRecord,
    TranslationRecord,
};
use crate::domain::recommendation::PostFeatures;
use crate::domain::types::{Locale, PostStatus, TaxonomyKind};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// A post joined with its localized-ready taxonomy entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostWithTaxonomy {
    #[serde(flatten)]
    pub post: PostRecord,
    pub categories: Vec<TaxonomyRecord>,
    pub tags: Vec<TaxonomyRecord>,
}

/// Another published post considered for the related list.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedCandidate {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub categories: Vec<TaxonomyRecord>,
    pub features: PostFeatures,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapPostEntry {
    pub slug: String,
    pub locale: Locale,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct PostQueryFilter {
    pub category_slug: Option<String>,
    pub tag_slug: Option<String>,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Published posts in `locale`, newest first.
    async fn list_published(
        &self,
        locale: Locale,
        filter: &PostQueryFilter,
        limit: u32,
    ) -> Result<Vec<PostWithTaxonomy>, RepoError>;

    async fn find_published_by_slug(
        &self,
        locale: Locale,
        slug: &str,
    ) -> Result<Option<PostWithTaxonomy>, RepoError>;

    /// Every post regardless of status, most recently updated first.
    async fn list_all(&self) -> Result<Vec<PostWithTaxonomy>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;

    async fn find_by_slug_and_locale(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<PostRecord>, RepoError>;

    async fn load_features(&self, id: Uuid) -> Result<Option<PostFeatures>, RepoError>;

    /// Published posts in `locale` other than `exclude`, ordered by
    /// `created_at DESC, id`.
    async fn list_related_candidates(
        &self,
        locale: Locale,
        exclude: Uuid,
    ) -> Result<Vec<RelatedCandidate>, RepoError>;

    async fn list_sitemap_entries(&self) -> Result<Vec<SitemapPostEntry>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub slug: String,
    pub locale: Locale,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub status: PostStatus,
}

/// `None` for `title`, `content` or `status` leaves the stored value alone.
/// `summary` is always written.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub status: Option<PostStatus>,
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    /// Returns `RepoError::NotFound` when the id is unknown.
    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;

    async fn replace_post_taxonomy(
        &self,
        kind: TaxonomyKind,
        post_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), RepoError>;

    /// Removes the post and its category and tag links in one transaction.
    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait TaxonomyRepo: Send + Sync {
    /// All entries of `kind`, ordered by default name.
    async fn list(&self, kind: TaxonomyKind) -> Result<Vec<TaxonomyRecord>, RepoError>;

    async fn find_by_slug(
        &self,
        kind: TaxonomyKind,
        slug: &str,
    ) -> Result<Option<TaxonomyRecord>, RepoError>;
}

#[derive(Debug, Clone)]
pub struct UpsertTaxonomyParams {
    pub slug: String,
    /// Replaces the default name when set. New rows fall back to the slug.
    pub name: Option<String>,
    pub translations: Vec<TranslationRecord>,
}

#[async_trait]
pub trait TaxonomyWriteRepo: Send + Sync {
    /// Insert or update by slug; translations are upserted per locale.
    async fn upsert(
        &self,
        kind: TaxonomyKind,
        params: UpsertTaxonomyParams,
    ) -> Result<TaxonomyRecord, RepoError>;
}

#[derive(Debug, Clone)]
pub struct IssueTokenParams {
    pub subscriber_id: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
}

/// An active subscriber paired with the newest token that is still usable
/// at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRecipient {
    pub subscriber_id: Uuid,
    pub email: String,
    pub unsubscribe_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    Redeemed,
    /// Another redemption committed first.
    AlreadyUsed,
}

#[async_trait]
pub trait SubscribersRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError>;

    async fn create_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError>;

    async fn set_active(&self, id: Uuid, active: bool) -> Result<SubscriberRecord, RepoError>;

    async fn issue_token(
        &self,
        params: IssueTokenParams,
    ) -> Result<SubscriptionTokenRecord, RepoError>;

    async fn find_token(&self, token: &str)
    -> Result<Option<SubscriptionTokenRecord>, RepoError>;

    /// Mark the token used and deactivate its subscriber as one unit.
    async fn redeem_token(
        &self,
        token_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<RedeemOutcome, RepoError>;

    async fn list_notification_recipients(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<NotificationRecipient>, RepoError>;

    async fn count_active(&self) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ActivityRepo: Send + Sync {
    async fn append_log(&self, record: ActivityLogRecord) -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn ping(&self) -> Result<(), RepoError>;
}
