//! Read-side accessors for the public site.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::related::{RelatedPost, RelatedPostsService};
use crate::application::render::PostRenderer;
use crate::application::repos::{
    PostQueryFilter, PostWithTaxonomy, PostsRepo, RepoError, TaxonomyRepo,
};
use crate::domain::entities::TaxonomyRecord;
use crate::domain::types::{Locale, TaxonomyKind};

pub const DEFAULT_LATEST_TAKE: u32 = 6;
pub const MAX_LATEST_TAKE: u32 = 100;
pub const DETAIL_RELATED_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalizedTaxonomy {
    pub slug: String,
    pub name: String,
}

impl LocalizedTaxonomy {
    pub fn from_record(record: &TaxonomyRecord, locale: Locale) -> Self {
        Self {
            slug: record.slug.clone(),
            name: record.display_name(locale).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxonomyEntryView {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
}

impl TaxonomyEntryView {
    fn from_record(record: &TaxonomyRecord, locale: Locale) -> Self {
        Self {
            id: record.id,
            slug: record.slug.clone(),
            name: record.display_name(locale).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummaryView {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub categories: Vec<LocalizedTaxonomy>,
}

impl PostSummaryView {
    fn from_post(post: &PostWithTaxonomy, locale: Locale) -> Self {
        Self {
            id: post.post.id,
            slug: post.post.slug.clone(),
            title: post.post.title.clone(),
            summary: post.post.summary.clone(),
            created_at: post.post.created_at,
            categories: localize_all(&post.categories, locale),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetailView {
    pub id: Uuid,
    pub slug: String,
    pub locale: Locale,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    /// `content` rendered from markdown and sanitized.
    pub content_html: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub categories: Vec<LocalizedTaxonomy>,
    pub tags: Vec<LocalizedTaxonomy>,
    pub related: Vec<RelatedPost>,
}

#[derive(Debug, Clone, Default)]
pub struct LatestPostsQuery {
    pub take: Option<u32>,
    pub category_slug: Option<String>,
    pub tag_slug: Option<String>,
}

#[derive(Clone)]
pub struct ContentService {
    posts: Arc<dyn PostsRepo>,
    taxonomy: Arc<dyn TaxonomyRepo>,
    related: RelatedPostsService,
    renderer: Arc<PostRenderer>,
}

impl ContentService {
    pub fn new(posts: Arc<dyn PostsRepo>, taxonomy: Arc<dyn TaxonomyRepo>) -> Self {
        let related = RelatedPostsService::new(posts.clone());
        Self {
            posts,
            taxonomy,
            related,
            renderer: Arc::new(PostRenderer::new()),
        }
    }

    /// Published posts in `locale`, newest first. `take` defaults to six and
    /// is clamped to `1..=MAX_LATEST_TAKE`.
    pub async fn latest_posts(
        &self,
        locale: Locale,
        query: LatestPostsQuery,
    ) -> Result<Vec<PostSummaryView>, ContentError> {
        let take = query
            .take
            .unwrap_or(DEFAULT_LATEST_TAKE)
            .clamp(1, MAX_LATEST_TAKE);
        let filter = PostQueryFilter {
            category_slug: non_blank(query.category_slug),
            tag_slug: non_blank(query.tag_slug),
        };

        let posts = self.posts.list_published(locale, &filter, take).await?;
        Ok(posts
            .iter()
            .map(|post| PostSummaryView::from_post(post, locale))
            .collect())
    }

    pub async fn featured_post(
        &self,
        locale: Locale,
    ) -> Result<Option<PostSummaryView>, ContentError> {
        let posts = self
            .posts
            .list_published(locale, &PostQueryFilter::default(), 1)
            .await?;
        Ok(posts
            .first()
            .map(|post| PostSummaryView::from_post(post, locale)))
    }

    pub async fn post_detail(
        &self,
        locale: Locale,
        slug: &str,
    ) -> Result<PostDetailView, ContentError> {
        let Some(found) = self.posts.find_published_by_slug(locale, slug).await? else {
            return Err(ContentError::NotFound("post"));
        };

        let related = self
            .related
            .related_posts(found.post.id, locale, DETAIL_RELATED_LIMIT)
            .await?;

        let PostWithTaxonomy {
            post,
            categories,
            tags,
        } = found;

        Ok(PostDetailView {
            id: post.id,
            slug: post.slug,
            locale: post.locale,
            title: post.title,
            summary: post.summary,
            content_html: self.renderer.render(&post.content),
            content: post.content,
            created_at: post.created_at,
            updated_at: post.updated_at,
            categories: localize_all(&categories, locale),
            tags: localize_all(&tags, locale),
            related,
        })
    }

    pub async fn taxonomy(
        &self,
        kind: TaxonomyKind,
        locale: Locale,
    ) -> Result<Vec<TaxonomyEntryView>, ContentError> {
        let records = self.taxonomy.list(kind).await?;
        Ok(records
            .iter()
            .map(|record| TaxonomyEntryView::from_record(record, locale))
            .collect())
    }

    pub async fn taxonomy_by_slug(
        &self,
        kind: TaxonomyKind,
        slug: &str,
        locale: Locale,
    ) -> Result<TaxonomyEntryView, ContentError> {
        self.taxonomy
            .find_by_slug(kind, slug)
            .await?
            .map(|record| TaxonomyEntryView::from_record(&record, locale))
            .ok_or(ContentError::NotFound(kind.as_str()))
    }
}

fn localize_all(records: &[TaxonomyRecord], locale: Locale) -> Vec<LocalizedTaxonomy> {
    records
        .iter()
        .map(|record| LocalizedTaxonomy::from_record(record, locale))
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
