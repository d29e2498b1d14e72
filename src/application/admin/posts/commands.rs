use uuid::Uuid;

use crate::application::repos::{
    CreatePostParams, PostWithTaxonomy, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;
use crate::domain::slug::resolve_slug;
use crate::domain::types::TaxonomyKind;

use super::service::AdminPostService;
use super::types::{
    AdminPostError, CreatePostCommand, PostSummarySnapshot, UpdatePostCommand, ensure_non_empty,
    parse_post_id, should_notify,
};

impl AdminPostService {
    pub async fn list_posts(&self) -> Result<Vec<PostWithTaxonomy>, AdminPostError> {
        self.reader.list_all().await.map_err(AdminPostError::from)
    }

    /// Insert a post, or update the one already stored under the same slug
    /// and locale.
    pub async fn save_post(
        &self,
        actor: &str,
        command: CreatePostCommand,
    ) -> Result<PostRecord, AdminPostError> {
        let slug = resolve_slug(command.slug.as_deref(), command.title.as_deref())
            .map_err(|_| AdminPostError::MissingSlug)?;

        let category_ids = self
            .resolve_taxonomy(TaxonomyKind::Category, command.categories.as_deref())
            .await?;
        let tag_ids = self
            .resolve_taxonomy(TaxonomyKind::Tag, command.tags.as_deref())
            .await?;

        let existing = self
            .reader
            .find_by_slug_and_locale(&slug, command.locale)
            .await?;
        let previous = existing.as_ref().map(|post| post.status);

        let (post, action) = match existing {
            Some(existing) => {
                let post = self
                    .writer
                    .update_post(UpdatePostParams {
                        id: existing.id,
                        title: command.title,
                        summary: command.summary,
                        content: command.content,
                        status: Some(command.status),
                    })
                    .await?;
                (post, "post.update")
            }
            None => {
                ensure_non_empty(command.title.as_deref(), "title")?;
                ensure_non_empty(command.content.as_deref(), "content")?;
                let post = self
                    .writer
                    .create_post(CreatePostParams {
                        slug,
                        locale: command.locale,
                        title: command.title.unwrap_or_default(),
                        summary: command.summary,
                        content: command.content.unwrap_or_default(),
                        status: command.status,
                    })
                    .await?;
                (post, "post.create")
            }
        };

        self.apply_taxonomy(post.id, category_ids, tag_ids).await?;
        self.record(actor, action, &post).await;

        if should_notify(previous, command.status) {
            self.announce(&post).await;
        }

        Ok(post)
    }

    pub async fn update_post(
        &self,
        actor: &str,
        command: UpdatePostCommand,
    ) -> Result<PostRecord, AdminPostError> {
        let id = parse_post_id(command.id.as_deref())?;

        let category_ids = self
            .resolve_taxonomy(TaxonomyKind::Category, command.categories.as_deref())
            .await?;
        let tag_ids = self
            .resolve_taxonomy(TaxonomyKind::Tag, command.tags.as_deref())
            .await?;

        let current = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(AdminPostError::NotFound)?;

        let post = self
            .writer
            .update_post(UpdatePostParams {
                id,
                title: command.title,
                summary: command.summary,
                content: command.content,
                status: command.status,
            })
            .await
            .map_err(not_found_as_missing_post)?;

        self.apply_taxonomy(post.id, category_ids, tag_ids).await?;
        self.record(actor, "post.update", &post).await;

        if command
            .status
            .is_some_and(|status| should_notify(Some(current.status), status))
        {
            self.announce(&post).await;
        }

        Ok(post)
    }

    pub async fn delete_post(&self, actor: &str, raw_id: Option<&str>) -> Result<(), AdminPostError> {
        let id = parse_post_id(raw_id)?;

        let post = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(AdminPostError::NotFound)?;

        self.writer
            .delete_post(id)
            .await
            .map_err(not_found_as_missing_post)?;

        self.record(actor, "post.delete", &post).await;
        Ok(())
    }

    async fn resolve_taxonomy(
        &self,
        kind: TaxonomyKind,
        slugs: Option<&[String]>,
    ) -> Result<Option<Vec<Uuid>>, AdminPostError> {
        let Some(slugs) = slugs else {
            return Ok(None);
        };

        let mut ids = Vec::with_capacity(slugs.len());
        for slug in slugs {
            let slug = slug.trim();
            if slug.is_empty() {
                continue;
            }
            let record = self.taxonomy.find_by_slug(kind, slug).await?.ok_or_else(|| {
                AdminPostError::UnknownTaxonomy {
                    kind: kind.as_str(),
                    slug: slug.to_string(),
                }
            })?;
            if !ids.contains(&record.id) {
                ids.push(record.id);
            }
        }
        Ok(Some(ids))
    }

    async fn apply_taxonomy(
        &self,
        post_id: Uuid,
        category_ids: Option<Vec<Uuid>>,
        tag_ids: Option<Vec<Uuid>>,
    ) -> Result<(), AdminPostError> {
        if let Some(ids) = category_ids {
            self.writer
                .replace_post_taxonomy(TaxonomyKind::Category, post_id, &ids)
                .await?;
        }
        if let Some(ids) = tag_ids {
            self.writer
                .replace_post_taxonomy(TaxonomyKind::Tag, post_id, &ids)
                .await?;
        }
        Ok(())
    }

    async fn record(&self, actor: &str, action: &str, post: &PostRecord) {
        let snapshot = PostSummarySnapshot {
            slug: &post.slug,
            locale: post.locale,
            title: &post.title,
            status: post.status,
        };
        self.activity
            .record_success(actor, action, Some(&post.id.to_string()), Some(&snapshot))
            .await;
    }
}

fn not_found_as_missing_post(err: RepoError) -> AdminPostError {
    match err {
        RepoError::NotFound => AdminPostError::NotFound,
        other => AdminPostError::Repo(other),
    }
}
