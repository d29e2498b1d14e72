use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::application::repos::{
    PostQueryFilter, PostWithTaxonomy, PostsRepo, RelatedCandidate, RepoError, SitemapPostEntry,
};
use crate::domain::entities::PostRecord;
use crate::domain::recommendation::PostFeatures;
use crate::domain::types::{Locale, PostStatus, TaxonomyKind};
use crate::infra::db::map_sqlx_error;

use super::PostgresRepositories;
use super::types::{POST_COLUMNS, PostRow, SitemapRow};

impl PostgresRepositories {
    fn apply_taxonomy_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostQueryFilter) {
        if let Some(category) = filter.category_slug.as_deref() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM post_categories pc \
                 INNER JOIN categories c ON c.id = pc.category_id \
                 WHERE pc.post_id = p.id AND c.slug = ",
            );
            qb.push_bind(category.to_string());
            qb.push(")");
        }

        if let Some(tag) = filter.tag_slug.as_deref() {
            qb.push(
                " AND EXISTS (SELECT 1 FROM post_tags pt \
                 INNER JOIN tags t ON t.id = pt.tag_id \
                 WHERE pt.post_id = p.id AND t.slug = ",
            );
            qb.push_bind(tag.to_string());
            qb.push(")");
        }
    }

    async fn attach_taxonomy(
        &self,
        posts: Vec<PostRecord>,
    ) -> Result<Vec<PostWithTaxonomy>, RepoError> {
        let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
        let mut categories = self
            .load_post_taxonomy(TaxonomyKind::Category, &ids)
            .await?;
        let mut tags = self.load_post_taxonomy(TaxonomyKind::Tag, &ids).await?;

        Ok(posts
            .into_iter()
            .map(|post| PostWithTaxonomy {
                categories: categories.remove(&post.id).unwrap_or_default(),
                tags: tags.remove(&post.id).unwrap_or_default(),
                post,
            })
            .collect())
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_published(
        &self,
        locale: Locale,
        filter: &PostQueryFilter,
        limit: u32,
    ) -> Result<Vec<PostWithTaxonomy>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.locale = "));
        qb.push_bind(locale);
        qb.push(" AND p.status = ");
        qb.push_bind(PostStatus::Published);
        Self::apply_taxonomy_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id LIMIT ");
        qb.push_bind(i64::from(limit));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.attach_taxonomy(rows.into_iter().map(PostRecord::from).collect())
            .await
    }

    async fn find_published_by_slug(
        &self,
        locale: Locale,
        slug: &str,
    ) -> Result<Option<PostWithTaxonomy>, RepoError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             WHERE p.locale = $1 AND p.slug = $2 AND p.status = $3"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(locale)
            .bind(slug)
            .bind(PostStatus::Published)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self
            .attach_taxonomy(vec![PostRecord::from(row)])
            .await?
            .pop())
    }

    async fn list_all(&self) -> Result<Vec<PostWithTaxonomy>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p ORDER BY p.updated_at DESC, p.id");
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.attach_taxonomy(rows.into_iter().map(PostRecord::from).collect())
            .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn find_by_slug_and_locale(
        &self,
        slug: &str,
        locale: Locale,
    ) -> Result<Option<PostRecord>, RepoError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.slug = $1 AND p.locale = $2");
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(slug)
            .bind(locale)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }

    async fn load_features(&self, id: Uuid) -> Result<Option<PostFeatures>, RepoError> {
        let title: Option<String> = sqlx::query_scalar("SELECT title FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let Some(title) = title else {
            return Ok(None);
        };

        let mut categories = self
            .load_post_taxonomy_ids(TaxonomyKind::Category, &[id])
            .await?;
        let mut tags = self.load_post_taxonomy_ids(TaxonomyKind::Tag, &[id]).await?;

        Ok(Some(PostFeatures::new(
            categories.remove(&id).unwrap_or_default(),
            tags.remove(&id).unwrap_or_default(),
            title,
        )))
    }

    async fn list_related_candidates(
        &self,
        locale: Locale,
        exclude: Uuid,
    ) -> Result<Vec<RelatedCandidate>, RepoError> {
        let sql = format!(
            "SELECT {POST_COLUMNS} FROM posts p \
             WHERE p.locale = $1 AND p.status = $2 AND p.id <> $3 \
             ORDER BY p.created_at DESC, p.id"
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(locale)
            .bind(PostStatus::Published)
            .bind(exclude)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let mut categories = self
            .load_post_taxonomy(TaxonomyKind::Category, &ids)
            .await?;
        let mut tag_ids = self.load_post_taxonomy_ids(TaxonomyKind::Tag, &ids).await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let categories = categories.remove(&row.id).unwrap_or_default();
                let features = PostFeatures::new(
                    categories.iter().map(|category| category.id).collect(),
                    tag_ids.remove(&row.id).unwrap_or_default(),
                    row.title.clone(),
                );
                RelatedCandidate {
                    id: row.id,
                    slug: row.slug,
                    title: row.title,
                    summary: row.summary,
                    categories,
                    features,
                }
            })
            .collect())
    }

    async fn list_sitemap_entries(&self) -> Result<Vec<SitemapPostEntry>, RepoError> {
        let rows = sqlx::query_as::<_, SitemapRow>(
            "SELECT slug, locale, updated_at FROM posts \
             WHERE status = $1 ORDER BY updated_at DESC, id",
        )
        .bind(PostStatus::Published)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| SitemapPostEntry {
                slug: row.slug,
                locale: row.locale,
                updated_at: row.updated_at,
            })
            .collect())
    }
}
