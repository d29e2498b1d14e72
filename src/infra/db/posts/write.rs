use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{CreatePostParams, PostsWriteRepo, RepoError, UpdatePostParams};
use crate::domain::entities::PostRecord;
use crate::domain::types::TaxonomyKind;
use crate::infra::db::map_sqlx_error;
use crate::infra::db::taxonomy::TaxonomyTables;

use super::PostgresRepositories;
use super::types::PostRow;

const RETURNING_POST: &str =
    "RETURNING id, slug, locale, title, summary, content, status, created_at, updated_at";

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let CreatePostParams {
            slug,
            locale,
            title,
            summary,
            content,
            status,
        } = params;

        let now = OffsetDateTime::now_utc();
        let sql = format!(
            "INSERT INTO posts (id, slug, locale, title, summary, content, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8) {RETURNING_POST}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(slug)
            .bind(locale)
            .bind(title)
            .bind(summary)
            .bind(content)
            .bind(status)
            .bind(now)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(PostRecord::from(row))
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let UpdatePostParams {
            id,
            title,
            summary,
            content,
            status,
        } = params;

        let now = OffsetDateTime::now_utc();
        let sql = format!(
            "UPDATE posts SET \
             title = COALESCE($2, title), \
             summary = $3, \
             content = COALESCE($4, content), \
             status = COALESCE($5, status), \
             updated_at = $6 \
             WHERE id = $1 {RETURNING_POST}"
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(summary)
            .bind(content)
            .bind(status)
            .bind(now)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        row.map(PostRecord::from).ok_or(RepoError::NotFound)
    }

    async fn replace_post_taxonomy(
        &self,
        kind: TaxonomyKind,
        post_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), RepoError> {
        let tables = TaxonomyTables::of(kind);
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        sqlx::query(&format!(
            "DELETE FROM {links} WHERE post_id = $1",
            links = tables.links
        ))
        .bind(post_id)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        if !ids.is_empty() {
            sqlx::query(&format!(
                "INSERT INTO {links} (post_id, {fk}) \
                 SELECT $1, unnest($2::uuid[]) ON CONFLICT DO NOTHING",
                links = tables.links,
                fk = tables.foreign_key,
            ))
            .bind(post_id)
            .bind(ids)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn delete_post(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        for kind in [TaxonomyKind::Category, TaxonomyKind::Tag] {
            let links = TaxonomyTables::of(kind).links;
            sqlx::query(&format!("DELETE FROM {links} WHERE post_id = $1"))
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}
