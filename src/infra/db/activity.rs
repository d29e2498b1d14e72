use async_trait::async_trait;

use crate::{
    application::repos::{ActivityRepo, RepoError},
    domain::entities::ActivityLogRecord,
};

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl ActivityRepo for PostgresRepositories {
    async fn append_log(&self, record: ActivityLogRecord) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (id, actor, action, resource, status, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.actor)
        .bind(record.action)
        .bind(record.resource)
        .bind(record.status)
        .bind(record.payload)
        .bind(record.created_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }
}
