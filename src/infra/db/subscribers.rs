use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    IssueTokenParams, NotificationRecipient, RedeemOutcome, RepoError, SubscribersRepo,
};
use crate::domain::entities::{SubscriberRecord, SubscriptionTokenRecord};
use crate::domain::types::TokenType;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    is_active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SubscriberRow> for SubscriberRecord {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TokenRow {
    id: Uuid,
    token: String,
    subscriber_id: Uuid,
    token_type: TokenType,
    expires_at: OffsetDateTime,
    used_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<TokenRow> for SubscriptionTokenRecord {
    fn from(row: TokenRow) -> Self {
        Self {
            id: row.id,
            token: row.token,
            subscriber_id: row.subscriber_id,
            token_type: row.token_type,
            expires_at: row.expires_at,
            used_at: row.used_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecipientRow {
    subscriber_id: Uuid,
    email: String,
    unsubscribe_token: Option<String>,
}

#[async_trait]
impl SubscribersRepo for PostgresRepositories {
    async fn find_by_email(&self, email: &str) -> Result<Option<SubscriberRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, is_active, created_at, updated_at FROM subscribers WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubscriberRecord::from))
    }

    async fn create_subscriber(&self, email: &str) -> Result<SubscriberRecord, RepoError> {
        let now = OffsetDateTime::now_utc();
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            INSERT INTO subscribers (id, email, is_active, created_at, updated_at)
            VALUES ($1, $2, TRUE, $3, $3)
            RETURNING id, email, is_active, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<SubscriberRecord, RepoError> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            r#"
            UPDATE subscribers
            SET is_active = $2, updated_at = $3
            WHERE id = $1
            RETURNING id, email, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(active)
        .bind(OffsetDateTime::now_utc())
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        row.map(SubscriberRecord::from).ok_or(RepoError::NotFound)
    }

    async fn issue_token(
        &self,
        params: IssueTokenParams,
    ) -> Result<SubscriptionTokenRecord, RepoError> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            INSERT INTO subscription_tokens
                (id, token, subscriber_id, token_type, expires_at, used_at, created_at)
            VALUES ($1, $2, $3, $4, $5, NULL, $6)
            RETURNING id, token, subscriber_id, token_type, expires_at, used_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(params.token)
        .bind(params.subscriber_id)
        .bind(TokenType::Unsubscribe)
        .bind(params.expires_at)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_token(
        &self,
        token: &str,
    ) -> Result<Option<SubscriptionTokenRecord>, RepoError> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT id, token, subscriber_id, token_type, expires_at, used_at, created_at
            FROM subscription_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubscriptionTokenRecord::from))
    }

    async fn redeem_token(
        &self,
        token_id: Uuid,
        now: OffsetDateTime,
    ) -> Result<RedeemOutcome, RepoError> {
        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        // Row lock serializes concurrent redemptions of the same token.
        let locked: Option<(Uuid, Option<OffsetDateTime>)> = sqlx::query_as(
            "SELECT subscriber_id, used_at FROM subscription_tokens WHERE id = $1 FOR UPDATE",
        )
        .bind(token_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let (subscriber_id, used_at) = locked.ok_or(RepoError::NotFound)?;
        if used_at.is_some() {
            tx.rollback().await.map_err(map_sqlx_error)?;
            return Ok(RedeemOutcome::AlreadyUsed);
        }

        sqlx::query("UPDATE subscription_tokens SET used_at = $2 WHERE id = $1")
            .bind(token_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query("UPDATE subscribers SET is_active = FALSE, updated_at = $2 WHERE id = $1")
            .bind(subscriber_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(RedeemOutcome::Redeemed)
    }

    async fn list_notification_recipients(
        &self,
        now: OffsetDateTime,
    ) -> Result<Vec<NotificationRecipient>, RepoError> {
        let rows = sqlx::query_as::<_, RecipientRow>(
            r#"
            SELECT s.id AS subscriber_id, s.email, t.token AS unsubscribe_token
            FROM subscribers s
            LEFT JOIN LATERAL (
                SELECT token
                FROM subscription_tokens
                WHERE subscriber_id = s.id
                  AND token_type = $1
                  AND expires_at > $2
                  AND used_at IS NULL
                ORDER BY created_at DESC
                LIMIT 1
            ) t ON TRUE
            WHERE s.is_active
            ORDER BY s.created_at, s.id
            "#,
        )
        .bind(TokenType::Unsubscribe)
        .bind(now)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| NotificationRecipient {
                subscriber_id: row.subscriber_id,
                email: row.email,
                unsubscribe_token: row.unsubscribe_token,
            })
            .collect())
    }

    async fn count_active(&self) -> Result<u64, RepoError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscribers WHERE is_active")
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }
}
