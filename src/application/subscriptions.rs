use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info};

use crate::application::notifications::{MailError, Mailer};
use crate::application::repos::{IssueTokenParams, RedeemOutcome, RepoError, SubscribersRepo};
use crate::domain::entities::SubscriberRecord;
use crate::domain::subscriptions::{
    TokenRejection, check_redeemable, generate_token, is_valid_email, token_expiry,
};
use crate::presentation::email::{
    ConfirmationView, EmailRenderError, render_confirmation, unsubscribe_url,
};

#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("email is already subscribed")]
    AlreadySubscribed,
    #[error("failed to render confirmation email")]
    Render(#[from] EmailRenderError),
    #[error("failed to send confirmation email")]
    Mail(#[from] MailError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum UnsubscribeError {
    #[error("unsubscribe token is required")]
    MissingToken,
    #[error("unsubscribe token not found")]
    UnknownToken,
    #[error(transparent)]
    Rejected(#[from] TokenRejection),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Created,
    Reactivated,
}

#[derive(Clone)]
pub struct SubscriptionService {
    repo: Arc<dyn SubscribersRepo>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
    site_name: String,
    token_ttl_days: u32,
}

impl SubscriptionService {
    pub fn new(
        repo: Arc<dyn SubscribersRepo>,
        mailer: Arc<dyn Mailer>,
        base_url: impl Into<String>,
        site_name: impl Into<String>,
        token_ttl_days: u32,
    ) -> Self {
        Self {
            repo,
            mailer,
            base_url: base_url.into(),
            site_name: site_name.into(),
            token_ttl_days,
        }
    }

    /// Create or reactivate the subscriber, issue a fresh unsubscribe token
    /// and send the confirmation email. Earlier tokens are left untouched.
    ///
    /// Records written before a failed confirmation send are kept.
    pub async fn subscribe(&self, email: &str) -> Result<SubscribeOutcome, SubscribeError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(SubscribeError::InvalidEmail);
        }

        let (subscriber, outcome) = match self.repo.find_by_email(email).await? {
            Some(existing) if existing.is_active => return Err(SubscribeError::AlreadySubscribed),
            Some(existing) => (
                self.repo.set_active(existing.id, true).await?,
                SubscribeOutcome::Reactivated,
            ),
            None => (
                self.repo.create_subscriber(email).await?,
                SubscribeOutcome::Created,
            ),
        };

        let token = self.issue_token(&subscriber).await?;

        let message = render_confirmation(&ConfirmationView {
            site_name: self.site_name.clone(),
            unsubscribe_url: unsubscribe_url(&self.base_url, &token),
        })?;

        if let Err(err) = self.mailer.send(&subscriber.email, &message).await {
            error!(
                target = "lumblog::application::subscriptions",
                subscriber_id = %subscriber.id,
                error = %err,
                "failed to send subscription confirmation"
            );
            return Err(err.into());
        }

        info!(
            target = "lumblog::application::subscriptions",
            subscriber_id = %subscriber.id,
            outcome = ?outcome,
            "subscriber confirmed"
        );

        Ok(outcome)
    }

    async fn issue_token(&self, subscriber: &SubscriberRecord) -> Result<String, RepoError> {
        let issued_at = OffsetDateTime::now_utc();
        let record = self
            .repo
            .issue_token(IssueTokenParams {
                subscriber_id: subscriber.id,
                token: generate_token(),
                expires_at: token_expiry(issued_at, self.token_ttl_days),
            })
            .await?;
        Ok(record.token)
    }

    /// Redeem an unsubscribe token: the token is marked used and the
    /// subscriber deactivated together, or nothing changes.
    pub async fn unsubscribe(&self, token: Option<&str>) -> Result<(), UnsubscribeError> {
        let token = token
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(UnsubscribeError::MissingToken)?;

        let record = self
            .repo
            .find_token(token)
            .await?
            .ok_or(UnsubscribeError::UnknownToken)?;

        let now = OffsetDateTime::now_utc();
        check_redeemable(&record, now)?;

        match self.repo.redeem_token(record.id, now).await? {
            RedeemOutcome::Redeemed => {
                info!(
                    target = "lumblog::application::subscriptions",
                    subscriber_id = %record.subscriber_id,
                    "subscriber unsubscribed"
                );
                Ok(())
            }
            RedeemOutcome::AlreadyUsed => Err(TokenRejection::AlreadyUsed.into()),
        }
    }

    pub async fn active_count(&self) -> Result<u64, RepoError> {
        self.repo.count_active().await
    }
}
