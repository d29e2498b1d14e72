//! Subscriber fan-out when a post goes live.
//!
//! Every active subscriber holding a usable unsubscribe token gets one
//! delivery attempt. Sends run concurrently and a failed send never affects
//! the others; there is no retry and no resumption after a crash.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::application::repos::{NotificationRecipient, RepoError, SubscribersRepo};
use crate::domain::entities::PostRecord;
use crate::domain::types::Locale;
use crate::presentation::email::{
    EmailMessage, NewArticleView, SUMMARY_FALLBACK, post_url, render_new_article, unsubscribe_url,
};

pub const METRIC_SENT: &str = "lumblog_notifications_sent_total";
pub const METRIC_FAILED: &str = "lumblog_notifications_failed_total";
pub const METRIC_SKIPPED: &str = "lumblog_notifications_skipped_total";
pub const METRIC_DISPATCH_MS: &str = "lumblog_notifications_dispatch_ms";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email provider responded with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("email transport failed: {0}")]
    Transport(String),
}

/// Outbound email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), MailError>;
}

/// The fields of a post that a notification needs.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedPost {
    pub id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub slug: String,
    pub locale: Locale,
}

impl From<&PostRecord> for PublishedPost {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            summary: post.summary.clone(),
            slug: post.slug.clone(),
            locale: post.locale,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("failed to load notification recipients")]
    Recipients(#[from] RepoError),
}

/// Capability handed to the post editor so publishing can announce itself.
#[async_trait]
pub trait PublishNotifier: Send + Sync {
    async fn notify_new_post(
        &self,
        post: &PublishedPost,
    ) -> Result<DispatchReport, NotificationError>;
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    subscribers: Arc<dyn SubscribersRepo>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
    site_name: String,
}

enum SendOutcome {
    Delivered,
    Failed,
}

impl NotificationDispatcher {
    pub fn new(
        subscribers: Arc<dyn SubscribersRepo>,
        mailer: Arc<dyn Mailer>,
        base_url: impl Into<String>,
        site_name: impl Into<String>,
    ) -> Self {
        Self {
            subscribers,
            mailer,
            base_url: base_url.into(),
            site_name: site_name.into(),
        }
    }

    async fn deliver(
        &self,
        post: &PublishedPost,
        post_link: &str,
        email: &str,
        token: &str,
    ) -> SendOutcome {
        let view = NewArticleView {
            site_name: self.site_name.clone(),
            title: post.title.clone(),
            summary: post
                .summary
                .clone()
                .filter(|summary| !summary.trim().is_empty())
                .unwrap_or_else(|| SUMMARY_FALLBACK.to_string()),
            post_url: post_link.to_string(),
            unsubscribe_url: unsubscribe_url(&self.base_url, token),
        };

        let message = match render_new_article(&view) {
            Ok(message) => message,
            Err(err) => {
                error!(
                    target = "lumblog::application::notifications",
                    post_id = %post.id,
                    subscriber = %email,
                    error = %err,
                    "failed to render notification"
                );
                return SendOutcome::Failed;
            }
        };

        match self.mailer.send(email, &message).await {
            Ok(()) => {
                info!(
                    target = "lumblog::application::notifications",
                    post_id = %post.id,
                    subscriber = %email,
                    "notification sent"
                );
                SendOutcome::Delivered
            }
            Err(err) => {
                error!(
                    target = "lumblog::application::notifications",
                    post_id = %post.id,
                    subscriber = %email,
                    error = %err,
                    "failed to send notification"
                );
                SendOutcome::Failed
            }
        }
    }
}

#[async_trait]
impl PublishNotifier for NotificationDispatcher {
    async fn notify_new_post(
        &self,
        post: &PublishedPost,
    ) -> Result<DispatchReport, NotificationError> {
        let recipients = self
            .subscribers
            .list_notification_recipients(OffsetDateTime::now_utc())
            .await?;

        if recipients.is_empty() {
            info!(
                target = "lumblog::application::notifications",
                post_id = %post.id,
                "no active subscribers to notify"
            );
            return Ok(DispatchReport::default());
        }

        let started_at = Instant::now();
        let post_link = post_url(&self.base_url, post.locale.as_str(), &post.slug);
        let mut report = DispatchReport::default();
        let mut sends = Vec::with_capacity(recipients.len());

        for NotificationRecipient {
            subscriber_id,
            email,
            unsubscribe_token,
        } in &recipients
        {
            match unsubscribe_token {
                Some(token) => sends.push(self.deliver(post, &post_link, email, token)),
                None => {
                    warn!(
                        target = "lumblog::application::notifications",
                        subscriber_id = %subscriber_id,
                        subscriber = %email,
                        "no valid unsubscribe token for subscriber"
                    );
                    report.skipped += 1;
                }
            }
        }

        report.attempted = sends.len();
        for outcome in join_all(sends).await {
            match outcome {
                SendOutcome::Delivered => report.delivered += 1,
                SendOutcome::Failed => report.failed += 1,
            }
        }

        counter!(METRIC_SENT).increment(report.delivered as u64);
        counter!(METRIC_FAILED).increment(report.failed as u64);
        counter!(METRIC_SKIPPED).increment(report.skipped as u64);
        histogram!(METRIC_DISPATCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        info!(
            target = "lumblog::application::notifications",
            post_id = %post.id,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            skipped = report.skipped,
            "notification dispatch finished"
        );

        Ok(report)
    }
}
