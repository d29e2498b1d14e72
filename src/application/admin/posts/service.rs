use std::sync::Arc;

use tracing::{error, info};

use crate::application::admin::activity::AdminActivityService;
use crate::application::notifications::{PublishNotifier, PublishedPost};
use crate::application::repos::{PostsRepo, PostsWriteRepo, TaxonomyRepo};
use crate::domain::entities::PostRecord;

#[derive(Clone)]
pub struct AdminPostService {
    pub(crate) reader: Arc<dyn PostsRepo>,
    pub(crate) writer: Arc<dyn PostsWriteRepo>,
    pub(crate) taxonomy: Arc<dyn TaxonomyRepo>,
    pub(crate) activity: AdminActivityService,
    pub(crate) notifier: Option<Arc<dyn PublishNotifier>>,
}

impl AdminPostService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        taxonomy: Arc<dyn TaxonomyRepo>,
        activity: AdminActivityService,
        notifier: Option<Arc<dyn PublishNotifier>>,
    ) -> Self {
        Self {
            reader,
            writer,
            taxonomy,
            activity,
            notifier,
        }
    }

    /// Tell subscribers about a freshly published post. Runs after the write
    /// has committed; any failure is logged and never reaches the caller.
    pub(crate) async fn announce(&self, post: &PostRecord) {
        let Some(notifier) = &self.notifier else {
            return;
        };

        match notifier.notify_new_post(&PublishedPost::from(post)).await {
            Ok(report) => info!(
                target = "lumblog::application::admin::posts",
                post_id = %post.id,
                delivered = report.delivered,
                failed = report.failed,
                skipped = report.skipped,
                "subscribers notified of new post"
            ),
            Err(err) => error!(
                target = "lumblog::application::admin::posts",
                post_id = %post.id,
                error = %err,
                "failed to send notifications"
            ),
        }
    }
}
