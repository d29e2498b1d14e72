use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::application::repos::{ActivityRepo, RepoError};
use crate::domain::entities::ActivityLogRecord;
use crate::domain::types::ActivityStatus;

/// Thin wrapper around the activity repository to simplify logging admin actions.
#[derive(Clone)]
pub struct AdminActivityService {
    repo: Arc<dyn ActivityRepo>,
}

impl AdminActivityService {
    pub fn new(repo: Arc<dyn ActivityRepo>) -> Self {
        Self { repo }
    }

    pub async fn record<S>(
        &self,
        actor: &str,
        action: &str,
        resource: Option<&str>,
        status: ActivityStatus,
        payload: Option<&S>,
    ) -> Result<(), RepoError>
    where
        S: Serialize,
    {
        let payload = match payload {
            Some(value) => Some(serde_json::to_string(value).map_err(RepoError::from_persistence)?),
            None => None,
        };

        let record = ActivityLogRecord {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action: action.to_string(),
            resource: resource.map(str::to_string),
            status,
            payload,
            created_at: OffsetDateTime::now_utc(),
        };

        self.repo.append_log(record).await
    }

    /// Record a successful mutation. The write it describes has already
    /// committed, so a logging failure is reported and otherwise ignored.
    pub async fn record_success<S>(
        &self,
        actor: &str,
        action: &str,
        resource: Option<&str>,
        payload: Option<&S>,
    ) where
        S: Serialize,
    {
        if let Err(err) = self
            .record(actor, action, resource, ActivityStatus::Success, payload)
            .await
        {
            warn!(
                target = "lumblog::application::admin::activity",
                action,
                error = %err,
                "failed to append activity log"
            );
        }
    }
}
