use std::sync::Arc;
use std::time::Duration;

use crate::application::admin::posts::AdminPostService;
use crate::application::admin::taxonomy::AdminTaxonomyService;
use crate::application::auth::{AdminGate, AdminPrincipal};
use crate::application::content::ContentService;
use crate::application::subscriptions::SubscriptionService;

#[derive(Clone)]
pub struct ApiState {
    pub content: Arc<ContentService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub posts: Arc<AdminPostService>,
    pub taxonomy: Arc<AdminTaxonomyService>,
    pub gate: Arc<AdminGate>,
    pub session_max_age: Duration,
}

impl ApiState {
    pub fn actor_label(principal: AdminPrincipal) -> &'static str {
        principal.actor()
    }
}
