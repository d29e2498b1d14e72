use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::notifications;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(InfraError::from)
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            notifications::METRIC_SENT,
            Unit::Count,
            "Total number of new-article emails delivered to the mail provider."
        );
        describe_counter!(
            notifications::METRIC_FAILED,
            Unit::Count,
            "Total number of new-article emails the mail provider rejected or never received."
        );
        describe_counter!(
            notifications::METRIC_SKIPPED,
            Unit::Count,
            "Total number of active subscribers skipped for lack of a usable unsubscribe token."
        );
        describe_histogram!(
            notifications::METRIC_DISPATCH_MS,
            Unit::Milliseconds,
            "Publish notification dispatch latency in milliseconds."
        );
    });
}
