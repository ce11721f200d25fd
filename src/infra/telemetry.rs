use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

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
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "discuss_cache_hit_total",
            Unit::Count,
            "Total number of discussion cache hits, by namespace."
        );
        describe_counter!(
            "discuss_cache_miss_total",
            Unit::Count,
            "Total number of discussion cache misses, by namespace."
        );
        describe_counter!(
            "discuss_cache_evict_total",
            Unit::Count,
            "Total number of discussion cache evictions due to capacity or expiry."
        );
        describe_counter!(
            "discuss_cache_remove_total",
            Unit::Count,
            "Total number of explicit discussion cache removals."
        );
        describe_counter!(
            "discuss_index_submitted_total",
            Unit::Count,
            "Total number of index requests accepted by the pipeline."
        );
        describe_counter!(
            "discuss_index_dropped_total",
            Unit::Count,
            "Total number of index requests dropped due to a full or closed queue."
        );
        describe_counter!(
            "discuss_index_failed_total",
            Unit::Count,
            "Total number of failed search engine calls."
        );
        describe_gauge!(
            "discuss_index_pending_unindex",
            Unit::Count,
            "Ids accepted for bulk unindexing but not yet sent to the search engine."
        );
        describe_histogram!(
            "discuss_index_call_ms",
            Unit::Milliseconds,
            "Search engine call latency in milliseconds."
        );
    });
}
