use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::render::METRIC_RENDER_FALLBACK_TOTAL;
use crate::cache::{
    METRIC_FEED_CACHE_ERROR_TOTAL, METRIC_FEED_CACHE_HIT_TOTAL, METRIC_FEED_CACHE_INVALIDATE_TOTAL,
    METRIC_FEED_CACHE_MISS_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
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

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_FEED_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of feed page cache hits."
        );
        describe_counter!(
            METRIC_FEED_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of feed page cache misses, including degraded lookups."
        );
        describe_counter!(
            METRIC_FEED_CACHE_ERROR_TOTAL,
            Unit::Count,
            "Total number of feed cache operations that failed and were absorbed."
        );
        describe_counter!(
            METRIC_FEED_CACHE_INVALIDATE_TOTAL,
            Unit::Count,
            "Total number of feed cache keys invalidated."
        );
        describe_counter!(
            METRIC_RENDER_FALLBACK_TOTAL,
            Unit::Count,
            "Total number of renders that fell back to escaped text."
        );
    });
}
