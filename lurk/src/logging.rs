use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_appender::non_blocking;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    Layer,
    fmt::{
        self, MakeWriter,
        format::{Format, Json, JsonFields},
    },
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, ServerConfig};

/// Install the global subscriber writing to stdout through a background thread.
///
/// Records still buffered are flushed when the returned guard is dropped.
pub fn init_logging(config: &ServerConfig) -> WorkerGuard {
    let (nb, guard) = non_blocking(std::io::stdout());

    let layer = match config.log_format {
        LogFormat::Json => json_layer(nb).boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(nb).with_target(false).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_writer(nb).with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(LevelFilter::from(config.log_level)))
        .init();

    guard
}

/// One JSON object per record with the event fields at the top level.
pub fn json_layer<S, W>(writer: W) -> fmt::Layer<S, JsonFields, Format<Json>, W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_span_list(false)
        .with_target(false)
        .with_writer(writer)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod logging_tests;
