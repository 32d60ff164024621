use std::{io::IsTerminal, str::FromStr};

use depth_gate_config::log::{LogFormat, LoggingConfig};
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::from_str(config.env_filter_str())
        .unwrap_or_else(|e| panic!("failed to initialize env-filter logger: {}", e));
    let is_terminal = std::io::stderr().is_terminal();
    let timer = UtcTime::rfc_3339();
    let registry = tracing_subscriber::registry();

    match config.format {
        LogFormat::PrettyTree => registry
            .with(
                tracing_tree::HierarchicalLayer::new(2)
                    .with_ansi(is_terminal)
                    .with_bracketed_fields(true)
                    .with_deferred_spans(false)
                    .with_wraparound(25)
                    .with_indent_lines(true)
                    .with_timer(tracing_tree::time::Uptime::default())
                    .with_thread_names(false)
                    .with_thread_ids(false)
                    .with_targets(false),
            )
            .with(filter)
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_timer(timer),
            )
            .with(filter)
            .init(),
        LogFormat::PrettyCompact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_ansi(is_terminal)
                    .with_timer(timer),
            )
            .with(filter)
            .init(),
    };
}
