//! Logging system demonstration
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # With custom filter
//! cargo run --example logging_demo -- compact "core_runtime=trace"
//! ```

use core_runtime::logging::{init_logging, LogFormat, LogLevel, LogOutput, LoggingConfig};
use std::env;
use tracing::{debug, info, instrument, span, warn, Level};

fn main() {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_target(true)
        .with_output(LogOutput::Stderr);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    if let Err(e) = init_logging(config) {
        eprintln!("Failed to initialize logging: {}", e);
        return;
    }

    info!(format = ?format, "Logging initialized");

    let span = span!(Level::INFO, "workflow", workflow = 42);
    let _enter = span.enter();
    for operation in ["tag", "publish-configure", "cleanup"] {
        run_operation("event-1", operation);
    }
    warn!(element = "t1", "Unable to delete element file, keeping it");
}

#[instrument]
fn run_operation(media_package: &str, operation: &str) {
    debug!("Starting operation");
    info!(action = "CONTINUE", "Operation finished");
}
