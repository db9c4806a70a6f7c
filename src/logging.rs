use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes logging for a loader run: human-readable console output plus
/// a daily-rolling JSON file under `logs/` for post-run inspection.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "loader.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::from_default_env().add_directive("ad_loader=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().compact().with_writer(std::io::stdout))
        .init();

    // The guard flushes buffered log lines on drop; the process is one-shot,
    // so keep it alive for the whole run.
    std::mem::forget(guard);
}
