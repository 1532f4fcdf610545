use std::path::Path;

use tracing::Subscriber;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
};

const LOG_FILE_PREFIX: &str = "quote-builder-backend";
const DEFAULT_CONSOLE_FILTER: &str = "info,quote_builder_backend=debug";

/// Owns the non-blocking writer guards; drop it only at process exit.
pub struct Logger {
    pub guards: Vec<WorkerGuard>,
}

impl Logger {
    /// Console plus daily-rolled text, JSON and error-only files under `LOG_DIR` (default `logs`).
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());
        let guards = Self::setup_logging(Path::new(&log_dir))?;
        Ok(Logger { guards })
    }

    pub fn setup_logging(log_dir: &Path) -> Result<Vec<WorkerGuard>, Box<dyn std::error::Error>> {
        let error_dir = log_dir.join("error");
        let json_dir = log_dir.join("json");
        std::fs::create_dir_all(&error_dir)?;
        std::fs::create_dir_all(&json_dir)?;

        let console_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_CONSOLE_FILTER));
        let file_level = std::env::var("FILE_LOG_LEVEL").unwrap_or_else(|_| "debug".to_string());
        let error_level = std::env::var("ERROR_FILE_LOG_LEVEL").unwrap_or_else(|_| "error".to_string());

        let (general_writer, general_guard) =
            non_blocking(rolling::daily(log_dir, format!("{LOG_FILE_PREFIX}.log")));
        let (json_writer, json_guard) =
            non_blocking(rolling::daily(&json_dir, format!("{LOG_FILE_PREFIX}.json")));
        let (error_writer, error_guard) =
            non_blocking(rolling::daily(&error_dir, format!("{LOG_FILE_PREFIX}-error.log")));

        let console = fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(true)
            .with_ansi(true)
            .with_filter(console_filter);

        tracing_subscriber::registry()
            .with(console)
            .with(file_layer(general_writer, &file_level, false))
            .with(file_layer(json_writer, &file_level, true))
            .with(file_layer(error_writer, &error_level, false))
            .try_init()?;

        Ok(vec![general_guard, json_guard, error_guard])
    }
}

/// Plain or JSON file sink with source locations, filtered by `level`.
fn file_layer<S>(writer: non_blocking::NonBlocking, level: &str, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    if json {
        layer.json().with_filter(EnvFilter::new(level)).boxed()
    } else {
        layer.with_filter(EnvFilter::new(level)).boxed()
    }
}
