use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "redline.log";

/// Installs the global subscriber writing to `dir/redline.log`. The filter
/// comes from `RUST_LOG` and falls back to `default_filter`. Returns `None`
/// when a subscriber is already installed; otherwise the guard must outlive
/// every log call.
pub fn init(dir: &Path, default_filter: &str) -> Option<WorkerGuard> {
    let log_path = dir.join(LOG_FILE_NAME);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    let filter = filter_from(std::env::var("RUST_LOG").ok(), default_filter);
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => Some(guard),
        // Someone else owns the global subscriber; dropping the guard stops the writer.
        Err(_) => None,
    }
}

fn filter_from(env: Option<String>, fallback: &str) -> EnvFilter {
    env.filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_configured_filter() {
        assert_eq!(filter_from(None, "debug").to_string(), "debug");
        assert_eq!(filter_from(Some("  ".into()), "warn").to_string(), "warn");
    }

    #[test]
    fn environment_wins_when_set() {
        let filter = filter_from(Some("redline=trace".into()), "info");
        assert_eq!(filter.to_string(), "redline=trace");
    }
}
