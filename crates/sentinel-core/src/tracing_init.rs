//! Tracing/logging initialization for the Sentinel binaries.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the env-filter: `RUST_LOG` when set, else `default_filter`.
pub fn env_filter(rust_log: Option<&str>, default_filter: &str) -> EnvFilter {
    EnvFilter::new(rust_log.unwrap_or(default_filter))
}

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- default `RUST_LOG` value when the env-var is not set
///   (e.g. `"sentinel_server=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = env_filter(rust_log.as_deref(), default_filter);
    let registry = tracing_subscriber::registry().with(filter);
    if log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_log_wins_over_default() {
        let filter = env_filter(Some("warn"), "sentinel_server=info");
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn default_used_without_rust_log() {
        let filter = env_filter(None, "sentinel_server=info");
        assert_eq!(filter.to_string(), "sentinel_server=info");
    }
}
