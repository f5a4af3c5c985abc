//! # Structured Logging
//!
//! tracing-subscriber initialization. Filtering follows `RUST_LOG`;
//! `DEPLOY_LOG_FORMAT=json` switches to JSON output for log shippers.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber. Safe to call more than
/// once; later calls are no-ops, as is running inside a host process
/// that already installed a subscriber.
pub fn init_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let json = std::env::var("DEPLOY_LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true);
        let result = if json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if result.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    });
}
