//! Logging and tracing utilities

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log output format (`json` or `text`)
pub const LOG_FORMAT_ENV: &str = "RESEARCH_LOG_FORMAT";

/// Initialize tracing subscriber with default configuration
pub fn init_tracing() {
    init_tracing_with_filter("info");
}

/// Initialize tracing with a fallback filter used when `RUST_LOG` is unset
///
/// Setting `RESEARCH_LOG_FORMAT=json` switches the output to one JSON object
/// per event, which is what log collectors in front of the web server expect.
pub fn init_tracing_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
