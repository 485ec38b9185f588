//! Log subscriber setup.
//!
//! Everything in the crate logs through `tracing`; this module installs the
//! subscriber that decides where those records go.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "sitepipe=info,tower_http=info";

/// Builds the filter from `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
#[must_use]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Installs the global subscriber.
///
/// With `json` set, records are written as one JSON object per line.
/// Returns false if a subscriber was already installed.
pub fn init_tracing(json: bool) -> bool {
    let registry = tracing_subscriber::registry().with(env_filter());
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    };
    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_refused() {
        let _ = init_tracing(false);
        assert!(!init_tracing(true));
    }

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
    }
}
