//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the configured filter directive.
pub const LOG_ENV: &str = "GOVBRIDGE_LOG";

/// Filter from `GOVBRIDGE_LOG` if set, else `default_directive`.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global fmt subscriber. Returns false when one is already
/// installed, so repeated calls are harmless.
pub fn init_tracing(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_noop() {
        init_tracing("debug");
        assert!(!init_tracing("debug"));
    }

    #[test]
    fn test_configured_directive_used_without_env() {
        if std::env::var(LOG_ENV).is_err() {
            assert_eq!(env_filter("govbridge=debug").to_string(), "govbridge=debug");
        }
    }
}
