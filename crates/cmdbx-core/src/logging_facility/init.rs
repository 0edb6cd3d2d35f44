//! Logging initialization

use serde::Deserialize;
use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Logging profile, selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Human-readable output, debug level
    #[default]
    Development,
    /// JSON output, info level
    Production,
    /// No output; tests install `init_test_capture` instead
    Test,
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// Only the first call has any effect, and it yields to a subscriber that
/// is already installed (such as the test capture layer). `RUST_LOG`
/// overrides the default filter of the Development and Production profiles.
///
/// ```
/// use cmdbx_core::logging_facility::{init, Profile};
///
/// init(Profile::Test);
/// ```
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| match profile {
        Profile::Development => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("cmdbx=debug")),
                )
                .with_writer(std::io::stderr)
                .try_init();
        }
        Profile::Production => {
            let _ = tracing_subscriber::fmt()
                .json()
                .with_env_filter(
                    EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| EnvFilter::new("cmdbx=info")),
                )
                .with_writer(std::io::stderr)
                .try_init();
        }
        Profile::Test => {
            let _ = tracing_subscriber::registry().try_init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
    }

    #[test]
    fn test_profile_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            profile: Profile,
        }
        let w: Wrapper = toml::from_str("profile = \"production\"").unwrap();
        assert_eq!(w.profile, Profile::Production);
    }
}
