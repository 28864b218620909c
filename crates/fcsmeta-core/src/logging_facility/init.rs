//! Global subscriber setup

use serde::Deserialize;
use std::sync::Once;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output style for the global subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Readable lines on stderr, debug and above for fcsmeta crates
    Development,
    /// One JSON object per event on stderr, info and above
    Production,
    /// Bare registry with no output; pair with `init_test_capture()`
    Test,
}

impl Profile {
    fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "fcsmeta=debug",
            Profile::Production | Profile::Test => "fcsmeta=info",
        }
    }

    /// `RUST_LOG` when set, else the profile's own directive.
    fn env_filter(self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.default_directive()))
    }
}

static INSTALLED: Once = Once::new();

/// Install the global subscriber for `profile`.
///
/// Only the first call in a process has an effect. If another subscriber
/// was already installed elsewhere the existing one is kept.
pub fn init(profile: Profile) {
    INSTALLED.call_once(|| {
        let outcome = match profile {
            Profile::Development => tracing_subscriber::fmt()
                .with_env_filter(profile.env_filter())
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| e.to_string()),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(profile.env_filter())
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| e.to_string()),
            Profile::Test => tracing_subscriber::registry()
                .try_init()
                .map_err(|e| e.to_string()),
        };
        if let Err(reason) = outcome {
            tracing::debug!(%reason, "global subscriber already present");
        }
    });
}
