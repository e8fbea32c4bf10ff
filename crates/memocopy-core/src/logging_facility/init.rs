//! One-shot subscriber installation

use std::sync::OnceLock;

use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Output shape of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable lines, `memocopy=debug`
    Development,
    /// One JSON object per event, `memocopy=info`
    Production,
    /// No output; tests record events with the capture layer instead
    Test,
}

impl Profile {
    fn default_directive(self) -> &'static str {
        match self {
            Profile::Development => "memocopy=debug",
            Profile::Production => "memocopy=info",
            Profile::Test => "off",
        }
    }
}

static INSTALLED: OnceLock<Profile> = OnceLock::new();

/// Install the global subscriber for `profile`
///
/// Only the first call has an effect. If the process already has a
/// global subscriber, that one is left in place. `RUST_LOG` overrides the
/// profile's default filter.
pub fn init(profile: Profile) {
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_directive()));
        let outcome = match profile {
            Profile::Development => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init().map_err(Into::into),
        };
        if let Err(err) = outcome {
            tracing::debug!(?profile, error = %err, "keeping the existing global subscriber");
        }
        profile
    });
}

/// The profile the first [`init`] call asked for, if any
pub fn installed_profile() -> Option<Profile> {
    INSTALLED.get().copied()
}
