//! Process-wide settings and logging setup.

use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::{error::TabError, tournaments::config::TournamentConfig};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "TABMAKER_CONFIG";

static SETTINGS: OnceCell<Settings> = OnceCell::new();

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Used for tournaments created without an explicit configuration.
    pub tournament: TournamentConfig,
    /// How long a mutation waits for a tournament that is busy before giving
    /// up with [`TabError::ConcurrentModification`].
    pub lock_timeout_ms: u64,
    /// Filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tournament: TournamentConfig::default(),
            lock_timeout_ms: 2000,
            log_filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn from_toml(s: &str) -> Result<Self, TabError> {
        toml::from_str(s).map_err(|e| TabError::Config(e.to_string()))
    }

    /// Reads the file named by `TABMAKER_CONFIG`, falling back to the
    /// defaults when the variable is unset.
    pub fn from_env() -> Result<Self, TabError> {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Ok(Settings::default());
        };
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| TabError::Config(format!("{path}: {e}")))?;
        Self::from_toml(&contents)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

/// Loads the settings on first use. Later calls return the same value.
pub fn settings() -> Result<&'static Settings, TabError> {
    SETTINGS.get_or_try_init(Settings::from_env)
}

/// Installs the global `tracing` subscriber. `RUST_LOG` takes precedence
/// over the configured filter.
pub fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));

    #[allow(unexpected_cfgs)]
    let filter = if cfg!(fuzzing) {
        EnvFilter::new("off")
    } else {
        filter
    };

    // a subscriber may already be installed (e.g. by another test)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
