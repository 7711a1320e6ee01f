use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Verdant";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the backup root for every build.
pub const BACKUP_DIR_ENV: &str = "VERDANT_BACKUP_DIR";

/// Overrides `display_threshold` after the config file is applied.
pub const DISPLAY_THRESHOLD_ENV: &str = "VERDANT_DISPLAY_THRESHOLD";

/// Get the application data directory
/// ~/Verdant/ on all platforms; current directory when no home is known.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the backup artifacts directory
pub fn backups_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(BACKUP_DIR_ENV) {
        return PathBuf::from(dir);
    }
    app_data_dir().join("backups")
}

/// Debug builds (including tests) count as development.
pub fn is_dev() -> bool {
    cfg!(debug_assertions)
}

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if is_dev() {
        "verdant=debug,verdant_lib=debug"
    } else {
        "verdant=info,verdant_lib=info"
    }
}

// ═══════════════════════════════════════════════════════════
// AnalysisConfig
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Tunables for one analyzer instance.
///
/// `display_threshold` is the single recognized presentation option: it only
/// decides whether an outcome is flagged as low confidence. Verdicts and
/// recommendations are computed identically on either side of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Confidence below this is reported as "low confidence".
    pub display_threshold: f32,
    /// Longest edge of a normalized image, in pixels.
    pub max_dimension: u32,
    /// Root directory for backup artifacts.
    pub backup_dir: PathBuf,
    /// Upper bound on one artifact write before it counts as failed.
    pub backup_timeout_secs: u64,
    /// Consecutive backup failures before status becomes `failed`.
    pub backup_failed_after: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            display_threshold: 0.5,
            max_dimension: 512,
            backup_dir: backups_dir(),
            backup_timeout_secs: 10,
            backup_failed_after: 3,
        }
    }
}

impl AnalysisConfig {
    /// Load from an optional JSON file, then apply environment overrides.
    /// Missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)?;
                serde_json::from_str::<AnalysisConfig>(&raw)?
            }
            None => AnalysisConfig::default(),
        };

        if let Ok(raw) = std::env::var(DISPLAY_THRESHOLD_ENV) {
            config.display_threshold =
                raw.trim().parse::<f32>().map_err(|e| ConfigError::Invalid {
                    field: "display_threshold",
                    reason: format!("{raw:?}: {e}"),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.display_threshold) {
            return Err(ConfigError::Invalid {
                field: "display_threshold",
                reason: format!("{} is outside [0, 1]", self.display_threshold),
            });
        }
        if self.max_dimension < 16 {
            return Err(ConfigError::Invalid {
                field: "max_dimension",
                reason: format!("{} is below the 16px minimum", self.max_dimension),
            });
        }
        if self.backup_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "backup_timeout_secs",
                reason: "must be at least 1 second".into(),
            });
        }
        if self.backup_failed_after < 2 {
            return Err(ConfigError::Invalid {
                field: "backup_failed_after",
                reason: "must be at least 2 so `degraded` is reachable".into(),
            });
        }
        Ok(())
    }

    pub fn backup_timeout(&self) -> Duration {
        Duration::from_secs(self.backup_timeout_secs)
    }
}
