use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
    pub simulation: SimulationConfig,
}

/// Tuning of the playback reconciliation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Position disagreement (seconds) above which a remote update seeks the player
    pub drift_tolerance_secs: f64,
    /// How long player notifications are attributed to a remote command
    pub suppression_window_ms: u64,
    /// Delay before a local pause is broadcast
    pub pause_debounce_ms: u64,
    /// Host resync broadcasts the host's actual play/pause state instead of forcing PLAY
    pub host_resync_mirrors_state: bool,
    /// Maximum chat messages kept per session
    pub chat_history_limit: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drift_tolerance_secs: 1.0,
            suppression_window_ms: 500,
            pause_debounce_ms: 250,
            host_resync_mirrors_state: true,
            chat_history_limit: 200,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }

    #[must_use]
    pub const fn pause_debounce(&self) -> Duration {
        Duration::from_millis(self.pause_debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

/// Scripted watch party run by the `watchsync` binary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub room_id: Option<String>,
    pub host_name: String,
    pub guests: usize,
    pub duration_secs: u64,
    pub tick_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            room_id: None,
            host_name: "host".to_string(),
            guests: 2,
            duration_secs: 20,
            tick_ms: 100,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // WATCHSYNC_SYNC__PAUSE_DEBOUNCE_MS, WATCHSYNC_LOGGING__LEVEL, ...
        builder = builder.add_source(
            Environment::with_prefix("WATCHSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load from file path
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        Self::load(Some(path))
    }

    /// Check every setting, returning all problems at once
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !self.sync.drift_tolerance_secs.is_finite() || self.sync.drift_tolerance_secs < 0.0 {
            errors.push(format!(
                "sync.drift_tolerance_secs must be a non-negative number, got {}",
                self.sync.drift_tolerance_secs
            ));
        }
        if self.sync.suppression_window_ms == 0 {
            errors.push("sync.suppression_window_ms must be greater than 0".to_string());
        }
        if self.sync.chat_history_limit == 0 {
            errors.push("sync.chat_history_limit must be greater than 0".to_string());
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            ));
        }
        if self.simulation.tick_ms == 0 {
            errors.push("simulation.tick_ms must be greater than 0".to_string());
        }
        if self.simulation.host_name.trim().is_empty() {
            errors.push("simulation.host_name must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!((config.sync.drift_tolerance_secs - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.sync.suppression_window(), Duration::from_millis(500));
        assert_eq!(config.sync.pause_debounce(), Duration::from_millis(250));
        assert!(config.sync.host_resync_mirrors_state);
        assert_eq!(config.logging.format, "pretty");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[sync]\npause_debounce_ms = 400\nhost_resync_mirrors_state = false\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.sync.pause_debounce_ms, 400);
        assert!(!config.sync.host_resync_mirrors_state);
        // Untouched keys keep their defaults
        assert_eq!(config.sync.suppression_window_ms, 500);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = Config::from_file("/definitely/not/here/watchsync.toml").unwrap();
        assert_eq!(config.sync.pause_debounce_ms, 250);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = Config::default();
        config.sync.drift_tolerance_secs = -1.0;
        config.sync.suppression_window_ms = 0;
        config.logging.format = "xml".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("drift_tolerance_secs")));
        assert!(errors.iter().any(|e| e.contains("logging.format")));
    }
}
