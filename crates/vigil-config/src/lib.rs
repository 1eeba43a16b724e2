//! # vigil-config
//!
//! Configuration management for the vigil supervisor.
//!
//! Loads configuration from:
//! 1. Built-in defaults
//! 2. `/etc/vigil/config.toml` (or an explicit path)
//! 3. Environment variables (highest priority)
//!
//! Every path, threshold, and interval the supervisor uses lives here and
//! is threaded through constructors explicitly, so each boundary can be
//! pinned down in tests without touching process-wide state.

pub mod logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Default config location for the installed daemon.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/vigil/config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub install: InstallConfig,
    pub sentinel: SentinelConfig,
    pub workers: WorkerConfig,
    pub failsafe: FailsafeConfig,
    pub supervisor: SupervisorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            install: InstallConfig::default(),
            sentinel: SentinelConfig::default(),
            workers: WorkerConfig::default(),
            failsafe: FailsafeConfig::default(),
            supervisor: SupervisorConfig::default(),
        }
    }
}

impl Config {
    /// Load config, starting from defaults and layering the file at
    /// `path` (or [`DEFAULT_CONFIG_PATH`]) on top if it exists, then
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        if path.exists() {
            debug!(path = %path.display(), "Loading config file");
            let contents = std::fs::read_to_string(path)?;
            config = toml::from_str(&contents)?;
        }

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("VIGIL_SENTINEL_PATH") {
            self.sentinel.path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("VIGIL_INSTALL_TARGET") {
            self.install.target_path = PathBuf::from(path);
        }
        if let Ok(endpoint) = std::env::var("VIGIL_WORKER_ENDPOINT") {
            self.workers.endpoint = endpoint;
        }
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Config::default()).unwrap()
    }
}

/// Self-installation paths and service registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Canonical location the running binary is deployed to
    pub target_path: PathBuf,
    /// Where the rendered service unit is written
    pub unit_path: PathBuf,
    /// Unit name passed to the service manager
    pub unit_name: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            target_path: PathBuf::from("/usr/local/bin/vigild"),
            unit_path: PathBuf::from("/etc/systemd/system/vigil.service"),
            unit_name: "vigil.service".to_string(),
        }
    }
}

/// Dead-man-switch sentinel file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// File whose mtime is the heartbeat signal
    pub path: PathBuf,
    /// Seconds of staleness before the fail-safe fires (default 36 h)
    pub staleness_secs: u64,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/etc/vigil/heartbeat"),
            staleness_secs: 36 * 3600,
        }
    }
}

impl SentinelConfig {
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }
}

/// Worker pool launch parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker executable path
    pub binary: PathBuf,
    /// Process name liveness and kill are matched on
    pub process_name: String,
    /// Endpoint passed to each worker via `-o`
    pub endpoint: String,
    /// CPU limiter wrapper used for throttled roles
    pub limiter: PathBuf,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("/usr/local/bin/vigil-worker"),
            process_name: "vigil-worker".to_string(),
            endpoint: "work.internal:3333".to_string(),
            limiter: PathBuf::from("/usr/bin/cpulimit"),
        }
    }
}

/// Fail-safe control interface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailsafeConfig {
    /// Privileged control file the power-off command is written to
    pub control_path: PathBuf,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            control_path: PathBuf::from("/proc/sysrq-trigger"),
        }
    }
}

/// Supervisor loop timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Minimum host uptime before the first watchdog check (default 30 min)
    pub warmup_uptime_secs: u64,
    /// Seconds between sentinel checks (default 7 min)
    pub watchdog_interval_secs: u64,
    /// Seconds between worker reconcile passes
    pub worker_interval_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            warmup_uptime_secs: 1800,
            watchdog_interval_secs: 420,
            worker_interval_secs: 60,
        }
    }
}

impl SupervisorConfig {
    pub fn warmup_uptime(&self) -> Duration {
        Duration::from_secs(self.warmup_uptime_secs)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    pub fn worker_interval(&self) -> Duration {
        Duration::from_secs(self.worker_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sentinel.staleness_secs, 129_600);
        assert_eq!(config.supervisor.warmup_uptime_secs, 1800);
        assert_eq!(config.install.unit_name, "vigil.service");
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[install]"));
        assert!(toml_str.contains("[sentinel]"));
        assert!(toml_str.contains("/proc/sysrq-trigger"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.sentinel.path, parsed.sentinel.path);
        assert_eq!(
            config.supervisor.watchdog_interval_secs,
            parsed.supervisor.watchdog_interval_secs
        );
    }

    #[test]
    fn test_load_missing_file_falls_back_to_defaults() {
        let config = Config::load(Some(Path::new("/nonexistent/vigil.toml"))).unwrap();
        assert_eq!(config.workers.process_name, "vigil-worker");
    }

    #[test]
    fn test_load_partial_file_keeps_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[sentinel]\npath = \"/tmp/pulse\"\nstaleness_secs = 60\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sentinel.path, PathBuf::from("/tmp/pulse"));
        assert_eq!(config.sentinel.staleness(), Duration::from_secs(60));
        // Untouched sections keep their defaults
        assert_eq!(config.supervisor.worker_interval_secs, 60);
    }
}
