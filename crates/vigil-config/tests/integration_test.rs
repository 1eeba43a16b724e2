//! Integration tests for vigil-config
//!
//! These exercise the full load pipeline against real files.

use std::path::PathBuf;
use std::time::Duration;

use tempfile::tempdir;
use vigil_config::Config;

#[test]
fn test_load_full_config_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");

    let config_content = r#"
[install]
target_path = "/opt/vigil/vigild"
unit_path = "/etc/systemd/system/custom.service"
unit_name = "custom.service"

[sentinel]
path = "/var/lib/vigil/pulse"
staleness_secs = 7200

[workers]
binary = "/opt/vigil/worker"
process_name = "vigil-worker"
endpoint = "hub.example:3333"
limiter = "/usr/bin/cpulimit"

[failsafe]
control_path = "/proc/sysrq-trigger"

[supervisor]
warmup_uptime_secs = 600
watchdog_interval_secs = 300
worker_interval_secs = 30
"#;
    std::fs::write(&path, config_content).unwrap();

    let config = Config::load(Some(&path)).unwrap();

    assert_eq!(config.install.target_path, PathBuf::from("/opt/vigil/vigild"));
    assert_eq!(config.install.unit_name, "custom.service");
    assert_eq!(config.sentinel.path, PathBuf::from("/var/lib/vigil/pulse"));
    assert_eq!(config.sentinel.staleness(), Duration::from_secs(7200));
    assert_eq!(config.workers.endpoint, "hub.example:3333");
    assert_eq!(config.supervisor.warmup_uptime(), Duration::from_secs(600));
    assert_eq!(
        config.supervisor.watchdog_interval(),
        Duration::from_secs(300)
    );
    assert_eq!(config.supervisor.worker_interval(), Duration::from_secs(30));
}

#[test]
fn test_default_toml_parses_back() {
    let toml_str = Config::default_toml();
    let parsed: Config = toml::from_str(&toml_str).unwrap();
    assert_eq!(parsed.sentinel.staleness(), Duration::from_secs(36 * 3600));
}

#[test]
fn test_env_override_wins_over_file() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[sentinel]\npath = \"/from/file\"\n").unwrap();

    std::env::set_var("VIGIL_SENTINEL_PATH", "/from/env");
    let config = Config::load(Some(&path)).unwrap();
    std::env::remove_var("VIGIL_SENTINEL_PATH");

    assert_eq!(config.sentinel.path, PathBuf::from("/from/env"));
}
