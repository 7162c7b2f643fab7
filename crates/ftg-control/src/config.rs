//! Client configuration loaded from defaults, an optional TOML file and the environment.
//!
//! | Key | Env | Default |
//! |-----|-----|---------|
//! | base_url | FTG_CONTROL__BASE_URL | http://127.0.0.1:8787 |
//! | request_timeout_secs | FTG_CONTROL__REQUEST_TIMEOUT_SECS | 8 |
//! | health_poll_interval_ms | FTG_CONTROL__HEALTH_POLL_INTERVAL_MS | 2000 |
//! | logs_poll_interval_ms | FTG_CONTROL__LOGS_POLL_INTERVAL_MS | 1000 |
//! | log_tail_lines | FTG_CONTROL__LOG_TAIL_LINES | 200 |
//! | keychain_service | FTG_CONTROL__KEYCHAIN_SERVICE | ftg-control |
//! | prefs_path | FTG_CONTROL__PREFS_PATH | `<config_dir>/ftg-control/prefs.toml` |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8787";
const DEFAULT_CONFIG_PATH: &str = "config/ftg-control";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Fixed loopback address of the control server.
    pub base_url: String,
    /// Per-call timeout used when the caller does not override it.
    pub request_timeout_secs: u64,
    pub health_poll_interval_ms: u64,
    pub logs_poll_interval_ms: u64,
    /// Value of the `lines` query parameter for `/logs/tail`.
    pub log_tail_lines: u32,
    /// Service name for keychain entries.
    pub keychain_service: String,
    /// Preference file holding the plaintext token fallback.
    #[serde(default)]
    pub prefs_path: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 8,
            health_poll_interval_ms: 2000,
            logs_poll_interval_ms: 1000,
            log_tail_lines: 200,
            keychain_service: "ftg-control".to_string(),
            prefs_path: None,
        }
    }
}

impl ClientConfig {
    /// Load config. Precedence, highest first: `FTG_CONTROL__*` environment variables,
    /// the file named by `FTG_CONTROL_CONFIG` (default `config/ftg-control.toml`), defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("FTG_CONTROL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(Path::new(&config_path))
    }

    /// Load config from a specific file (extension optional). A missing file is not an error.
    pub fn load_from_path(path: &Path) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = config::Config::builder()
            .set_default("base_url", defaults.base_url)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("health_poll_interval_ms", defaults.health_poll_interval_ms as i64)?
            .set_default("logs_poll_interval_ms", defaults.logs_poll_interval_ms as i64)?
            .set_default("log_tail_lines", defaults.log_tail_lines as i64)?
            .set_default("keychain_service", defaults.keychain_service)?;

        let built = builder
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix("FTG_CONTROL").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms.max(100))
    }

    pub fn logs_poll_interval(&self) -> Duration {
        Duration::from_millis(self.logs_poll_interval_ms.max(100))
    }

    /// Resolved preference file path.
    pub fn prefs_file(&self) -> PathBuf {
        match &self.prefs_path {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ftg-control")
                .join("prefs.toml"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ClientConfig::load_from_path(&dir.path().join("absent")).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(8));
        assert_eq!(cfg.health_poll_interval(), Duration::from_secs(2));
        assert_eq!(cfg.log_tail_lines, 200);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "request_timeout_secs = 3\nlogs_poll_interval_ms = 500\nprefs_path = \"/tmp/p.toml\"\n",
        )
        .unwrap();
        let cfg = ClientConfig::load_from_path(&path).unwrap();
        assert_eq!(cfg.request_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.logs_poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.prefs_file(), PathBuf::from("/tmp/p.toml"));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }
}
