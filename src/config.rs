//! Configuration for jobwatch, read from `jobwatch.toml`.
//!
//! Values are layered: built-in defaults, then the config file, then
//! environment variables, then command-line flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! [monitor]
//! timeout_ms = 1200000
//! namespace = "celeryapp"
//!
//! [ui]
//! mode = "full"        # full | minimal | json
//! verbose = false
//!
//! [callback]
//! port = 0             # 0 picks a free port
//!
//! [logging]
//! level = "info"
//! format = "pretty"    # pretty | json
//! file = "/var/log/jobwatch.log"
//! ```

use crate::errors::ConfigError;
use crate::job::DEFAULT_NAMESPACE;
use crate::timer::DEFAULT_TIMEOUT;
use crate::view::UiMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE_NAME: &str = "jobwatch.toml";
pub const PROJECT_CONFIG_DIR: &str = ".jobwatch";

pub const ENV_TIMEOUT_MS: &str = "JOBWATCH_TIMEOUT_MS";
pub const ENV_NAMESPACE: &str = "JOBWATCH_NAMESPACE";
pub const ENV_UI: &str = "JOBWATCH_UI";

/// `[monitor]`: how long to wait and where to listen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Give up after this many milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Prefix of every job channel
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            namespace: default_namespace(),
        }
    }
}

impl MonitorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// `[ui]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiConfig {
    /// Output mode name; unknown names fall back to `full`
    #[serde(default = "default_ui_mode")]
    pub mode: String,
    #[serde(default)]
    pub verbose: bool,
}

fn default_ui_mode() -> String {
    UiMode::Full.to_string()
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            mode: default_ui_mode(),
            verbose: false,
        }
    }
}

impl UiConfig {
    pub fn mode(&self) -> UiMode {
        UiMode::parse(&self.mode)
    }
}

/// `[callback]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackConfig {
    #[serde(default)]
    pub port: u16,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for jobwatch's own targets; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// Also append logs to this file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Flags given on the command line. `None` leaves the lower layer in place.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub timeout_ms: Option<u64>,
    pub ui: Option<String>,
    pub port: Option<u16>,
    pub verbose: bool,
}

/// The whole `jobwatch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobwatchConfig {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub callback: CallbackConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl JobwatchConfig {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Where the config file is looked for, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("jobwatch").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// The file to read: `explicit` if given, else the first search path that exists.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        Self::search_paths().into_iter().find(|p| p.exists())
    }

    /// Load the file (or defaults when none is found), then apply the environment.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// location is not.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = Self::locate(explicit);
        let mut config = match &path {
            Some(p) => {
                tracing::debug!(path = %p.display(), "Loading config file");
                Self::load(p)?
            }
            None => Self::default(),
        };
        config.apply_env();
        Ok((config, path))
    }

    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.monitor.timeout_ms = ms,
                Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", ENV_TIMEOUT_MS, raw),
            }
        }
        if let Some(namespace) = lookup(ENV_NAMESPACE) {
            self.monitor.namespace = namespace;
        }
        if let Some(mode) = lookup(ENV_UI) {
            self.ui.mode = mode;
        }
    }

    pub fn apply_cli(&mut self, cli: &CliOverrides) {
        if let Some(ms) = cli.timeout_ms {
            self.monitor.timeout_ms = ms;
        }
        if let Some(ref mode) = cli.ui {
            self.ui.mode = mode.clone();
        }
        if let Some(port) = cli.port {
            self.callback.port = port;
        }
        if cli.verbose {
            self.ui.verbose = true;
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::WriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Problems worth telling the user about. An empty list means the config is sane.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.monitor.timeout_ms == 0 {
            warnings.push(
                "monitor.timeout_ms is 0: every job will time out immediately".to_string(),
            );
        }
        if self.monitor.namespace.trim().is_empty() {
            warnings.push("monitor.namespace is empty: channel ids will start with ':'".to_string());
        }
        if !UiMode::is_known(&self.ui.mode) {
            warnings.push(format!(
                "Unknown ui.mode '{}': falling back to full. Valid values: full, minimal, json",
                self.ui.mode
            ));
        }
        if !is_valid_level(&self.logging.level) {
            warnings.push(format!(
                "Invalid logging.level '{}': should be one of trace, debug, info, warn, error",
                self.logging.level
            ));
        }

        warnings
    }
}

fn is_valid_level(level: &str) -> bool {
    matches!(
        level.to_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config = JobwatchConfig::parse("").unwrap();
        assert_eq!(config, JobwatchConfig::default());
        assert_eq!(config.monitor.timeout_ms, 1_200_000);
        assert_eq!(config.monitor.namespace, "celeryapp");
        assert_eq!(config.ui.mode(), UiMode::Full);
        assert_eq!(config.callback.port, 0);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_parse_sections() {
        let config = JobwatchConfig::parse(
            r#"
            [monitor]
            timeout_ms = 5000
            namespace = "worker"

            [ui]
            mode = "json"

            [callback]
            port = 8123

            [logging]
            level = "debug"
            format = "json"
            file = "/tmp/jobwatch.log"
            "#,
        )
        .unwrap();
        assert_eq!(config.monitor.timeout(), Duration::from_secs(5));
        assert_eq!(config.monitor.namespace, "worker");
        assert_eq!(config.ui.mode(), UiMode::Json);
        assert_eq!(config.callback.port, 8123);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/jobwatch.log")));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let err = JobwatchConfig::parse("[monitor\ntimeout_ms = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_layering_file_env_cli() {
        let mut config = JobwatchConfig::parse("[monitor]\ntimeout_ms = 5000\n").unwrap();
        assert_eq!(config.monitor.timeout_ms, 5000);

        config.apply_env_from(env(&[(ENV_TIMEOUT_MS, "7000"), (ENV_UI, "minimal")]));
        assert_eq!(config.monitor.timeout_ms, 7000);
        assert_eq!(config.ui.mode(), UiMode::Minimal);

        config.apply_cli(&CliOverrides {
            timeout_ms: Some(9000),
            ..Default::default()
        });
        assert_eq!(config.monitor.timeout_ms, 9000);
        // Unset CLI flags leave the env layer alone
        assert_eq!(config.ui.mode(), UiMode::Minimal);
    }

    #[test]
    fn test_env_invalid_timeout_ignored() {
        let mut config = JobwatchConfig::default();
        config.apply_env_from(env(&[(ENV_TIMEOUT_MS, "soon"), (ENV_NAMESPACE, "worker")]));
        assert_eq!(config.monitor.timeout_ms, 1_200_000);
        assert_eq!(config.monitor.namespace, "worker");
    }

    #[test]
    fn test_validate_warnings() {
        assert!(JobwatchConfig::default().validate().is_empty());

        let mut config = JobwatchConfig::default();
        config.monitor.timeout_ms = 0;
        config.monitor.namespace = " ".to_string();
        config.ui.mode = "fancy".to_string();
        config.logging.level = "loud".to_string();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 4);
        assert!(warnings[0].contains("timeout_ms"));
        assert!(warnings[1].contains("namespace"));
        assert!(warnings[2].contains("fancy"));
        assert!(warnings[3].contains("loud"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = JobwatchConfig::default();
        config.monitor.namespace = "worker".to_string();
        config.logging.file = Some(PathBuf::from("/tmp/jw.log"));
        config.save(&path).unwrap();

        let loaded = JobwatchConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = JobwatchConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFailed { .. }));
    }

    #[test]
    fn test_locate_prefers_explicit_path() {
        let explicit = Path::new("/somewhere/custom.toml");
        assert_eq!(
            JobwatchConfig::locate(Some(explicit)),
            Some(explicit.to_path_buf())
        );
    }

    #[test]
    fn test_resolve_explicit_missing_path_errors() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(JobwatchConfig::resolve(Some(&missing)).is_err());
    }
}
