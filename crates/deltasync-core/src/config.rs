//! Configuration module for DeltaSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Number of message commands requested per sync round by default.
///
/// The server never returns more than 2000 per round whatever is asked. Each
/// `<Add>` is about 1 kB, so 256 keeps responses around 256 kB.
pub const DEFAULT_WINDOW_SIZE: u32 = 256;

/// Largest window size the server honours; larger values are clamped by it.
pub const SERVER_MAX_WINDOW_SIZE: u32 = 2000;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DeltaSync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub account: AccountConfig,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Account settings. The password is never stored in the configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    /// Account name used to log in. `None` until configured.
    pub username: Option<String>,
}

/// Synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum number of message changes requested per sync round.
    pub window_size: u32,
}

/// Cache persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding one JSON state file per user.
    pub state_dir: PathBuf,
    /// Whether cache state is written to `state_dir` after every change.
    pub persist: bool,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/deltasync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("deltasync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            state_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("deltasync")
                .join("state"),
            persist: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.window_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Window sizes above
    /// [`SERVER_MAX_WINDOW_SIZE`] are accepted; the server clamps them.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- account ---
        if let Some(username) = &self.account.username {
            if username.trim().is_empty() {
                errors.push(ValidationError {
                    field: "account.username".into(),
                    message: "must not be empty".into(),
                });
            }
        }

        // --- sync ---
        if self.sync.window_size == 0 {
            errors.push(ValidationError {
                field: "sync.window_size".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- cache ---
        if self.cache.state_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "cache.state_dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}', expected one of: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows overriding individual fields.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- account ---

    pub fn account_username(mut self, username: impl Into<String>) -> Self {
        self.config.account.username = Some(username.into());
        self
    }

    // --- sync ---

    pub fn sync_window_size(mut self, window_size: u32) -> Self {
        self.config.sync.window_size = window_size;
        self
    }

    // --- cache ---

    pub fn cache_state_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache.state_dir = dir;
        self
    }

    pub fn cache_persist(mut self, persist: bool) -> Self {
        self.config.cache.persist = persist;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert!(cfg.account.username.is_none());
        assert_eq!(cfg.sync.window_size, 256);
        assert!(cfg.cache.persist);
        assert!(cfg.cache.state_dir.to_string_lossy().contains("deltasync"));
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, "text");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
account:
  username: alice@example.com
sync:
  window_size: 1000
cache:
  state_dir: /tmp/deltasync-state
  persist: false
logging:
  level: debug
  format: json
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.account.username.as_deref(), Some("alice@example.com"));
        assert_eq!(cfg.sync.window_size, 1000);
        assert_eq!(cfg.cache.state_dir, PathBuf::from("/tmp/deltasync-state"));
        assert!(!cfg.cache.persist);
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn load_partial_yaml_fills_missing_sections() {
        let yaml = "sync:\n  window_size: 64\n";
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sync.window_size, 64);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.account.username.is_none());
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.sync.window_size, DEFAULT_WINDOW_SIZE);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"sync: [not, a, mapping").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_window_size() {
        let cfg = ConfigBuilder::new().sync_window_size(0).build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "sync.window_size"));
    }

    #[test]
    fn validate_accepts_window_size_above_server_cap() {
        let cfg = ConfigBuilder::new()
            .sync_window_size(SERVER_MAX_WINDOW_SIZE * 2)
            .build();
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn validate_catches_blank_username() {
        let cfg = ConfigBuilder::new().account_username("  ").build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "account.username"));
    }

    #[test]
    fn validate_catches_invalid_log_level_and_format() {
        let cfg = ConfigBuilder::new()
            .logging_level("verbose")
            .logging_format("xml")
            .build();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
        assert!(errors.iter().any(|e| e.field == "logging.format"));
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let cfg = ConfigBuilder::new().logging_level(*level).build();
            assert!(cfg.validate().is_empty(), "level {level} should be valid");
        }
    }

    // -- Builder --

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .account_username("bob@example.com")
            .sync_window_size(512)
            .cache_state_dir(PathBuf::from("/var/lib/deltasync"))
            .cache_persist(false)
            .logging_level("warn")
            .logging_format("json")
            .build();

        assert_eq!(cfg.account.username.as_deref(), Some("bob@example.com"));
        assert_eq!(cfg.sync.window_size, 512);
        assert_eq!(cfg.cache.state_dir, PathBuf::from("/var/lib/deltasync"));
        assert!(!cfg.cache.persist);
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.logging.format, "json");
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new().sync_window_size(0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "sync.window_size: must be greater than 0");
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "logging.level".into(),
            message: "bad".into(),
        };
        assert_eq!(err.to_string(), "logging.level: bad");
    }
}
