//! Configuration management for vista.
//!
//! Parses `vista.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! Relative directory paths in the config file are resolved against the
//! directory containing the file; defaults resolve against the current
//! working directory.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the primary served root.
    pub primary_root: Option<PathBuf>,
    /// Override the output root (served second, watched for changes).
    pub output_root: Option<PathBuf>,
    /// Override the watch depth.
    pub watch_depth: Option<u32>,
    /// Override the live reload enabled flag.
    pub live_reload_enabled: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "vista.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Served directory configuration (paths are relative strings from TOML).
    serve: ServeConfigRaw,
    /// Filesystem watch configuration.
    pub watch: WatchConfig,

    /// Resolved serve configuration (set after loading).
    #[serde(skip)]
    pub serve_resolved: ServeConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8081,
        }
    }
}

/// Raw serve configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ServeConfigRaw {
    primary_root: Option<String>,
    output_root: Option<String>,
}

/// Resolved serve configuration with absolute paths.
#[derive(Debug, Default, Clone)]
pub struct ServeConfig {
    /// Directory checked first when resolving a request path.
    pub primary_root: PathBuf,
    /// Directory checked second; also the watched subtree.
    pub output_root: PathBuf,
}

/// Filesystem watch configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether live reload is enabled.
    pub enabled: bool,
    /// Maximum subdirectory depth to observe under the output root.
    pub depth: u32,
    /// Coalescing window for change notifications, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            depth: 2,
            debounce_ms: 100,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `vista.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(primary_root) = &settings.primary_root {
            self.serve_resolved.primary_root.clone_from(primary_root);
        }
        if let Some(output_root) = &settings.output_root {
            self.serve_resolved.output_root.clone_from(output_root);
        }
        if let Some(depth) = settings.watch_depth {
            self.watch.depth = depth;
        }
        if let Some(enabled) = settings.live_reload_enabled {
            self.watch.enabled = enabled;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            serve: ServeConfigRaw::default(),
            watch: WatchConfig::default(),
            serve_resolved: ServeConfig {
                primary_root: base.join("web"),
                output_root: base.join("output"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Resolve raw string paths against the config file's directory.
    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |raw: Option<&String>, default: &str| -> PathBuf {
            let path = Path::new(raw.map_or(default, String::as_str));
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        };

        self.serve_resolved = ServeConfig {
            primary_root: resolve(self.serve.primary_root.as_ref(), "web"),
            output_root: resolve(self.serve.output_root.as_ref(), "output"),
        };
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading and CLI override application.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port must be a non-zero TCP port".to_owned(),
            ));
        }
        if self.server.host.is_empty() {
            return Err(ConfigError::Validation(
                "server.host cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }
}
