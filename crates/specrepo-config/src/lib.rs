//! Configuration management for specrepo.
//!
//! Parses `specrepo.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Precedence, lowest first: built-in defaults, the config file, the
//! `SPECREPO_PLUGINS_DIR` environment variable, then [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `spec.basedir`
//! - `plugins.dir`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "specrepo.toml";

/// Environment variable overriding the plugin directory.
pub const PLUGINS_DIR_ENV: &str = "SPECREPO_PLUGINS_DIR";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override spec root directory.
    pub basedir: Option<PathBuf>,
    /// Override plugin directory.
    pub plugins_dir: Option<PathBuf>,
    /// Override the skip-plugins flag.
    pub skip_plugins: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Spec root configuration (paths are relative strings from TOML).
    spec: SpecConfigRaw,
    /// Plugin configuration (paths are relative strings from TOML).
    plugins: PluginsConfigRaw,
    /// Bundle step switches.
    pub bundle: BundleConfig,

    /// Resolved spec root configuration (set after loading).
    #[serde(skip)]
    pub spec_resolved: SpecConfig,
    /// Resolved plugin directory (set after loading).
    #[serde(skip)]
    pub plugins_dir: PathBuf,
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
            port: 3000,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SpecConfigRaw {
    basedir: Option<String>,
    main_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PluginsConfigRaw {
    dir: Option<String>,
}

/// Resolved spec root configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SpecConfig {
    /// Top-level spec root directory.
    pub basedir: PathBuf,
    /// Main document filename inside every root.
    pub main_file: String,
}

/// Bundle step switches.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    pub skip_code_samples: bool,
    pub skip_headers_inlining: bool,
    pub skip_plugins: bool,
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
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`SPEC_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `specrepo.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or
    /// the resulting configuration is invalid.
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

        let cwd = std::env::current_dir().unwrap_or_default();
        config.apply_env_overrides(|name| std::env::var(name).ok(), &cwd);

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides; relative values resolve against `cwd`.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>, cwd: &Path) {
        if let Some(dir) = lookup(PLUGINS_DIR_ENV).filter(|d| !d.is_empty()) {
            self.plugins_dir = cwd.join(dir);
        }
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(basedir) = &settings.basedir {
            // A plugin directory derived from the old basedir moves with it
            if self.plugins_dir == self.spec_resolved.basedir.join("plugins") {
                self.plugins_dir = basedir.join("plugins");
            }
            self.spec_resolved.basedir.clone_from(basedir);
        }
        if let Some(plugins_dir) = &settings.plugins_dir {
            self.plugins_dir.clone_from(plugins_dir);
        }
        if let Some(skip_plugins) = settings.skip_plugins {
            self.bundle.skip_plugins = skip_plugins;
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
            spec: SpecConfigRaw::default(),
            plugins: PluginsConfigRaw::default(),
            bundle: BundleConfig::default(),
            spec_resolved: SpecConfig {
                basedir: base.join("spec"),
                main_file: "openapi.yaml".to_owned(),
            },
            plugins_dir: base.join("spec").join("plugins"),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        let main_file = &self.spec_resolved.main_file;
        require_non_empty(main_file, "spec.main_file")?;
        if Path::new(main_file).components().count() != 1 {
            return Err(ConfigError::Validation(format!(
                "spec.main_file must be a file name, got {main_file:?}"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;

        if let Some(ref basedir) = self.spec.basedir {
            self.spec.basedir = Some(expand::expand_env(basedir, "spec.basedir")?);
        }
        if let Some(ref dir) = self.plugins.dir {
            self.plugins.dir = Some(expand::expand_env(dir, "plugins.dir")?);
        }

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let basedir = config_dir.join(self.spec.basedir.as_deref().unwrap_or("spec"));
        self.plugins_dir = match self.plugins.dir.as_deref() {
            Some(dir) => config_dir.join(dir),
            None => basedir.join("plugins"),
        };
        self.spec_resolved = SpecConfig {
            basedir,
            main_file: self
                .spec
                .main_file
                .clone()
                .unwrap_or_else(|| "openapi.yaml".to_owned()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.spec_resolved.basedir, PathBuf::from("/test/spec"));
        assert_eq!(config.spec_resolved.main_file, "openapi.yaml");
        assert_eq!(config.plugins_dir, PathBuf::from("/test/spec/plugins"));
        assert!(!config.bundle.skip_plugins);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000

[spec]
basedir = "api"
main_file = "swagger.yaml"

[plugins]
dir = "tools/plugins"

[bundle]
skip_code_samples = true
skip_plugins = true
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.spec_resolved.basedir, PathBuf::from("/project/api"));
        assert_eq!(config.spec_resolved.main_file, "swagger.yaml");
        assert_eq!(config.plugins_dir, PathBuf::from("/project/tools/plugins"));
        assert!(config.bundle.skip_code_samples);
        assert!(!config.bundle.skip_headers_inlining);
        assert!(config.bundle.skip_plugins);
    }

    #[test]
    fn test_plugins_dir_follows_basedir() {
        let mut config: Config = toml::from_str("[spec]\nbasedir = \"api\"\n").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.plugins_dir, PathBuf::from("/project/api/plugins"));
    }

    #[test]
    fn test_unknown_section_value_type_fails() {
        let result: Result<Config, _> = toml::from_str("[server]\nport = \"high\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_override_plugins_dir() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_env_overrides(
            |name| (name == PLUGINS_DIR_ENV).then(|| "custom/plugins".to_owned()),
            Path::new("/work"),
        );
        assert_eq!(config.plugins_dir, PathBuf::from("/work/custom/plugins"));

        config.apply_env_overrides(
            |name| (name == PLUGINS_DIR_ENV).then(|| "/abs/plugins".to_owned()),
            Path::new("/work"),
        );
        assert_eq!(config.plugins_dir, PathBuf::from("/abs/plugins"));
    }

    #[test]
    fn test_empty_env_override_ignored() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_env_overrides(|_| Some(String::new()), Path::new("/work"));

        assert_eq!(config.plugins_dir, PathBuf::from("/test/spec/plugins"));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            port: Some(9000),
            basedir: Some(PathBuf::from("/custom/spec")),
            skip_plugins: Some(true),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1"); // Unchanged
        assert_eq!(config.spec_resolved.basedir, PathBuf::from("/custom/spec"));
        assert_eq!(config.plugins_dir, PathBuf::from("/custom/spec/plugins"));
        assert!(config.bundle.skip_plugins);
    }

    #[test]
    fn test_apply_cli_basedir_keeps_explicit_plugins_dir() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.plugins_dir = PathBuf::from("/tools/plugins");

        config.apply_cli_settings(&CliSettings {
            basedir: Some(PathBuf::from("/custom/spec")),
            ..Default::default()
        });

        assert_eq!(config.plugins_dir, PathBuf::from("/tools/plugins"));
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.spec_resolved.basedir, PathBuf::from("/test/spec"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.host = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("server.host"));

        let mut config = Config::default_with_base(Path::new("/test"));
        config.spec_resolved.main_file = "nested/openapi.yaml".to_owned();
        assert!(config.validate().unwrap_err().to_string().contains("spec.main_file"));
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        let toml = r#"
[server]
host = "${MISSING_VAR_SPECREPO_CONFIG_TEST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();

        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("MISSING_VAR_SPECREPO_CONFIG_TEST"));
        assert!(err.to_string().contains("server.host"));
    }

    #[test]
    fn test_expand_env_vars_default() {
        let toml = r#"
[spec]
basedir = "${MISSING_VAR_SPECREPO_BASEDIR:-api}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();

        config.expand_env_vars().unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.spec_resolved.basedir, PathBuf::from("/project/api"));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("specrepo.toml");
        std::fs::write(&path, "[server]\nport = 4000\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.spec_resolved.basedir, temp_dir.path().join("spec"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/specrepo.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("specrepo.toml");
        std::fs::write(&path, "[server\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
