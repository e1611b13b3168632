//! TOML-based configuration for Pageflow
//!
//! Declarative configuration for the application shell, logging and the
//! ordered navigation entries that seed the route table, loaded from a
//! `pageflow.toml` file.

use crate::routes::{derive_routes, NavEntry, PathNormalizer, RouteConvention, RouteSource};
use crate::types::RouteDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure loaded from pageflow.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageflowConfig {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Navigation entries, in sidebar order
    #[serde(default)]
    pub nav: Vec<NavEntry>,
}

// ============= Application Configuration =============

/// Runtime configuration of a router instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default document title; suffix of every page title.
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_home_path")]
    pub home_path: String,

    /// Always reached by a full document load.
    #[serde(default = "default_login_path")]
    pub login_path: String,

    /// Origin that decides which links are internal.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Directory holding one code unit per page module.
    #[serde(default = "default_module_dir")]
    pub module_dir: String,

    /// Markup shown while a module loads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_html: Option<String>,
}

fn default_title() -> String {
    "Pageflow".to_string()
}

fn default_home_path() -> String {
    "/".to_string()
}

fn default_login_path() -> String {
    "/login.html".to_string()
}

fn default_origin() -> String {
    "http://localhost".to_string()
}

fn default_module_dir() -> String {
    "/js/pages".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            home_path: default_home_path(),
            login_path: default_login_path(),
            origin: default_origin(),
            module_dir: default_module_dir(),
            loading_html: None,
        }
    }
}

impl AppConfig {
    pub fn normalizer(&self) -> Result<PathNormalizer, ConfigError> {
        PathNormalizer::new(&self.origin).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    pub fn convention(&self) -> RouteConvention {
        RouteConvention::new(&self.module_dir)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "app.title must not be empty".to_string(),
            ));
        }

        self.normalizer()?;

        for (field, value) in [
            ("app.home_path", &self.home_path),
            ("app.login_path", &self.login_path),
            ("app.module_dir", &self.module_dir),
        ] {
            if !value.starts_with('/') {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be an absolute path, got '{}'",
                    field, value
                )));
            }
        }

        Ok(())
    }
}

// ============= Logging Configuration =============

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `pageflow=debug`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ============= Validation =============

/// Configuration warnings that don't prevent operation but may indicate issues
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub kind: ConfigWarningKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarningKind {
    /// Two entries normalize to the same path; the later one wins.
    DuplicateRoute,
    /// An entry points at the home or login path and never becomes a module route.
    ReservedPath,
    /// An entry leaves the application origin.
    CrossOrigin,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl PageflowConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::parse(&content)?;

        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: PageflowConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.app.validate()?;

        for (index, entry) in self.nav.iter().enumerate() {
            if entry.href.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "nav entry #{} ('{}') has an empty href",
                    index + 1,
                    entry.label
                )));
            }
        }

        Ok(())
    }

    /// Validate and collect non-fatal warnings
    pub fn validate_with_warnings(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        self.validate()?;

        let normalizer = self.app.normalizer()?;
        let mut warnings = Vec::new();
        let mut seen: HashMap<String, &str> = HashMap::new();

        for entry in &self.nav {
            let Some(url) = normalizer.resolve(&entry.href, "/") else {
                continue;
            };

            if !normalizer.is_same_origin(&url) {
                warnings.push(ConfigWarning {
                    kind: ConfigWarningKind::CrossOrigin,
                    message: format!(
                        "Nav entry '{}' points outside {} and will not be routed",
                        entry.label,
                        normalizer.origin().origin().ascii_serialization()
                    ),
                });
                continue;
            }

            let path = url.path().to_string();
            if path == self.app.home_path || path == self.app.login_path {
                warnings.push(ConfigWarning {
                    kind: ConfigWarningKind::ReservedPath,
                    message: format!(
                        "Nav entry '{}' points at reserved path '{}' and is not a module route",
                        entry.label, path
                    ),
                });
                continue;
            }

            if let Some(previous) = seen.insert(path.clone(), entry.label.as_str()) {
                warnings.push(ConfigWarning {
                    kind: ConfigWarningKind::DuplicateRoute,
                    message: format!(
                        "Nav entries '{}' and '{}' both resolve to '{}'; the later one wins",
                        previous, entry.label, path
                    ),
                });
            }
        }

        Ok(warnings)
    }

    /// Route descriptors derived from the nav entries
    pub fn routes(&self) -> Result<Vec<RouteDescriptor>, ConfigError> {
        let normalizer = self.app.normalizer()?;
        Ok(derive_routes(
            &self.nav,
            &self.app.convention(),
            &normalizer,
            &self.app.home_path,
            &self.app.login_path,
        ))
    }
}

impl RouteSource for PageflowConfig {
    fn entries(&self) -> Vec<NavEntry> {
        self.nav.clone()
    }
}
