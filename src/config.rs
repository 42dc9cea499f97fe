//! Configuration management for msbuild-lsp.
//!
//! Settings come from a TOML file.  Lookup order (first hit wins):
//! 1. An explicit path (the `--config` command-line flag)
//! 2. `.msbuild-lsp.toml` in the workspace root
//! 3. `msbuild-lsp/config.toml` in the user's config directory
//! 4. Built-in defaults
//!
//! A file that cannot be parsed is logged and skipped, never fatal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use etcetera::BaseStrategy;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// File name looked up in the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = ".msbuild-lsp.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub completion: CompletionConfig,
    pub registry: RegistryConfig,
    pub logging: LoggingConfig,
    pub reference: ReferenceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Names starting with this prefix are private to the build and are
    /// never offered from the evaluated project.
    pub private_name_prefix: String,
    /// Offer property / item / target names discovered by evaluating the
    /// project and its imports.
    pub project_names: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            private_name_prefix: "_".to_string(),
            project_names: true,
        }
    }
}

/// Package-registry lookups for `PackageReference` completions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub enabled: bool,
    /// Identifier search: `GET <search_endpoint>?<query_parameter>=<partial>&take=<page_size>`.
    pub search_endpoint: String,
    /// Version listing: `GET <versions_endpoint>?id=<identifier>`.
    pub versions_endpoint: String,
    pub query_parameter: String,
    pub page_size: usize,
    pub timeout_ms: u64,
    pub include_prerelease: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            search_endpoint: "https://azuresearch-usnc.nuget.org/autocomplete".to_string(),
            versions_endpoint: "https://azuresearch-usnc.nuget.org/autocomplete".to_string(),
            query_parameter: "q".to_string(),
            page_size: 20,
            timeout_ms: 3000,
            include_prerelease: false,
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `msbuild_lsp=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    /// JSON file with extra reference documentation entries.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// The per-user configuration file, if a home directory can be found.
    pub fn user_config_path() -> Option<PathBuf> {
        etcetera::choose_base_strategy()
            .ok()
            .map(|strategy| strategy.config_dir().join("msbuild-lsp").join("config.toml"))
    }

    /// Candidate files in lookup order.
    pub fn candidate_paths(explicit: Option<&Path>, workspace_root: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(path) = explicit {
            paths.push(path.to_path_buf());
        }
        if let Some(root) = workspace_root {
            paths.push(root.join(WORKSPACE_CONFIG_FILE));
        }
        if let Some(user) = Self::user_config_path() {
            paths.push(user);
        }
        paths
    }

    /// Load the first readable, valid configuration file; defaults
    /// otherwise.
    pub fn discover(explicit: Option<&Path>, workspace_root: Option<&Path>) -> Self {
        for path in Self::candidate_paths(explicit, workspace_root) {
            if !path.is_file() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded configuration");
                    return config.resolve_relative_paths(path.parent());
                }
                Err(err) => warn!(%err, "skipping configuration file"),
            }
        }
        Self::default()
    }

    /// Make the reference-data path relative to the config file's
    /// directory.
    fn resolve_relative_paths(mut self, base: Option<&Path>) -> Self {
        if let (Some(base), Some(path)) = (base, self.reference.path.as_ref())
            && path.is_relative()
        {
            self.reference.path = Some(base.join(path));
        }
        self
    }
}
