//! CLI configuration file support
//!
//! Loads configuration from ~/.config/medichat/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub relay: RelayEndpoint,
    #[serde(default)]
    pub default: DefaultConfig,
    #[serde(default)]
    pub records: RecordsConfig,
}

/// Where questions are sent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayEndpoint {
    pub url: Option<String>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConfig {
    /// Persona used when `--doctor` is not given
    pub doctor: Option<String>,
}

/// Record store that saved conversations are written to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordsConfig {
    /// REST root, e.g. `https://project.example.co/rest/v1`
    pub url: Option<String>,
    pub api_key: Option<String>,
}

impl CliConfig {
    /// Load from `path`, or the default location when `None`
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::default_path()
                .map(|path| Self::load_from_path(&path))
                .unwrap_or_default(),
        }
    }

    /// Missing or unreadable files yield the default config
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "Ignoring malformed config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("medichat").join("config.toml"))
    }
}
