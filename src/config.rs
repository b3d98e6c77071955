use anyhow::{Context, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::api::Endpoint;
use crate::cache::CachePolicy;
use crate::compat::RunningVersions;
use crate::security::Capability;
use crate::version::parse_lenient;

/// Settings read from `config.toml`. Every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub recommended: RecommendedConfig,
    pub environment: EnvironmentConfig,
    pub user: UserConfig,
}

/// Demo catalog endpoint and cache lifetimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub manifest_url: String,
    pub timeout_secs: u64,
    pub ttl_hours: i64,
    pub error_ttl_days: i64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            manifest_url: "https://prisma.wpzoom.com/demos.json".to_string(),
            timeout_secs: 60,
            ttl_hours: 24,
            error_ttl_days: 30,
        }
    }
}

impl LibraryConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            url: self.manifest_url.clone(),
            timeout: std::time::Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        CachePolicy {
            ttl: Duration::hours(self.ttl_hours),
            error_ttl: Duration::days(self.error_ttl_days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendedConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub ttl_days: i64,
    pub error_ttl_days: i64,
}

impl Default for RecommendedConfig {
    fn default() -> Self {
        Self {
            url: "https://github.com/ciorici/prisma-core/wp-json/api/v1/plugins".to_string(),
            timeout_secs: 10,
            ttl_days: 3,
            error_ttl_days: 30,
        }
    }
}

impl RecommendedConfig {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint {
            url: self.url.clone(),
            timeout: std::time::Duration::from_secs(self.timeout_secs),
        }
    }
}

/// The site this tool acts on behalf of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub companion_version: String,
    pub host_version: String,
    /// Plugins directory of the site; without it plugin status is unknown.
    pub plugins_dir: Option<PathBuf>,
    pub active_plugins: Vec<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            companion_version: env!("CARGO_PKG_VERSION").to_string(),
            host_version: "1.0.0".to_string(),
            plugins_dir: None,
            active_plugins: Vec::new(),
        }
    }
}

impl EnvironmentConfig {
    pub fn running_versions(&self) -> Result<RunningVersions> {
        Ok(RunningVersions {
            companion: parse_lenient(&self.companion_version).with_context(|| {
                format!("Invalid companion_version '{}'", self.companion_version)
            })?,
            host: parse_lenient(&self.host_version)
                .with_context(|| format!("Invalid host_version '{}'", self.host_version))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub capabilities: Vec<Capability>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            capabilities: vec![Capability::ManageOptions, Capability::EditThemeOptions],
        }
    }
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        config.environment.running_versions()?;
        Ok(config)
    }
}
