//! Bootstrap configuration.
//!
//! Sources, later wins: built-in defaults, an optional JSON file, then
//! `CONTENT_PACKS_*` environment variables. The CLI applies its own flags on top.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "content-packs";
const CONFIG_FILE: &str = "config.json";

/// Where the run is happening.
///
/// `Development` lets a local base be read straight from disk. Every other
/// context requires an `https://` base.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" | "local" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Network fetch tuning shared by manifest and catalog loads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportConfig {
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub backoff_seconds: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            max_retries: 2,
            backoff_seconds: 0.6,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BootstrapConfig {
    /// Base URL or local directory holding `packs.json` and the catalogs.
    pub base_location: String,
    pub environment: Environment,
    pub transport: TransportConfig,
    /// Seed for slot candidate selection. `None` seeds from entropy.
    pub random_seed: Option<u64>,
    /// Anchor for relative local bases. `None` means the working directory.
    pub project_root: Option<PathBuf>,
}

impl BootstrapConfig {
    pub fn new(base_location: impl Into<String>, environment: Environment) -> Self {
        Self {
            base_location: base_location.into(),
            environment,
            ..Self::default()
        }
    }

    /// Defaults, then the default config file if present, then the environment.
    pub fn load() -> Result<Self> {
        let mut config = match default_config_path() {
            Some(path) if path.exists() => Self::load_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Overlay `CONTENT_PACKS_*` variables. Unparseable values are ignored.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(base) = var("CONTENT_PACKS_BASE") {
            self.base_location = base;
        }
        if let Some(env) = var("CONTENT_PACKS_ENV").and_then(|s| Environment::from_str(&s)) {
            self.environment = env;
        }
        if let Some(secs) = var("CONTENT_PACKS_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.transport.timeout_seconds = secs;
        }
        if let Some(n) = var("CONTENT_PACKS_MAX_RETRIES").and_then(|s| s.parse().ok()) {
            self.transport.max_retries = n;
        }
        if let Some(secs) = var("CONTENT_PACKS_BACKOFF_SECS").and_then(|s| s.parse().ok()) {
            self.transport.backoff_seconds = secs;
        }
        if let Some(seed) = var("CONTENT_PACKS_SEED").and_then(|s| s.parse().ok()) {
            self.random_seed = Some(seed);
        }
    }

    /// The directory relative bases are resolved against.
    pub fn project_root(&self) -> PathBuf {
        self.project_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// `<config dir>/content-packs/config.json`, when the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
    Some(dirs.config_dir().join(CONFIG_FILE))
}
