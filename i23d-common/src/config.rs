//! Configuration loading and credential resolution
//!
//! i23d reads an optional TOML config file from the platform config
//! directory and resolves the Meshy API credential with ENV → TOML
//! priority. A missing credential is reported, not fatal: the service
//! starts and the generation start action surfaces the configuration
//! error to the user.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Primary credential environment variable
pub const API_KEY_ENV: &str = "I23D_MESHY_API_KEY";
/// Legacy credential environment variable (name used by the Meshy docs)
pub const API_KEY_ENV_FALLBACK: &str = "MESHY_API_KEY";

/// Logging section of the TOML config
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is not set (e.g. "info")
    pub level: Option<String>,
}

/// TOML configuration file contents (~/.config/i23d/config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Meshy API credential (lowest-priority source)
    pub meshy_api_key: Option<String>,
    /// Remote generation API base URL override
    pub api_base_url: Option<String>,
    /// Listen address override (default 127.0.0.1:5730)
    pub bind_addr: Option<String>,
    /// Cap on finalizing-phase status checks; absent means poll until the
    /// remote service resolves the task
    pub max_finalizing_checks: Option<u32>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locate the config file for the platform
///
/// Checks the user config directory first, then /etc/i23d on Linux.
pub fn config_file_path() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        let user_config = dir.join("i23d").join("config.toml");
        if user_config.exists() {
            return Some(user_config);
        }
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/i23d/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Load the TOML config from the platform location, defaulting when absent
pub fn load_toml_config() -> Result<TomlConfig> {
    match config_file_path() {
        Some(path) => {
            let config = load_toml_config_from(&path)?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Load and parse a specific TOML config file
pub fn load_toml_config_from(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve the Meshy API key with ENV → TOML priority
///
/// Returns `None` when no source provides a usable key; callers surface the
/// configuration error at the point of use rather than refusing to start.
pub fn resolve_meshy_api_key(toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let env_fallback_key = std::env::var(API_KEY_ENV_FALLBACK)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .meshy_api_key
        .as_ref()
        .filter(|k| is_valid_key(k));

    let mut sources = Vec::new();
    if env_key.is_some() {
        sources.push(API_KEY_ENV);
    }
    if env_fallback_key.is_some() {
        sources.push(API_KEY_ENV_FALLBACK);
    }
    if toml_key.is_some() {
        sources.push("TOML");
    }

    if sources.len() > 1 {
        warn!(
            "Meshy API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(key) = env_key {
        info!("Meshy API key loaded from {}", API_KEY_ENV);
        return Some(key);
    }
    if let Some(key) = env_fallback_key {
        info!("Meshy API key loaded from {}", API_KEY_ENV_FALLBACK);
        return Some(key);
    }
    if let Some(key) = toml_key {
        info!("Meshy API key loaded from TOML config");
        return Some(key.clone());
    }

    None
}

/// Validate an API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
