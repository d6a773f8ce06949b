//! Service configuration for i23d-studio
//!
//! Built once at startup from the shared TOML config plus defaults; the
//! credential itself is resolved separately (see i23d_common::config) and
//! kept out of this struct so it never leaks into logs.

use i23d_common::config::TomlConfig;

use crate::services::meshy_client::DEFAULT_API_BASE_URL;
use crate::services::PollTiming;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5730";

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Listen address
    pub bind_addr: String,
    /// Remote generation API base URL
    pub api_base_url: String,
    /// Ceiling on finalizing-phase status checks (None = poll until the
    /// remote service resolves the task)
    pub max_finalizing_checks: Option<u32>,
}

impl StudioConfig {
    /// Build the service configuration from the TOML config
    pub fn from_toml(toml: &TomlConfig) -> Self {
        Self {
            bind_addr: toml
                .bind_addr
                .clone()
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            api_base_url: toml
                .api_base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            max_finalizing_checks: toml.max_finalizing_checks,
        }
    }

    /// Polling cadence for generation sessions
    pub fn poll_timing(&self) -> PollTiming {
        PollTiming {
            max_finalizing_checks: self.max_finalizing_checks,
            ..PollTiming::default()
        }
    }
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(config.max_finalizing_checks.is_none());
        assert!(config.poll_timing().max_finalizing_checks.is_none());
    }

    #[test]
    fn test_toml_overrides() {
        let toml = TomlConfig {
            bind_addr: Some("127.0.0.1:6001".to_string()),
            api_base_url: Some("http://localhost:9999/".to_string()),
            max_finalizing_checks: Some(60),
            ..Default::default()
        };
        let config = StudioConfig::from_toml(&toml);
        assert_eq!(config.bind_addr, "127.0.0.1:6001");
        assert_eq!(config.api_base_url, "http://localhost:9999/");
        assert_eq!(config.poll_timing().max_finalizing_checks, Some(60));
    }
}
