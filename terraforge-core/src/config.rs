//! Application configuration
//!
//! Compiled defaults, overridden by environment variables. The CLI applies
//! its own flags on top through the `with_*` builders.

use crate::error::{Error, Result};
use crate::provider::{ProviderConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_DATA_DIR: &str = ".terraforge";

/// Primary and fallback variables holding the Gemini API key.
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];
pub const MODEL_VAR: &str = "TERRAFORGE_MODEL";
pub const BASE_URL_VAR: &str = "TERRAFORGE_BASE_URL";
pub const TIMEOUT_VAR: &str = "TERRAFORGE_TIMEOUT_SECS";
pub const DATA_DIR_VAR: &str = "TERRAFORGE_DATA_DIR";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Request timeout; `None` keeps the HTTP client default
    pub timeout_secs: Option<u64>,
    /// Where history and drafts are kept
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl AppConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        config.api_key = API_KEY_VARS.iter().find_map(|key| get(*key));
        if config.api_key.is_none() {
            // not fatal: requests will fail at call time instead
            warn!("API key is missing. Set API_KEY (or GEMINI_API_KEY) to reach the model.");
        }

        if let Some(model) = get(MODEL_VAR) {
            config.model = model;
        }
        if let Some(base_url) = get(BASE_URL_VAR) {
            config.base_url = base_url;
        }
        if let Some(raw) = get(TIMEOUT_VAR) {
            let secs = raw.parse::<u64>().map_err(|e| {
                Error::config_invalid(TIMEOUT_VAR, format!("'{}' is not a number of seconds: {}", raw, e))
                    .with_operation("config::from_lookup")
            })?;
            config.timeout_secs = Some(secs);
        }
        if let Some(dir) = get(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let config = ProviderConfig {
            api_key: self.api_key.clone(),
            ..ProviderConfig::default()
        }
        .with_base_url(self.base_url.clone())
        .with_model(self.model.clone());

        match self.timeout_secs {
            Some(secs) => config.with_timeout(secs),
            None => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.timeout_secs, None);
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "fallback"),
            ("TERRAFORGE_MODEL", "gemini-2.5-pro"),
            ("TERRAFORGE_TIMEOUT_SECS", "45"),
            ("TERRAFORGE_DATA_DIR", "/tmp/tf"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("fallback"));
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.timeout_secs, Some(45));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tf"));
    }

    #[test]
    fn test_primary_key_wins_and_blank_is_unset() {
        let config =
            AppConfig::from_lookup(lookup(&[("API_KEY", "primary"), ("GEMINI_API_KEY", "fallback")])).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("primary"));

        let config = AppConfig::from_lookup(lookup(&[("API_KEY", "  ")])).unwrap();
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("TERRAFORGE_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ConfigInvalid);
    }

    #[test]
    fn test_provider_config_carries_settings() {
        let config = AppConfig {
            api_key: Some("k".into()),
            timeout_secs: Some(10),
            ..AppConfig::default()
        }
        .with_model("gemini-x");

        let provider = config.provider_config();
        assert_eq!(provider.api_key.as_deref(), Some("k"));
        assert_eq!(provider.default_model.as_deref(), Some("gemini-x"));
        assert_eq!(provider.base_url.as_deref(), Some(DEFAULT_BASE_URL));
        assert_eq!(provider.timeout_secs, Some(10));
    }
}
