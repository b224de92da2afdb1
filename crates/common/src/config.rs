//! specretry configuration
//!
//! Loaded from an optional TOML file, then overridden from the environment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::SauceRegion;
use crate::DEFAULT_RETRIED_SPECS_KEY;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecRetryConfig {
    /// How many times the runner retries a failed spec file
    pub spec_file_retries: u32,

    /// Store key the retried-specs ledger lives under
    pub retried_specs_key: String,

    /// Compare-and-set attempts before an append gives up
    pub max_append_attempts: u32,

    /// Request timeout for HTTP clients; none by default
    pub http_timeout_secs: Option<u64>,

    /// Shared store configuration
    pub store: StoreConfig,

    /// Job reporting service configuration
    pub sauce: SauceConfig,
}

impl Default for SpecRetryConfig {
    fn default() -> Self {
        Self {
            spec_file_retries: 1,
            retried_specs_key: DEFAULT_RETRIED_SPECS_KEY.to_string(),
            max_append_attempts: 16,
            http_timeout_secs: None,
            store: StoreConfig::default(),
            sauce: SauceConfig::default(),
        }
    }
}

/// Shared store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Base URL clients use to reach the store service
    pub url: String,

    /// Address the store service binds to
    pub listen: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:7676".to_string(),
            listen: "127.0.0.1:7676".to_string(),
        }
    }
}

/// Job reporting service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SauceConfig {
    pub username: Option<String>,

    pub access_key: Option<String>,

    pub region: SauceRegion,

    /// Overrides the region's API base URL
    pub api_url: Option<String>,
}

impl SauceConfig {
    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or_else(|| self.region.api_base_url())
    }
}

impl SpecRetryConfig {
    /// Load configuration from file, falling back to defaults when it is missing
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from an optional file, apply environment overrides and validate
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("SPECRETRY_SPEC_FILE_RETRIES") {
            self.spec_file_retries = v.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("SPECRETRY_SPEC_FILE_RETRIES is not a number: {}", v))
            })?;
        }
        if let Some(v) = non_empty("SPECRETRY_STORE_URL") {
            self.store.url = v;
        }
        if let Some(v) = non_empty("SPECRETRY_STORE_LISTEN") {
            self.store.listen = v;
        }
        if let Some(v) = non_empty("SAUCE_USERNAME") {
            self.sauce.username = Some(v);
        }
        if let Some(v) = non_empty("SAUCE_ACCESS_KEY") {
            self.sauce.access_key = Some(v);
        }
        if let Some(v) = non_empty("REGION") {
            self.sauce.region = v.parse().map_err(Error::InvalidConfig)?;
        }
        if let Some(v) = non_empty("SAUCE_API_URL") {
            self.sauce.api_url = Some(v);
        }
        Ok(())
    }

    /// Reject values the reconciler cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.retried_specs_key.trim().is_empty() {
            return Err(Error::InvalidConfig("retried_specs_key must not be empty".into()));
        }
        if self.max_append_attempts == 0 {
            return Err(Error::InvalidConfig("max_append_attempts must be at least 1".into()));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout_secs.map(Duration::from_secs)
    }
}
