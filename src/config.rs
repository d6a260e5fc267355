//! Layered configuration: built-in defaults, then a TOML file, then
//! environment overrides.
//!
//! ```toml
//! [store]
//! db_path = "~/.campaign-kit/campaigns.db"
//! pool_size = 4
//! busy_timeout_ms = 5000
//!
//! [balance]
//! base_url = "http://localhost:8081"
//! auth_token = "..."
//! timeout_ms = 5000
//! ```

use crate::balance::BalanceConfig;
use crate::campaigns::StoreConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding `store.db_path`.
pub const ENV_DB_PATH: &str = "CAMPAIGN_KIT_DB_PATH";
/// Environment variable overriding `balance.base_url`.
pub const ENV_BALANCE_BASE_URL: &str = "BALANCE_BASE_URL";
/// Environment variable overriding `balance.auth_token`.
pub const ENV_BALANCE_AUTH_TOKEN: &str = "BALANCE_AUTH_TOKEN";
/// Environment variable overriding `balance.timeout_ms`.
pub const ENV_BALANCE_TIMEOUT_MS: &str = "BALANCE_TIMEOUT_MS";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub balance: BalanceConfig,
}

impl Config {
    /// Resolve the effective configuration.
    ///
    /// An explicit path must exist. Without one, `<config dir>/config.toml`
    /// is read when present and silently skipped otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(path) = get(ENV_DB_PATH) {
            self.store.db_path = path;
        }
        if let Some(url) = get(ENV_BALANCE_BASE_URL) {
            self.balance.base_url = url;
        }
        if let Some(token) = get(ENV_BALANCE_AUTH_TOKEN) {
            self.balance.auth_token = token;
        }
        if let Some(timeout) = get(ENV_BALANCE_TIMEOUT_MS) {
            self.balance.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("{ENV_BALANCE_TIMEOUT_MS} must be an integer, got '{timeout}'"))?;
        }
        Ok(())
    }
}

/// `<platform config dir>/config.toml`, e.g. `~/.config/campaign-kit/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "campaign-kit")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
