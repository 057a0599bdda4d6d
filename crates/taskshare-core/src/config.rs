//! Application configuration management.
//!
//! Holds the backend location and cache tuning.
//! Configuration is stored at `~/.config/taskshare/config.json`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheSettings, DEFAULT_TTL_MINUTES};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "taskshare";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    /// Freshness window for persisted member lists, in seconds.
    pub members_ttl_secs: Option<u64>,
    /// Cap on groups whose members are held in memory.
    pub max_cached_groups: Option<usize>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn cache_settings(&self) -> CacheSettings {
        let ttl = self
            .members_ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(Duration::seconds)
            .unwrap_or_else(|| Duration::minutes(DEFAULT_TTL_MINUTES));

        CacheSettings {
            ttl,
            max_groups: self.max_cached_groups,
        }
    }
}
