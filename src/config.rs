use crate::error::{LoaderError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub targeting: TargetingConfig,
    #[serde(default)]
    pub load: LoadConfig,
}

#[derive(Debug, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "default_events_path")]
    pub events: PathBuf,
    #[serde(default = "default_users_path")]
    pub users: PathBuf,
    #[serde(default = "default_campaigns_path")]
    pub campaigns: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct TargetingConfig {
    /// Closed country vocabulary for descriptor parsing.
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// How many structured skip reasons to retain for the run summary.
    /// Skips beyond this limit are still counted.
    #[serde(default = "default_max_skip_reasons")]
    pub max_skip_reasons: usize,
    /// What to do when the batch names campaigns that already exist in the
    /// store. Campaigns have no natural key, so re-running the loader in
    /// `append` mode creates a fresh row per source row every time.
    #[serde(default)]
    pub on_existing_campaigns: ReloadPolicy,
}

/// Policy for a batch whose campaign names already exist in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPolicy {
    /// Each run is a new batch; always insert fresh Campaign rows.
    #[default]
    Append,
    /// Refuse to load when any campaign name from the batch is already present.
    Abort,
}

fn default_events_path() -> PathBuf {
    PathBuf::from("data/ad_events.csv")
}

fn default_users_path() -> PathBuf {
    PathBuf::from("data/users.csv")
}

fn default_campaigns_path() -> PathBuf {
    PathBuf::from("data/campaigns.csv")
}

fn default_store_path() -> PathBuf {
    PathBuf::from("ad_analytics.db")
}

fn default_countries() -> Vec<String> {
    ["USA", "UK", "Germany", "India", "Australia"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_skip_reasons() -> usize {
    20
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            events: default_events_path(),
            users: default_users_path(),
            campaigns: default_campaigns_path(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            countries: default_countries(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_skip_reasons: default_max_skip_reasons(),
            on_existing_campaigns: ReloadPolicy::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the given TOML file. A missing file is not an
    /// error; the built-in defaults apply.
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            LoaderError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}
