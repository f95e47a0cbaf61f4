use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub curation: CurationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// When true, saving an image that is already stored is a silent no-op
    /// instead of inserting a duplicate row.
    #[serde(default = "default_dedupe_images")]
    pub dedupe_images: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dedupe_images: default_dedupe_images(),
        }
    }
}

fn default_dedupe_images() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct CurationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.curation.model.trim().is_empty() {
        anyhow::bail!("curation.model must not be empty");
    }

    if config.curation.timeout_secs == 0 {
        anyhow::bail!("curation.timeout_secs must be > 0");
    }

    Ok(config)
}
