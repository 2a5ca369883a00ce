use crate::domain_model::HistoryLimit;
use anyhow::{Result, anyhow};
use config::{Config, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub remote: Remote,
    pub push: Push,
    #[serde(default)]
    pub messages: Messages,
    pub http: Http,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Remote {
    pub backend: String, // "fake" or "http"
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Push {
    pub backend: String, // "fake" or "kafka"
    #[serde(default)]
    pub bootstrap_servers: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Messages {
    #[serde(default = "default_history_limit")]
    pub history_limit: u16,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

impl Messages {
    pub fn history_limit(&self) -> HistoryLimit {
        HistoryLimit(self.history_limit)
    }
}

fn default_history_limit() -> u16 {
    HistoryLimit::DEFAULT.0
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
