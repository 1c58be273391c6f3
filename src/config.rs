use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

/// Used when neither the CLI, the environment nor the config file name an endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:5678/webhook/chat";

/// Environment override for the responder endpoint
pub const ENDPOINT_ENV: &str = "RELAY_ENDPOINT";

/// File name of the TUI-mode log, kept next to the config file
pub const LOG_FILE: &str = "relay.log";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// CLI flag, then environment, then config file, then the built-in default.
    pub fn resolve_endpoint(&self, cli: Option<&str>, env: Option<&str>) -> String {
        [cli, env, self.endpoint.as_deref()]
            .into_iter()
            .flatten()
            .find(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
            .to_string()
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("relay-chat"))
    }

    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn open_log() -> Result<File> {
        open_log_in(&Self::config_dir()?)
    }
}

/// Open `dir/relay.log` for appending, creating the directory if needed
pub fn open_log_in(dir: &Path) -> Result<File> {
    let path = dir.join(LOG_FILE);
    fs::create_dir_all(dir)
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&path))
        .with_context(|| format!("cannot open log file {}", path.display()))
}
