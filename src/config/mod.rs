// src/config/mod.rs - Filter configuration loaded from YAML

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::filter::dictionary::DELIMITER;
use crate::types::FilterDirection;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Environment variable overriding the configuration path
pub const CONFIG_ENV_VAR: &str = "WORDGUARD_CONFIG";

/// Settings for the content filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Sanitize inbound messages before dispatch
    pub enable_change_word: bool,

    /// Replacement used for dictionary lines that do not name one
    pub default_change_word: String,

    /// Directory holding the three dictionaries
    pub dictionary_dir: PathBuf,
    pub inbound_dictionary: String,
    pub outbound_dictionary: String,
    pub whitelist_dictionary: String,

    /// Rebuild the filter when a dictionary changes on disk
    pub hot_reload: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enable_change_word: true,
            default_change_word: "***".to_string(),
            dictionary_dir: PathBuf::from("."),
            inbound_dictionary: "sensitive_words_in.txt".to_string(),
            outbound_dictionary: "sensitive_words_out.txt".to_string(),
            whitelist_dictionary: "white.txt".to_string(),
            hot_reload: false,
        }
    }
}

impl FilterConfig {
    pub fn inbound_path(&self) -> PathBuf {
        self.dictionary_dir.join(&self.inbound_dictionary)
    }

    pub fn outbound_path(&self) -> PathBuf {
        self.dictionary_dir.join(&self.outbound_dictionary)
    }

    pub fn whitelist_path(&self) -> PathBuf {
        self.dictionary_dir.join(&self.whitelist_dictionary)
    }

    /// Blocklist dictionary used for `direction`
    pub fn blocklist_path(&self, direction: FilterDirection) -> PathBuf {
        match direction {
            FilterDirection::Inbound => self.inbound_path(),
            FilterDirection::Outbound => self.outbound_path(),
        }
    }

    /// File names of all three dictionaries
    pub fn dictionary_names(&self) -> [&str; 3] {
        [
            self.inbound_dictionary.as_str(),
            self.outbound_dictionary.as_str(),
            self.whitelist_dictionary.as_str(),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_change_word.contains(DELIMITER) {
            return Err(anyhow::anyhow!(
                "default_change_word must not contain the dictionary delimiter '{}'",
                DELIMITER
            ));
        }
        if self.default_change_word.contains(|c: char| c == '\n' || c == '\r') {
            return Err(anyhow::anyhow!("default_change_word must be a single line"));
        }
        for name in self.dictionary_names() {
            if name.trim().is_empty() {
                return Err(anyhow::anyhow!("Dictionary file names cannot be empty"));
            }
        }
        if self.default_change_word.is_empty() {
            warn!("default_change_word is empty: matches will be removed rather than masked");
        }
        Ok(())
    }
}

/// Load the configuration at `path`, writing defaults there if it is missing
pub async fn load_or_create(path: &Path) -> Result<FilterConfig> {
    if !path.exists() {
        let config = FilterConfig::default();
        let content = serde_yaml::to_string(&config)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write default config {}", path.display()))?;
        warn!("Configuration {} not found, created with defaults", path.display());
        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: FilterConfig = if content.trim().is_empty() {
        FilterConfig::default()
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?
    };

    config.validate()?;
    debug!("Loaded configuration from {}", path.display());
    info!(
        "Content filter {} (default replacement {:?})",
        if config.enable_change_word { "enabled" } else { "disabled" },
        config.default_change_word
    );
    Ok(config)
}

/// Pick the configuration path: explicit argument, then environment, then default
pub fn resolve_config_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}
