//! Add-in configuration
//!
//! Persisted as a small `key=value` text file with `#` comments:
//!
//! ```text
//! Service=ollama
//! ApiUrl=http://localhost:11434
//! DefaultModel=llama3
//! ```

use crate::types::Service;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const CONFIG_DIR_NAME: &str = "localai-sheets";
pub const CONFIG_FILE_NAME: &str = "LocalAI.config";

pub const ENV_SERVICE: &str = "LOCALAI_SERVICE";
pub const ENV_API_URL: &str = "LOCALAI_API_URL";
pub const ENV_MODEL: &str = "LOCALAI_MODEL";

/// Which local server to talk to, and with which model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddinConfig {
    pub service: Service,
    pub api_url: String,
    pub default_model: String,
}

impl Default for AddinConfig {
    fn default() -> Self {
        Self {
            service: Service::Ollama,
            api_url: Service::Ollama.default_url().to_string(),
            default_model: "llama3".to_string(),
        }
    }
}

impl AddinConfig {
    /// Parse config text on top of the defaults
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                debug!(line, "skipping config line without '='");
                continue;
            };
            let value = value.trim();

            match key.trim().to_ascii_lowercase().as_str() {
                "service" => match value.parse() {
                    Ok(service) => config.service = service,
                    Err(e) => warn!("{}, keeping {}", e, config.service),
                },
                "apiurl" => config.api_url = value.to_string(),
                "defaultmodel" => config.default_model = value.to_string(),
                other => debug!(key = other, "ignoring unknown config key"),
            }
        }

        config
    }

    /// Render the commented config file
    pub fn to_config_text(&self) -> String {
        format!(
            "# Local AI Add-in Configuration\n\
             # Service: ollama or lmstudio\n\
             Service={}\n\
             \n\
             # API URL for your AI service\n\
             ApiUrl={}\n\
             \n\
             # Default model to use\n\
             DefaultModel={}\n",
            self.service, self.api_url, self.default_model
        )
    }

    /// Switch service; the URL follows the service default unless given
    pub fn set_service(&mut self, service: Service, api_url: Option<String>) {
        self.service = service;
        self.api_url = api_url.unwrap_or_else(|| service.default_url().to_string());
    }

    /// Apply `LOCALAI_*` overrides from an environment lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_SERVICE) {
            match raw.parse() {
                Ok(service) => self.service = service,
                Err(e) => warn!("{}: {}", ENV_SERVICE, e),
            }
        }
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.default_model = model.trim().to_string();
        }
        self
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }
}

/// File-backed storage for [`AddinConfig`]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::from_path(dir.into().join(CONFIG_FILE_NAME))
    }

    pub fn from_default_location() -> Result<Self> {
        let mut dir = dirs::config_dir().context("failed to resolve config_dir")?;
        dir.push(CONFIG_DIR_NAME);
        Ok(Self::from_dir(dir))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the config, writing the defaults first if the file is missing
    pub fn load_or_init(&self) -> Result<AddinConfig> {
        if !self.path.exists() {
            let config = AddinConfig::default();
            self.save(&config)?;
            debug!(path = %self.path.display(), "created default config");
            return Ok(config);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        Ok(AddinConfig::parse(&raw))
    }

    pub fn save(&self, config: &AddinConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        fs::write(&self.path, config.to_config_text())
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}
