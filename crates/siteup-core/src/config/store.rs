//! Config store for loading and saving siteup.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::SiteupConfig;

pub const CONFIG_FILE_NAME: &str = "siteup.toml";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store at `<config_dir>/siteup/siteup.toml`
    pub fn from_default_location() -> anyhow::Result<Self> {
        let global_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("siteup");
        Ok(Self::from_dir(&global_dir))
    }

    pub fn from_dir(dir: &Path) -> Self {
        Self::from_path(dir.join(CONFIG_FILE_NAME))
    }

    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> anyhow::Result<SiteupConfig> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No settings file, using defaults");
            return Ok(SiteupConfig::default());
        }
        let content = std::fs::read_to_string(&self.config_path).with_context(|| {
            format!(
                "Failed to read config file: {}",
                self.config_path.display()
            )
        })?;
        SiteupConfig::from_toml_str(&content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })
    }

    pub fn save(&self, config: &SiteupConfig) -> anyhow::Result<()> {
        let content = config.to_toml()?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
