//! Site-level settings for siteup
//!
//! Settings live in `siteup.toml`, by default under the user's config
//! directory (`~/.config/siteup/siteup.toml` on Linux). Every key is
//! optional; a missing file means defaults.

pub mod store;

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::helper::HelperRunner;
use crate::manifest::{self, ReleaseManifest};

pub use store::ConfigStore;

/// Root structure of siteup.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteupConfig {
    /// Release manifest to use instead of the built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,

    /// Directory holding helper executables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_dir: Option<PathBuf>,

    /// Report unrecognised helper output as debug messages
    #[serde(default)]
    pub debug: bool,

    /// Command that prints the live runtime version
    #[serde(default = "default_runtime_probe")]
    pub runtime_probe: Vec<String>,
}

fn default_runtime_probe() -> Vec<String> {
    vec![
        "php".to_string(),
        "-r".to_string(),
        "echo PHP_VERSION;".to_string(),
    ]
}

impl Default for SiteupConfig {
    fn default() -> Self {
        Self {
            manifest: None,
            helper_dir: None,
            debug: false,
            runtime_probe: default_runtime_probe(),
        }
    }
}

impl SiteupConfig {
    /// Parse siteup.toml content
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SiteupConfig = toml::from_str(content)
            .map_err(|e| manifest::parser::enhance_toml_error(e, content))?;
        Ok(config)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).with_context(|| "Failed to serialize settings to TOML")
    }

    /// The configured manifest, or the built-in one.
    pub fn release_manifest(&self) -> anyhow::Result<ReleaseManifest> {
        match &self.manifest {
            Some(path) => manifest::load_manifest(path),
            None => manifest::builtin(),
        }
    }

    /// A runner for the configured helper directory.
    pub fn helper_runner(&self) -> anyhow::Result<HelperRunner> {
        let dir = self
            .helper_dir
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No helper_dir configured in siteup.toml"))?;
        Ok(HelperRunner::new(dir.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = SiteupConfig::from_toml_str("").unwrap();
        assert_eq!(config, SiteupConfig::default());
        assert_eq!(config.runtime_probe[0], "php");
    }

    #[test]
    fn test_parse_all_keys() {
        let config = SiteupConfig::from_toml_str(
            r#"
manifest = "/etc/siteup/releases.toml"
helper_dir = "/opt/siteup/helpers"
debug = true
runtime_probe = ["php82", "-r", "echo PHP_VERSION;"]
"#,
        )
        .unwrap();
        assert_eq!(
            config.manifest,
            Some(PathBuf::from("/etc/siteup/releases.toml"))
        );
        assert!(config.debug);
        assert_eq!(config.runtime_probe[0], "php82");
        assert_eq!(
            config.helper_runner().unwrap().helper_dir(),
            std::path::Path::new("/opt/siteup/helpers")
        );
    }

    #[test]
    fn test_missing_helper_dir() {
        let err = SiteupConfig::default().helper_runner().unwrap_err();
        assert!(err.to_string().contains("helper_dir"));
    }

    #[test]
    fn test_builtin_manifest_when_unset() {
        let manifest = SiteupConfig::default().release_manifest().unwrap();
        assert_eq!(manifest.product.tag_prefix, "TOTARA");
    }
}
