//! Runtime facts about the site being planned.

use std::process::Command;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Environment a resolution runs against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// Installed build-version, 0 for a fresh install
    pub current_build_version: u64,

    /// Live runtime version, e.g. "7.4.33"
    pub runtime_version: String,

    /// Database server version, `None` when unknown or unreachable
    pub database_version: Option<String>,
}

impl EnvironmentSnapshot {
    pub fn new(current_build_version: u64, runtime_version: impl Into<String>) -> Self {
        Self {
            current_build_version,
            runtime_version: runtime_version.into(),
            database_version: None,
        }
    }

    /// Set the database version. Blank strings mean "unknown".
    pub fn with_database_version(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.database_version = if version.trim().is_empty() {
            None
        } else {
            Some(version)
        };
        self
    }

    pub fn is_fresh_install(&self) -> bool {
        self.current_build_version == 0
    }
}

/// Run a probe command and return its trimmed stdout.
///
/// Used to read the live runtime version, e.g.
/// `["php", "-r", "echo PHP_VERSION;"]`.
pub fn probe_version(argv: &[String]) -> anyhow::Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("Version probe command is empty"))?;

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("Failed to run version probe: {}", program))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "Version probe '{}' exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        );
    }

    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if version.is_empty() {
        anyhow::bail!("Version probe '{}' printed nothing", program);
    }
    tracing::debug!(probe = %program, %version, "Probed runtime version");
    Ok(version)
}
