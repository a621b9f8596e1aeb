//! Release manifest: the static table of known releases and branch variants
//!
//! A manifest is loaded once at startup and never mutated. Validation runs at
//! load time so that [`crate::resolver::resolve`] can treat every manifest it
//! sees as well-formed.

pub mod parser;

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::version::{self, BranchTag};

pub use parser::{builtin, load_manifest, parse_manifest_str, to_toml};

/// Name of the variant every manifest must declare.
pub const DEFAULT_VARIANT: &str = "default";

/// Root structure of a manifest file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub product: ProductInfo,

    /// Releases in chronological order
    #[serde(default, rename = "release")]
    pub releases: Vec<ReleaseRecord>,

    /// Branch variants keyed by name
    #[serde(default, rename = "variant")]
    pub variants: BTreeMap<String, BranchVariant>,
}

/// Naming used for tags and user-facing warnings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInfo {
    /// Display name, e.g. "Totara"
    pub name: String,

    /// Branch tag prefix, e.g. "TOTARA"
    pub tag_prefix: String,

    #[serde(default = "default_tag_suffix")]
    pub tag_suffix: String,

    /// Runtime display name used in warnings
    #[serde(default = "default_runtime_name")]
    pub runtime: String,

    /// Database display name used in warnings
    #[serde(default = "default_database_name")]
    pub database: String,
}

fn default_tag_suffix() -> String {
    "STABLE".to_string()
}

fn default_runtime_name() -> String {
    "PHP".to_string()
}

fn default_database_name() -> String {
    "MySQL".to_string()
}

impl ProductInfo {
    /// Format a branch number as this product's stable tag.
    pub fn tag(&self, branch: u32) -> BranchTag {
        BranchTag::new(&self.tag_prefix, branch, &self.tag_suffix)
    }

    /// Parse one of this product's stable tags back into a branch number.
    pub fn branch_number(&self, tag: &str) -> Option<u32> {
        BranchTag::parse(tag, &self.tag_prefix, &self.tag_suffix).map(|t| t.number())
    }
}

/// One known release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Opaque release label, e.g. "9.8" or "EVERGREEN"
    pub label: String,

    /// Build-version a site must have reached to be past this release
    #[serde(rename = "version")]
    pub min_required_version: u64,

    /// Code branch this release maps to
    #[serde(rename = "branch")]
    pub branch_number: u32,

    #[serde(rename = "runtime")]
    pub min_runtime_version: String,

    #[serde(rename = "database")]
    pub min_database_version: String,

    /// Release that must already be satisfied before this one can be targeted
    #[serde(default, rename = "requires", skip_serializing_if = "Option::is_none")]
    pub required_prior_label: Option<String>,
}

/// A named product variant and the branches it offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchVariant {
    /// Selectable branch numbers, in display order
    pub branches: Vec<u32>,

    /// Where this variant's code comes from
    #[serde(default)]
    pub codebase: String,
}

impl BranchVariant {
    pub fn min_branch(&self) -> Option<u32> {
        self.branches.iter().copied().min()
    }

    pub fn max_branch(&self) -> Option<u32> {
        self.branches.iter().copied().max()
    }
}

/// Defects detected while loading a manifest
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Manifest declares no releases")]
    NoReleases,

    #[error("Release '{0}' is declared more than once")]
    DuplicateRelease(String),

    #[error("Release '{release}' requires unknown release '{required}'")]
    UnknownPrerequisite { release: String, required: String },

    #[error("Prerequisite chain starting at release '{0}' forms a cycle")]
    PrerequisiteCycle(String),

    #[error("Release '{release}' has an unreadable {field} version '{value}'")]
    InvalidVersion {
        release: String,
        field: &'static str,
        value: String,
    },

    #[error("Manifest has no 'default' variant")]
    MissingDefaultVariant,

    #[error("Variant '{0}' has no branches")]
    EmptyVariant(String),
}

impl ReleaseManifest {
    /// Check the invariants the resolver relies on.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.releases.is_empty() {
            return Err(ManifestError::NoReleases);
        }

        let mut by_label: HashMap<&str, &ReleaseRecord> = HashMap::new();
        for record in &self.releases {
            if by_label.insert(record.label.as_str(), record).is_some() {
                return Err(ManifestError::DuplicateRelease(record.label.clone()));
            }
            check_version(record, "runtime", &record.min_runtime_version)?;
            check_version(record, "database", &record.min_database_version)?;
        }

        for record in &self.releases {
            let Some(required) = &record.required_prior_label else {
                continue;
            };
            if !by_label.contains_key(required.as_str()) {
                return Err(ManifestError::UnknownPrerequisite {
                    release: record.label.clone(),
                    required: required.clone(),
                });
            }
        }

        for record in &self.releases {
            let mut seen = HashSet::new();
            let mut current = Some(record);
            while let Some(r) = current {
                if !seen.insert(r.label.as_str()) {
                    return Err(ManifestError::PrerequisiteCycle(record.label.clone()));
                }
                current = r
                    .required_prior_label
                    .as_deref()
                    .and_then(|label| by_label.get(label).copied());
            }
        }

        if !self.variants.contains_key(DEFAULT_VARIANT) {
            return Err(ManifestError::MissingDefaultVariant);
        }
        if let Some((name, _)) = self.variants.iter().find(|(_, v)| v.branches.is_empty()) {
            return Err(ManifestError::EmptyVariant(name.clone()));
        }

        Ok(())
    }

    /// Find a release by label
    pub fn release(&self, label: &str) -> Option<&ReleaseRecord> {
        self.releases.iter().find(|r| r.label == label)
    }

    /// Find a variant by name
    pub fn variant(&self, name: &str) -> Option<&BranchVariant> {
        self.variants.get(name)
    }

    /// The variant every manifest carries.
    ///
    /// Always present once [`ReleaseManifest::validate`] has passed.
    pub fn default_variant(&self) -> Option<&BranchVariant> {
        self.variants.get(DEFAULT_VARIANT)
    }
}

fn check_version(
    record: &ReleaseRecord,
    field: &'static str,
    value: &str,
) -> Result<(), ManifestError> {
    if version::parse_loose(value).is_none() {
        return Err(ManifestError::InvalidVersion {
            release: record.label.clone(),
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
