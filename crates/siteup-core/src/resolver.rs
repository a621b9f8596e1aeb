//! Release compatibility resolution.
//!
//! Decides which branches a site may install or upgrade to, given the release
//! manifest and the site's current environment. Incompatibilities never fail
//! the call: they narrow the admissible range and are reported as warnings.
//!
//! ## Algorithm
//!
//! 1. Pick the candidate variants (all, one named, or `default` when the name
//!    is unknown).
//! 2. Start with the `default` variant's branch range as `[minimum, maximum]`,
//!    with the requested minimum as a lower bound. A single selected variant
//!    uses its own range instead, which replaces the requested minimum.
//! 3. Walk the releases in declaration order. Every release the site has
//!    already reached raises `minimum` to its branch. The first release whose
//!    prerequisite, runtime or database requirement fails caps `maximum` at
//!    the last release that passed and ends the walk.
//! 4. Filter each candidate variant's branches to `[minimum, maximum]`.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::environment::EnvironmentSnapshot;
use crate::manifest::{BranchVariant, DEFAULT_VARIANT, ReleaseManifest, ReleaseRecord};
use crate::version::{self, BranchTag};

/// What the caller asks the resolver for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveRequest {
    /// Variant to resolve; `None` resolves every variant
    pub variant: Option<String>,

    /// Lowest branch the caller is willing to consider. Ignored when a single
    /// variant is resolved.
    pub minimum: u32,
}

impl ResolveRequest {
    /// Resolve every variant in the manifest
    pub fn all() -> Self {
        Self::default()
    }

    /// Resolve a single variant. Unknown names fall back to `default`.
    pub fn variant(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            variant: (!name.is_empty()).then_some(name),
            minimum: 0,
        }
    }

    pub fn with_minimum(mut self, minimum: u32) -> Self {
        self.minimum = minimum;
        self
    }
}

/// Why a release could not be offered
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionWarning {
    /// The site has not reached the release's named prerequisite
    PrerequisiteNotMet {
        product: String,
        release: String,
        required: String,
    },

    RuntimeTooLow {
        product: String,
        runtime: String,
        release: String,
        actual: String,
        minimum: String,
    },

    DatabaseTooLow {
        product: String,
        database: String,
        release: String,
        actual: String,
        minimum: String,
    },
}

impl ResolutionWarning {
    /// Label of the release that tripped this warning
    pub fn release(&self) -> &str {
        match self {
            Self::PrerequisiteNotMet { release, .. }
            | Self::RuntimeTooLow { release, .. }
            | Self::DatabaseTooLow { release, .. } => release,
        }
    }
}

impl fmt::Display for ResolutionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrerequisiteNotMet {
                product, required, ..
            } => write!(
                f,
                "You must upgrade to {} before you can upgrade to a higher version of {}",
                required, product
            ),
            Self::RuntimeTooLow {
                product,
                runtime,
                release,
                actual,
                ..
            } => write!(
                f,
                "{} version ({}) is too low to install {} {} or later.",
                runtime, actual, product, release
            ),
            Self::DatabaseTooLow {
                product,
                database,
                release,
                actual,
                ..
            } => write!(
                f,
                "{} Version ({}) is too low to install {} {} or later.",
                database, actual, product, release
            ),
        }
    }
}

/// Outcome of a resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionResult {
    /// Admissible branch tags per variant, in each variant's declared order
    pub available: BTreeMap<String, Vec<BranchTag>>,

    pub warnings: Vec<ResolutionWarning>,

    /// Final branch floor
    pub minimum: u32,

    /// Final branch ceiling; `None` when no release passed its checks
    pub maximum: Option<u32>,

    /// Release at which the walk stopped, if any check failed
    pub stopped_at: Option<String>,
}

impl ResolutionResult {
    /// Tags offered for a variant
    pub fn tags(&self, variant: &str) -> &[BranchTag] {
        self.available
            .get(variant)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Highest admissible branch for a variant, the natural automatic target
    pub fn newest(&self, variant: &str) -> Option<&BranchTag> {
        self.tags(variant).iter().max_by_key(|tag| tag.number())
    }

    /// True when no variant offers any branch
    pub fn is_empty(&self) -> bool {
        self.available.values().all(Vec::is_empty)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Compute the admissible branches for a site.
pub fn resolve(
    manifest: &ReleaseManifest,
    env: &EnvironmentSnapshot,
    request: &ResolveRequest,
) -> ResolutionResult {
    let candidates = select_variants(manifest, request.variant.as_deref());

    let default = manifest.default_variant();
    let mut maximum = default.and_then(BranchVariant::max_branch).unwrap_or(0);
    let mut minimum = request
        .minimum
        .max(default.and_then(BranchVariant::min_branch).unwrap_or(0));

    if let [(_, only)] = candidates.as_slice() {
        maximum = only.max_branch().unwrap_or(maximum);
        minimum = only.min_branch().unwrap_or(minimum);
    }

    let walk = walk_releases(manifest, env, minimum, maximum);

    let available = candidates
        .iter()
        .map(|(name, variant)| {
            let tags: Vec<BranchTag> = variant
                .branches
                .iter()
                .copied()
                .filter(|branch| {
                    walk.maximum
                        .is_some_and(|max| walk.minimum <= *branch && *branch <= max)
                })
                .map(|branch| manifest.product.tag(branch))
                .collect();
            ((*name).clone(), tags)
        })
        .collect();

    ResolutionResult {
        available,
        warnings: walk.warnings,
        minimum: walk.minimum,
        maximum: walk.maximum,
        stopped_at: walk.stopped_at,
    }
}

fn select_variants<'a>(
    manifest: &'a ReleaseManifest,
    requested: Option<&str>,
) -> Vec<(&'a String, &'a BranchVariant)> {
    match requested {
        None | Some("") => manifest.variants.iter().collect(),
        Some(name) => match manifest.variants.get_key_value(name) {
            Some(entry) => vec![entry],
            None => {
                tracing::debug!(variant = %name, "Unknown variant, using default");
                manifest
                    .variants
                    .get_key_value(DEFAULT_VARIANT)
                    .into_iter()
                    .collect()
            }
        },
    }
}

/// Accumulated state of the manifest walk
struct Walk {
    minimum: u32,
    maximum: Option<u32>,
    warnings: Vec<ResolutionWarning>,
    stopped_at: Option<String>,
}

fn walk_releases(
    manifest: &ReleaseManifest,
    env: &EnvironmentSnapshot,
    minimum: u32,
    maximum: u32,
) -> Walk {
    let mut walk = Walk {
        minimum,
        maximum: Some(maximum),
        warnings: Vec::new(),
        stopped_at: None,
    };
    let mut last_passed: Option<u32> = None;

    for record in &manifest.releases {
        if env.current_build_version >= record.min_required_version {
            walk.minimum = walk.minimum.max(record.branch_number);
        }

        let failures = check_release(manifest, env, record);
        tracing::debug!(
            release = %record.label,
            branch = record.branch_number,
            minimum = walk.minimum,
            failures = failures.len(),
            "Checked release"
        );

        if !failures.is_empty() {
            for warning in &failures {
                tracing::warn!("{}", warning);
            }
            walk.warnings.extend(failures);
            walk.maximum = last_passed.map(|last| last.min(maximum));
            walk.stopped_at = Some(record.label.clone());
            break;
        }

        last_passed = Some(record.branch_number);
    }

    walk
}

fn check_release(
    manifest: &ReleaseManifest,
    env: &EnvironmentSnapshot,
    record: &ReleaseRecord,
) -> Vec<ResolutionWarning> {
    let product = &manifest.product;
    let mut warnings = Vec::new();

    // Prerequisites only gate upgrades, never fresh installs.
    if !env.is_fresh_install()
        && let Some(required) = record.required_prior_label.as_deref()
    {
        match manifest.release(required) {
            Some(prior) if env.current_build_version < prior.min_required_version => {
                warnings.push(ResolutionWarning::PrerequisiteNotMet {
                    product: product.name.clone(),
                    release: record.label.clone(),
                    required: required.to_string(),
                });
            }
            Some(_) => {}
            None => tracing::warn!(
                release = %record.label,
                required = %required,
                "Prerequisite missing from manifest, skipping check"
            ),
        }
    }

    if version::is_below(&env.runtime_version, &record.min_runtime_version) {
        warnings.push(ResolutionWarning::RuntimeTooLow {
            product: product.name.clone(),
            runtime: product.runtime.clone(),
            release: record.label.clone(),
            actual: env.runtime_version.clone(),
            minimum: record.min_runtime_version.clone(),
        });
    }

    if let Some(database) = env.database_version.as_deref()
        && !database.trim().is_empty()
        && version::is_below(database, &record.min_database_version)
    {
        warnings.push(ResolutionWarning::DatabaseTooLow {
            product: product.name.clone(),
            database: product.database.clone(),
            release: record.label.clone(),
            actual: database.to_string(),
            minimum: record.min_database_version.clone(),
        });
    }

    warnings
}
