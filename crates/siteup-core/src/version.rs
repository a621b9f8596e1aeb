//! Version comparison and branch tag helpers
//!
//! Runtime and database servers report versions in shapes semver rejects
//! ("5.4", "10.4.12-MariaDB-1:10.4.12+maria~bionic"). These helpers pull the
//! leading numeric components out and compare them as a semver triple, so
//! "5.10" orders after "5.9" rather than before it.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

/// Parse a runtime/database version string leniently.
///
/// Reads the leading run of dot-separated numbers, pads missing minor/patch
/// components with zero and ignores anything after the third component or
/// the first non-numeric character.
pub fn parse_loose(input: &str) -> Option<semver::Version> {
    let input = input.trim();
    let input = input.strip_prefix(['v', 'V']).unwrap_or(input);

    let numeric_len = input
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(input.len());

    let mut parts = input[..numeric_len]
        .split('.')
        .take_while(|part| !part.is_empty())
        .map(|part| part.parse::<u64>());

    let major = parts.next()?.ok()?;
    let minor = parts.next().transpose().ok()?.unwrap_or(0);
    let patch = parts.next().transpose().ok()?.unwrap_or(0);

    Some(semver::Version::new(major, minor, patch))
}

/// Compare two version strings semantically.
///
/// A string that does not parse orders below any string that does, matching
/// how the helper tooling treats garbage versions reported by a server.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_loose(a), parse_loose(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => a.trim().cmp(b.trim()),
    }
}

/// True when `actual` is strictly lower than `minimum`.
pub fn is_below(actual: &str, minimum: &str) -> bool {
    compare_versions(actual, minimum) == Ordering::Less
}

/// A stable branch tag such as `TOTARA_90_STABLE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct BranchTag {
    number: u32,
    name: String,
}

impl BranchTag {
    pub fn new(prefix: &str, number: u32, suffix: &str) -> Self {
        Self {
            number,
            name: format!("{}_{}_{}", prefix, number, suffix),
        }
    }

    /// Recover the branch number from a tag with the given prefix/suffix.
    pub fn parse(tag: &str, prefix: &str, suffix: &str) -> Option<Self> {
        let number = tag
            .trim()
            .strip_prefix(prefix)?
            .strip_prefix('_')?
            .strip_suffix(suffix)?
            .strip_suffix('_')?
            .parse::<u32>()
            .ok()?;
        Some(Self::new(prefix, number, suffix))
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BranchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<BranchTag> for String {
    fn from(tag: BranchTag) -> Self {
        tag.name
    }
}
