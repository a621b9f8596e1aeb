//! TOML manifest parser with helpful error messages

use std::path::Path;

use anyhow::{Context, Result};

use super::ReleaseManifest;

const BUILTIN_MANIFEST: &str = include_str!("../../manifests/builtin.toml");

/// The manifest shipped with the library.
pub fn builtin() -> Result<ReleaseManifest> {
    parse_manifest_str(BUILTIN_MANIFEST).context("Built-in release manifest is invalid")
}

/// Load and validate a manifest file
pub fn load_manifest(path: &Path) -> Result<ReleaseManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;

    parse_manifest_str(&content)
        .with_context(|| format!("Failed to load manifest file: {}", path.display()))
}

/// Parse and validate manifest content from a string
pub fn parse_manifest_str(content: &str) -> Result<ReleaseManifest> {
    let manifest: ReleaseManifest =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    manifest.validate()?;

    tracing::debug!(
        product = %manifest.product.name,
        releases = manifest.releases.len(),
        variants = manifest.variants.len(),
        "Loaded release manifest"
    );

    Ok(manifest)
}

/// Serialize a manifest back to TOML
pub fn to_toml(manifest: &ReleaseManifest) -> Result<String> {
    toml::to_string_pretty(manifest).with_context(|| "Failed to serialize manifest to TOML")
}

/// Enhance TOML parsing errors with the failing line and its neighbours
pub(crate) fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    let line_num = error
        .span()
        .map(|span| content[..span.start.min(content.len())].matches('\n').count() + 1);

    match line_num {
        Some(line_num) => anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            get_line_context(content, line_num),
            error_msg
        ),
        None => anyhow::anyhow!("TOML parsing error: {}", error_msg),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    lines[start.min(end)..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[product]
name = "Totara"
tag_prefix = "TOTARA"

[[release]]
label = "A"
version = 100
branch = 10
runtime = "5.0"
database = "5.0"

[variant.default]
branches = [10]
"#;

    #[test]
    fn test_parse_minimal_manifest() {
        let manifest = parse_manifest_str(MINIMAL).unwrap();
        assert_eq!(manifest.product.tag_suffix, "STABLE");
        assert_eq!(manifest.product.runtime, "PHP");
        assert_eq!(manifest.product.database, "MySQL");
        assert_eq!(manifest.releases.len(), 1);
        assert_eq!(manifest.releases[0].min_required_version, 100);
        assert_eq!(manifest.releases[0].required_prior_label, None);
        assert_eq!(manifest.variants["default"].codebase, "");
    }

    #[test]
    fn test_builtin_manifest_is_valid() {
        let manifest = builtin().unwrap();
        assert_eq!(manifest.product.name, "Totara");
        assert!(manifest.default_variant().is_some());
        assert!(manifest.release("EVERGREEN").is_some());
    }

    #[test]
    fn test_release_order_is_preserved() {
        let manifest = builtin().unwrap();
        let labels: Vec<&str> = manifest.releases.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["2.2.24", "2.9.20", "9.8", "EVERGREEN"]);
    }

    #[test]
    fn test_dangling_prerequisite_rejected() {
        let toml = MINIMAL.replace("database = \"5.0\"", "database = \"5.0\"\nrequires = \"Z\"");
        let err = parse_manifest_str(&toml).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ManifestError>(),
            Some(&ManifestError::UnknownPrerequisite {
                release: "A".to_string(),
                required: "Z".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_toml_reports_line() {
        let toml = "[product\nname = \"x\"";
        let err = parse_manifest_str(toml).unwrap_err().to_string();
        assert!(err.contains("TOML parsing error"));
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let original = builtin().unwrap();
        let text = to_toml(&original).unwrap();
        let parsed = parse_manifest_str(&text).unwrap();
        assert_eq!(parsed.releases, original.releases);
        assert_eq!(parsed.variants, original.variants);
        assert_eq!(parsed.product, original.product);
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", MINIMAL).unwrap();

        let manifest = load_manifest(temp_file.path()).unwrap();
        assert_eq!(manifest.releases[0].label, "A");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = load_manifest(Path::new("/nonexistent/path/releases.toml"));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read manifest file")
        );
    }

    #[test]
    fn test_line_context_marks_failing_line() {
        let context = get_line_context("a\nb\nc\nd", 2);
        assert!(context.contains(">>>    2 | b"));
        assert!(context.contains("      1 | a"));
    }
}
