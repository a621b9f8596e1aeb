use siteup_core::manifest::{ManifestError, parse_manifest_str};

const PRODUCT: &str = r#"
[product]
name = "Totara"
tag_prefix = "TOTARA"
"#;

const DEFAULT_VARIANT: &str = r#"
[variant.default]
branches = [10, 20]
"#;

fn release(label: &str, requires: Option<&str>) -> String {
    let mut out = format!(
        "\n[[release]]\nlabel = \"{}\"\nversion = 100\nbranch = 10\nruntime = \"5.4\"\ndatabase = \"5.5\"\n",
        label
    );
    if let Some(requires) = requires {
        out.push_str(&format!("requires = \"{}\"\n", requires));
    }
    out
}

fn manifest_error(toml: &str) -> ManifestError {
    let err = parse_manifest_str(toml).expect_err("manifest should be rejected");
    err.downcast::<ManifestError>()
        .expect("rejection should be a ManifestError")
}

#[test]
fn chain_of_prerequisites_is_accepted() {
    let toml = format!(
        "{}{}{}{}{}",
        PRODUCT,
        release("A", None),
        release("B", Some("A")),
        release("C", Some("B")),
        DEFAULT_VARIANT
    );
    let manifest = parse_manifest_str(&toml).unwrap();
    assert_eq!(manifest.releases.len(), 3);
    assert_eq!(
        manifest.release("C").unwrap().required_prior_label.as_deref(),
        Some("B")
    );
}

#[test]
fn manifest_without_releases_is_rejected() {
    let toml = format!("{}{}", PRODUCT, DEFAULT_VARIANT);
    assert_eq!(manifest_error(&toml), ManifestError::NoReleases);
}

#[test]
fn duplicate_release_is_rejected() {
    let toml = format!(
        "{}{}{}{}",
        PRODUCT,
        release("A", None),
        release("A", None),
        DEFAULT_VARIANT
    );
    assert_eq!(
        manifest_error(&toml),
        ManifestError::DuplicateRelease("A".to_string())
    );
}

#[test]
fn dangling_prerequisite_is_rejected() {
    let toml = format!("{}{}{}", PRODUCT, release("B", Some("2.2.24")), DEFAULT_VARIANT);
    assert_eq!(
        manifest_error(&toml),
        ManifestError::UnknownPrerequisite {
            release: "B".to_string(),
            required: "2.2.24".to_string(),
        }
    );
}

#[test]
fn prerequisite_cycle_is_rejected() {
    let toml = format!(
        "{}{}{}{}",
        PRODUCT,
        release("A", Some("B")),
        release("B", Some("A")),
        DEFAULT_VARIANT
    );
    assert!(matches!(
        manifest_error(&toml),
        ManifestError::PrerequisiteCycle(_)
    ));
}

#[test]
fn self_prerequisite_is_a_cycle() {
    let toml = format!("{}{}{}", PRODUCT, release("A", Some("A")), DEFAULT_VARIANT);
    assert_eq!(
        manifest_error(&toml),
        ManifestError::PrerequisiteCycle("A".to_string())
    );
}

#[test]
fn unreadable_runtime_version_is_rejected() {
    let toml = format!("{}{}{}", PRODUCT, release("A", None), DEFAULT_VARIANT)
        .replace("runtime = \"5.4\"", "runtime = \"latest\"");
    assert_eq!(
        manifest_error(&toml),
        ManifestError::InvalidVersion {
            release: "A".to_string(),
            field: "runtime",
            value: "latest".to_string(),
        }
    );
}

#[test]
fn missing_default_variant_is_rejected() {
    let toml = format!(
        "{}{}\n[variant.fork]\nbranches = [10]\n",
        PRODUCT,
        release("A", None)
    );
    assert_eq!(manifest_error(&toml), ManifestError::MissingDefaultVariant);
}

#[test]
fn empty_variant_is_rejected() {
    let toml = format!(
        "{}{}{}\n[variant.fork]\nbranches = []\n",
        PRODUCT,
        release("A", None),
        DEFAULT_VARIANT
    );
    assert_eq!(
        manifest_error(&toml),
        ManifestError::EmptyVariant("fork".to_string())
    );
}

#[test]
fn product_tags_round_trip_through_branch_numbers() {
    let manifest = siteup_core::manifest::builtin().unwrap();
    let tag = manifest.product.tag(90);
    assert_eq!(tag.as_str(), "TOTARA_90_STABLE");
    assert_eq!(manifest.product.branch_number(tag.as_str()), Some(90));
    assert_eq!(manifest.product.branch_number("MOODLE_29_STABLE"), None);
}
