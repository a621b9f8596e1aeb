//! Line classifier for helper output.
//!
//! Matchers run in a fixed order and the first hit wins. A "done!" line may
//! also mention a plugin name, so success must be checked before the plugin
//! and progress patterns get a chance to misfire.

use std::sync::LazyLock;

use regex::Regex;

use super::{HelperEvent, ProgressStage};

static DATABASE_PROGRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-->(.*)$").unwrap());

static DEFECTIVE_PLUGIN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Plugin (.*) is defective").unwrap());

static DOWNGRADE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Cannot downgrade (.*) from (\d+) to (\d+)\.").unwrap());

static STEP_PROGRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">>> ([A-Za-z0-9_ ]+)").unwrap());

const SUCCESS_MARKERS: [&str; 2] = ["++ Success ++", "... done!"];

type Matcher = fn(&str) -> Option<HelperEvent>;

/// Matchers in priority order
const MATCHERS: [Matcher; 5] = [
    match_database_progress,
    match_success,
    match_defective_plugin,
    match_downgrade,
    match_step_progress,
];

/// Classify one line of helper output.
///
/// Surrounding whitespace is ignored. Never fails: lines no matcher
/// recognises become [`HelperEvent::Debug`] when `debug` is set and
/// [`HelperEvent::Unclassified`] otherwise.
pub fn classify(raw_line: &str, debug: bool) -> HelperEvent {
    let line = raw_line.trim();

    MATCHERS
        .iter()
        .find_map(|matcher| matcher(line))
        .unwrap_or_else(|| {
            if debug {
                HelperEvent::Debug(line.to_string())
            } else {
                HelperEvent::Unclassified(line.to_string())
            }
        })
}

fn match_database_progress(line: &str) -> Option<HelperEvent> {
    let caps = DATABASE_PROGRESS_REGEX.captures(line)?;
    let mut label = caps[1].trim().to_lowercase();

    // The helper calls the core schema "system"
    if label == "system" {
        label = "core tables".to_string();
    }

    Some(HelperEvent::Progress {
        label,
        stage: ProgressStage::Database,
    })
}

fn match_success(line: &str) -> Option<HelperEvent> {
    SUCCESS_MARKERS
        .iter()
        .any(|marker| line.contains(marker))
        .then_some(HelperEvent::Success)
}

fn match_defective_plugin(line: &str) -> Option<HelperEvent> {
    let caps = DEFECTIVE_PLUGIN_REGEX.captures(line)?;
    Some(HelperEvent::Warning(format!(
        "Plugin {} upgrade failed.",
        &caps[1]
    )))
}

fn match_downgrade(line: &str) -> Option<HelperEvent> {
    let caps = DOWNGRADE_REGEX.captures(line)?;
    let (plugin, db_version, code_version) = (&caps[1], &caps[2], &caps[3]);
    Some(HelperEvent::FatalError(format!(
        "Plugin {} version ({}) is lower than database version ({})",
        plugin, code_version, db_version
    )))
}

fn match_step_progress(line: &str) -> Option<HelperEvent> {
    let caps = STEP_PROGRESS_REGEX.captures(line)?;
    Some(HelperEvent::Progress {
        label: caps[1].to_string(),
        stage: ProgressStage::Step,
    })
}
