//! Test plan file types
//!
//! Defines the data structures for deserializing collected-test JSON
//! documents: per-test info and target, the authored commands with their
//! keypress ids, and the assertions scored against each command.

use serde::Deserialize;
use std::path::Path;

use crate::common::{Error, Result};

/// A complete test loaded from a collected-test JSON file
#[derive(Deserialize, Debug, Clone)]
pub struct TestFile {
    /// Test identity and presentation metadata
    pub info: TestInfo,
    /// Where and how the test runs
    pub target: TargetConfig,
    /// The keystroke commands to execute, in order
    #[serde(default)]
    pub commands: Vec<Command>,
    /// Assertions scored once per command
    #[serde(default)]
    pub assertions: Vec<Assertion>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TestInfo {
    pub test_id: String,
    #[serde(default)]
    pub presentation_number: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Reference page path, resolved against the serving base URL
    pub reference_page: String,
    /// Legacy reading/interaction mode, consulted when a command carries
    /// no explicit settings
    #[serde(default)]
    pub mode: Option<String>,
}

/// Input keystroke specification for one command
#[derive(Deserialize, Debug, Clone)]
pub struct Command {
    pub id: String,
    /// Human-readable keystroke description
    #[serde(default)]
    pub keystroke: String,
    /// Raw keypress ids, possibly containing `_`/`+` joiners
    #[serde(default)]
    pub keypresses: Vec<Keypress>,
    /// Per-command AT settings (e.g. "browseMode"), overriding the test
    /// target's mode
    #[serde(default)]
    pub settings: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Keypress {
    pub id: String,
    #[serde(default)]
    pub keystroke: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Assertion {
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(alias = "assertionStatement")]
    pub expectation: String,
}

/// File name suffix of collected tests inside a plan directory
const COLLECTED_SUFFIX: &str = ".collected.json";

/// Load a plan: a single JSON file, or every `*.collected.json` in a
/// directory, sorted by file name for a stable execution order.
pub fn load_plan(path: &Path) -> Result<Vec<TestFile>> {
    if path.is_dir() {
        let mut files: Vec<_> = std::fs::read_dir(path)
            .map_err(|e| Error::file_read(path, &e))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|entry| {
                entry
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(COLLECTED_SUFFIX))
            })
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(Error::Config(format!(
                "No '*{}' files found in '{}'",
                COLLECTED_SUFFIX,
                path.display()
            )));
        }

        files.iter().map(|file| load_test(file)).collect()
    } else {
        Ok(vec![load_test(path)?])
    }
}

fn load_test(path: &Path) -> Result<TestFile> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, &e))?;
    serde_json::from_str(&content).map_err(|e| Error::PlanParse {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}
