//! Test plan execution
//!
//! Loads collected-test plan files and executes them against a live AT +
//! browser pair, collecting spoken output into structured results.

pub mod collector;
pub mod plan;
pub mod runner;
pub mod settings;

pub use collector::collect_speech;
pub use plan::{load_plan, TestFile};
pub use runner::{AssertionResult, CommandOutput, TestResult, TestRunner};
pub use settings::{AtVendor, SettingsDriver};
