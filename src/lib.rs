//! AT test harness - drives assistive technology and a browser in lockstep
//!
//! This library executes accessibility test plans over the AT Driver
//! protocol: key-press commands go to the screen reader, captured speech
//! comes back as structured results.

pub mod atdriver;
pub mod browser;
pub mod cli;
pub mod common;
pub mod job;
pub mod keys;
pub mod report;
pub mod testing;

// Re-export commonly used types for tests
pub use atdriver::{AtDriverClient, Capabilities};
pub use common::{Error, Result};
pub use job::CancelableJob;
pub use keys::{map_keys, validate_command, Chord, Key, KeySequence};
pub use testing::{TestFile, TestResult, TestRunner};
