// Process-facing layer for ffmpeg and ffprobe
//
// - Commands: typed builders for every engine and inspector invocation
// - Processor: the runner that launches them, plus availability checks

pub mod commands;
pub mod processor;

pub use commands::*;
pub use processor::*;

use crate::error::Result;

/// Launches a built command and returns its stdout.
///
/// Every external process the crate starts goes through this trait, so tests
/// can substitute a mock that writes the expected output files or fails.
#[cfg_attr(test, mockall::automock)]
pub trait ToolRunner: Send + Sync {
    /// Run to completion; a non-zero exit is `ReelcutError::ExternalTool`
    fn run(&self, command: &MediaCommand) -> Result<Vec<u8>>;
}
