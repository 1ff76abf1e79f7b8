use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::{Result, ReelcutError};
use super::{MediaCommandBuilder, ToolRunner, MediaCommand};

/// Runs commands as real child processes (ffmpeg/ffprobe on PATH or configured)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &MediaCommand) -> Result<Vec<u8>> {
        command.execute().map(|output| output.stdout)
    }
}

/// Availability and version checks for the configured binaries
pub struct ToolCheck<'a> {
    runner: &'a dyn ToolRunner,
    command_builder: MediaCommandBuilder,
}

impl<'a> ToolCheck<'a> {
    pub fn new(runner: &'a dyn ToolRunner, config: &MediaConfig) -> Self {
        Self {
            runner,
            command_builder: MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path),
        }
    }

    /// Check that both ffmpeg and ffprobe can be launched
    pub fn check_availability(&self) -> Result<()> {
        self.version_info(&self.command_builder.ffmpeg_version())?;
        self.version_info(&self.command_builder.ffprobe_version())?;
        info!("ffmpeg and ffprobe are available");
        Ok(())
    }

    /// First line of `ffmpeg -version`
    pub fn ffmpeg_version(&self) -> Result<String> {
        self.version_info(&self.command_builder.ffmpeg_version())
    }

    /// First line of `ffprobe -version`
    pub fn ffprobe_version(&self) -> Result<String> {
        self.version_info(&self.command_builder.ffprobe_version())
    }

    fn version_info(&self, command: &MediaCommand) -> Result<String> {
        debug!("Getting {} version information", command.tool_name());

        let stdout = self.runner.run(command)?;
        let version_info = String::from_utf8_lossy(&stdout);
        version_info
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .ok_or_else(|| ReelcutError::MalformedOutput(format!(
                "{} printed no version information",
                command.tool_name()
            )))
    }
}
