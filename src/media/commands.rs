use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

use crate::error::{Result, ReelcutError};

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    /// Files the command is expected to write, in argument order
    pub outputs: Vec<PathBuf>,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            outputs: Vec::new(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.outputs.push(path.as_ref().to_path_buf());
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Only report errors on stderr
    pub fn log_errors_only(self) -> Self {
        self.arg("-v").arg("error")
    }

    /// Seek to a position in seconds
    pub fn seek(self, seconds: f64) -> Self {
        self.arg("-ss").arg(seconds.to_string())
    }

    /// Limit the output duration in seconds
    pub fn duration(self, seconds: f64) -> Self {
        self.arg("-t").arg(seconds.to_string())
    }

    /// Copy every stream without re-encoding
    pub fn stream_copy(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Add video filter graph
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-filter:v").arg(filter)
    }

    /// Set encoder preset
    pub fn preset<S: Into<String>>(self, preset: S) -> Self {
        self.arg("-preset").arg(preset)
    }

    /// Set encoder thread count
    pub fn threads(self, threads: u32) -> Self {
        self.arg("-threads").arg(threads.to_string())
    }

    /// Bound the muxing queue so inputs with many streams do not stall
    pub fn max_muxing_queue_size(self, size: u32) -> Self {
        self.arg("-max_muxing_queue_size").arg(size.to_string())
    }

    /// Allow experimental encoders
    pub fn strict_experimental(self) -> Self {
        self.arg("-strict").arg("-2")
    }

    /// Decode up to the exact seek position instead of the nearest keyframe
    pub fn accurate_seek(self) -> Self {
        self.arg("-accurate_seek")
    }

    /// Emit a single video frame
    pub fn single_frame(self) -> Self {
        self.arg("-vframes").arg("1")
    }

    /// Map the first video stream of the given input
    pub fn map_video(self, input_index: usize) -> Self {
        self.arg("-map").arg(format!("{}:v:0", input_index))
    }

    /// Program name used in logs and errors
    pub fn tool_name(&self) -> String {
        Path::new(&self.binary_path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.binary_path.clone())
    }

    /// Execute the command, blocking until the process exits
    pub fn execute(&self) -> Result<Output> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);

        let output = cmd.output().map_err(|e| ReelcutError::ExternalTool {
            tool: self.tool_name(),
            code: None,
            stderr: format!("Failed to execute {}: {}", self.binary_path, e),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReelcutError::ExternalTool {
                tool: self.tool_name(),
                code: output.status.code(),
                stderr: format!("{} failed: {}", self.description, stderr.trim()),
            });
        }

        Ok(output)
    }
}

/// Builder for the engine and inspector invocations
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    fn ffmpeg<S: Into<String>>(&self, description: S) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, description)
            .log_errors_only()
            .overwrite()
    }

    /// Build stream and format inspection command
    pub fn probe<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Media inspection")
            .log_errors_only()
            .args(["-print_format", "json", "-show_streams", "-show_format"])
            .arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Build stream-copy trim command
    pub fn cut<P: AsRef<Path>>(&self, input: P, output: P, start: f64, length: f64) -> MediaCommand {
        self.ffmpeg(format!("Cut ({}s from {}s)", length, start))
            .input(input)
            .seek(start)
            .duration(length)
            .stream_copy()
            .output(output)
    }

    /// Build re-encoding filter graph command
    pub fn filter<P: AsRef<Path>>(
        &self,
        input: P,
        output: P,
        expression: &str,
        policy: &EncodingPolicy,
    ) -> MediaCommand {
        self.ffmpeg(format!("Filter graph ({})", expression))
            .input(input)
            .video_filter(expression)
            .max_muxing_queue_size(policy.max_muxing_queue_size)
            .threads(policy.threads)
            .preset(policy.preset.clone())
            .strict_experimental()
            .copy_audio()
            .output(output)
    }

    /// Build single frame capture command
    pub fn capture_frame<P: AsRef<Path>>(&self, input: P, position: f64, output: P) -> MediaCommand {
        self.ffmpeg(format!("Frame capture at {}s", position))
            .accurate_seek()
            .input(input)
            .seek(position)
            .single_frame()
            .output(output)
    }

    /// Build a single invocation emitting one numbered frame per position.
    /// Frame `i` is written to `outputs[i]`.
    pub fn capture_frames<P: AsRef<Path>>(
        &self,
        input: P,
        positions: &[f64],
        outputs: &[PathBuf],
    ) -> MediaCommand {
        let mut cmd = self.ffmpeg(format!("Timeline capture of {} frames", positions.len()));
        for position in positions {
            cmd = cmd.seek(*position).input(input.as_ref());
        }
        for (index, output) in outputs.iter().enumerate() {
            cmd = cmd.map_video(index).single_frame().output(output);
        }
        cmd
    }

    /// Build version check command for ffmpeg
    pub fn ffmpeg_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Version check").arg("-version")
    }

    /// Build version check command for ffprobe
    pub fn ffprobe_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Version check").arg("-version")
    }
}

/// Re-encoding knobs applied to the filter stage
#[derive(Debug, Clone)]
pub struct EncodingPolicy {
    pub preset: String,
    pub threads: u32,
    pub max_muxing_queue_size: u32,
}

impl From<&crate::config::EncodingConfig> for EncodingPolicy {
    fn from(config: &crate::config::EncodingConfig) -> Self {
        Self {
            preset: config.preset.clone(),
            threads: config.threads,
            max_muxing_queue_size: config.max_muxing_queue_size,
        }
    }
}
