use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, ReelcutError};
use crate::media::{MediaCommandBuilder, ToolRunner};
use crate::scratch::Scratch;

/// Normalized description of a media file.
///
/// Stream fields come from the first video stream and stay `None` when the
/// file has none. `format_name` and `size` always come from the container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub codec_name: Option<String>,
    pub codec_long_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Frame rate ratio as reported, e.g. `30000/1001`
    pub frame_rate: Option<String>,
    pub bit_rate: Option<u64>,
    pub frame_count: Option<u64>,
    /// Seconds
    pub duration: Option<f64>,
    pub format_name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
}

impl MediaMetadata {
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width?, self.height?))
    }

    pub fn with_mimetype<S: Into<String>>(mut self, mimetype: S) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }
}

// Raw ffprobe output. Only the fields we copy are declared; numeric fields
// are `Value` because ffprobe emits them as numbers or strings depending on
// the field and the version.
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    streams: Vec<ProbeStream>,
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    codec_long_name: Option<String>,
    width: Option<Value>,
    height: Option<Value>,
    r_frame_rate: Option<String>,
    bit_rate: Option<Value>,
    nb_frames: Option<Value>,
    duration: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: String,
    size: Value,
    duration: Option<Value>,
}

/// Parse `ffprobe -print_format json -show_streams -show_format` output
pub fn parse_probe_output(stdout: &[u8]) -> Result<MediaMetadata> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| ReelcutError::MalformedOutput(format!("ffprobe output is not usable JSON: {}", e)))?;

    let size = coerce_u64(&probe.format.size).ok_or_else(|| {
        ReelcutError::MalformedOutput(format!("format.size is not an integer: {}", probe.format.size))
    })?;

    let video = probe
        .streams
        .into_iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"));

    let mut metadata = MediaMetadata {
        format_name: probe.format.format_name,
        size,
        ..MediaMetadata::default()
    };

    if let Some(stream) = video {
        metadata.codec_name = stream.codec_name;
        metadata.codec_long_name = stream.codec_long_name;
        metadata.width = stream.width.as_ref().and_then(coerce_u32);
        metadata.height = stream.height.as_ref().and_then(coerce_u32);
        metadata.frame_rate = stream.r_frame_rate;
        metadata.bit_rate = stream.bit_rate.as_ref().and_then(coerce_u64);
        metadata.frame_count = stream.nb_frames.as_ref().and_then(coerce_u64);
        metadata.duration = stream.duration.as_ref().and_then(coerce_f64);
    }

    // some containers only carry duration at the format level
    if metadata.duration.is_none() {
        metadata.duration = probe.format.duration.as_ref().and_then(coerce_f64);
    }

    Ok(metadata)
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite() && *v >= 0.0).map(|v| v as u64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .map(|v| v as u64)
            })
        }
        _ => None,
    }
}

fn coerce_u32(value: &Value) -> Option<u32> {
    coerce_u64(value).and_then(|v| u32::try_from(v).ok())
}

/// Runs ffprobe and normalizes what it reports
#[derive(Clone)]
pub struct MetadataExtractor {
    runner: Arc<dyn ToolRunner>,
    command_builder: Arc<MediaCommandBuilder>,
    scratch_root: Option<PathBuf>,
}

impl MetadataExtractor {
    pub fn new(runner: Arc<dyn ToolRunner>, config: &Config) -> Self {
        Self {
            runner,
            command_builder: Arc::new(MediaCommandBuilder::new(
                &config.media.ffmpeg_path,
                &config.media.ffprobe_path,
            )),
            scratch_root: config.scratch.root.clone(),
        }
    }

    /// Inspect a file already on disk
    pub fn extract<P: AsRef<Path>>(&self, path: P) -> Result<MediaMetadata> {
        let path = path.as_ref();
        debug!("Extracting metadata from {}", path.display());

        let command = self.command_builder.probe(path);
        let stdout = self.runner.run(&command)?;
        let metadata = parse_probe_output(&stdout)?;

        info!(
            "Probed {}: {} {}x{} {:.3}s",
            path.display(),
            metadata.format_name,
            metadata.width.unwrap_or(0),
            metadata.height.unwrap_or(0),
            metadata.duration.unwrap_or(0.0)
        );
        Ok(metadata)
    }

    /// Inspect a byte stream by copying it to scratch first
    pub fn extract_from_reader<R: Read + ?Sized>(&self, reader: &mut R, filename: &str) -> Result<MediaMetadata> {
        let scratch = Scratch::new(self.scratch_root.as_deref(), "reelcut_probe")?;
        let input = scratch.materialize(reader, filename)?;
        let metadata = self.extract(input.path());
        drop(input);
        scratch.close();
        metadata
    }
}
