use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, ReelcutError};

fn default_max_workers() -> usize {
    4
}

fn default_timeline_count() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub media: MediaConfig,
    pub encoding: EncodingConfig,
    pub thumbnail: ThumbnailConfig,
    #[serde(default)]
    pub scratch: ScratchConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub ffmpeg_path: String,
    /// Path to ffprobe binary
    pub ffprobe_path: String,
}

/// Re-encoding policy for the filter stage.
/// Audio is always stream-copied regardless of these settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// x264 preset (ultrafast, fast, medium, slow, veryslow)
    pub preset: String,
    /// Encoder thread count
    pub threads: u32,
    /// Upper bound for packets buffered while waiting on other streams
    pub max_muxing_queue_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailConfig {
    /// Number of frames captured for a timeline strip when not given on the command line
    #[serde(default = "default_timeline_count")]
    pub timeline_count: usize,
    /// Image container used for captured frames
    pub image_extension: String,
    /// Mimetype reported on captured frames
    pub mimetype: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScratchConfig {
    /// Root for per-call scratch directories; system temp dir when unset
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory that relative media paths are resolved against
    pub root: PathBuf,
    /// Base URL used for locations returned by `put` and `url_for_media`;
    /// empty means locations are plain filesystem paths
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum number of files processed concurrently
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media: MediaConfig {
                ffmpeg_path: "ffmpeg".to_string(),
                ffprobe_path: "ffprobe".to_string(),
            },
            encoding: EncodingConfig {
                preset: "ultrafast".to_string(),
                threads: 5,
                max_muxing_queue_size: 1024,
            },
            thumbnail: ThumbnailConfig {
                timeline_count: default_timeline_count(),
                image_extension: "png".to_string(),
                mimetype: "image/png".to_string(),
            },
            scratch: ScratchConfig::default(),
            storage: StorageConfig {
                root: PathBuf::from("."),
                base_url: String::new(),
            },
            batch: BatchConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ReelcutError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ReelcutError::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReelcutError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ReelcutError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.media.ffmpeg_path.trim().is_empty() || self.media.ffprobe_path.trim().is_empty() {
            return Err(ReelcutError::Config("ffmpeg_path and ffprobe_path must be set".to_string()));
        }
        if self.encoding.threads == 0 {
            return Err(ReelcutError::Config("encoding.threads must be at least 1".to_string()));
        }
        if self.encoding.max_muxing_queue_size == 0 {
            return Err(ReelcutError::Config("encoding.max_muxing_queue_size must be at least 1".to_string()));
        }
        if self.thumbnail.image_extension.trim().is_empty() {
            return Err(ReelcutError::Config("thumbnail.image_extension must be set".to_string()));
        }
        if self.batch.max_workers == 0 {
            return Err(ReelcutError::Config("batch.max_workers must be at least 1".to_string()));
        }
        Ok(())
    }
}
