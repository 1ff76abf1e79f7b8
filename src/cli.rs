use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::filters::{CropSpec, CutSpec, EditRequest, QualitySpec, RotateSpec};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Storage root that media paths are relative to (overrides the config)
    #[arg(long)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print normalized metadata of a media file as JSON
    Probe {
        /// Input media file
        #[arg(short, long)]
        input: String,
    },

    /// Cut, crop, rotate and/or rescale a video
    Edit {
        /// Input video file
        #[arg(short, long)]
        input: String,

        /// Output video file
        #[arg(short, long)]
        output: String,

        /// Start of the span to keep, in seconds
        #[arg(long, requires = "end")]
        start: Option<f64>,

        /// End of the span to keep, in seconds
        #[arg(long, requires = "start")]
        end: Option<f64>,

        /// Crop rectangle as WIDTH:HEIGHT:X:Y
        #[arg(long, value_parser = parse_crop)]
        crop: Option<CropSpec>,

        /// Clockwise rotation in degrees, quantized to quarter turns
        #[arg(long, allow_hyphen_values = true)]
        rotate: Option<i32>,

        /// Output width in pixels; height follows the aspect ratio
        #[arg(long)]
        quality: Option<u32>,
    },

    /// Capture a single frame as an image
    Thumbnail {
        /// Input video file
        #[arg(short, long)]
        input: String,

        /// Output image file
        #[arg(short, long)]
        output: String,

        /// Position in seconds (default: middle of the clip)
        #[arg(short, long)]
        position: Option<f64>,
    },

    /// Capture evenly spaced frames for a timeline strip
    Timeline {
        /// Input video file
        #[arg(short, long)]
        input: String,

        /// Output path prefix; frames are written as PREFIX_<n>.<ext>
        #[arg(short, long)]
        output: String,

        /// Number of frames (default from config)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Capture one thumbnail for every video in a directory
    Batch {
        /// Directory containing video files
        #[arg(short, long)]
        input_dir: String,

        /// Directory receiving the thumbnails
        #[arg(short, long)]
        output_dir: String,
    },

    /// Check that ffmpeg and ffprobe can be launched
    Check,

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "reelcut.toml")]
        output: PathBuf,
    },
}

/// Parse `WIDTH:HEIGHT:X:Y`
pub fn parse_crop(value: &str) -> Result<CropSpec, String> {
    let parts: Vec<&str> = value.split(':').collect();
    if parts.len() != 4 {
        return Err(format!("expected WIDTH:HEIGHT:X:Y, got '{}'", value));
    }

    let numbers = parts
        .iter()
        .map(|part| part.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid crop value '{}': {}", value, e))?;

    Ok(CropSpec {
        width: numbers[0],
        height: numbers[1],
        x: numbers[2],
        y: numbers[3],
    })
}

/// Assemble an edit request from the `edit` subcommand flags
pub fn edit_request(
    start: Option<f64>,
    end: Option<f64>,
    crop: Option<CropSpec>,
    rotate: Option<i32>,
    quality: Option<u32>,
) -> EditRequest {
    EditRequest {
        cut: start.zip(end).map(|(start, end)| CutSpec { start, end }),
        crop,
        rotate: rotate.map(|degree| RotateSpec { degree }),
        quality: quality.map(|quality| QualitySpec { quality }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_crop() {
        assert_eq!(
            parse_crop("640:360:10:20").unwrap(),
            CropSpec { width: 640, height: 360, x: 10, y: 20 }
        );
        assert!(parse_crop("640x360").is_err());
        assert!(parse_crop("640:360:-1:0").is_err());
    }

    #[test]
    fn test_edit_flags_build_request() {
        let args = Args::parse_from([
            "reelcut", "edit", "-i", "in.mp4", "-o", "out.mp4",
            "--start", "1.5", "--end", "4", "--rotate", "-90", "--quality", "480",
        ]);
        let Commands::Edit { start, end, crop, rotate, quality, .. } = args.command else {
            panic!("expected edit");
        };
        let request = edit_request(start, end, crop, rotate, quality);

        assert_eq!(request.cut, Some(CutSpec { start: 1.5, end: 4.0 }));
        assert_eq!(request.rotate, Some(RotateSpec { degree: -90 }));
        assert_eq!(request.quality, Some(QualitySpec { quality: 480 }));
        assert!(request.crop.is_none());
    }

    #[test]
    fn test_start_requires_end() {
        let result = Args::try_parse_from(["reelcut", "edit", "-i", "a.mp4", "-o", "b.mp4", "--start", "1"]);
        assert!(result.is_err());
    }
}
