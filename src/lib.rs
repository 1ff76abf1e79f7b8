//! reelcut - Video Editing and Thumbnail Capture
//!
//! Drives ffmpeg and ffprobe to cut, crop, rotate and rescale videos, capture
//! single thumbnails and timeline strips, and report normalized metadata.
//! Every call works in its own scratch directory, which is removed however
//! the call ends.

pub mod cli;
pub mod config;
pub mod editor;
pub mod error;
pub mod filters;
pub mod media;
pub mod metadata;
pub mod scratch;
pub mod storage;
pub mod thumbnail;
pub mod workflow;

pub use editor::{EditOutcome, VideoEditor};
pub use error::{ReelcutError, Result};
pub use filters::{compose, CropSpec, CutSpec, EditPlan, EditRequest, QualitySpec, RotateSpec};
pub use metadata::{MediaMetadata, MetadataExtractor};
pub use thumbnail::{ThumbnailArtifact, ThumbnailCapturer, TimelineThumbnails};
