use std::io::Read;
use std::iter::FusedIterator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, ReelcutError};
use crate::media::{MediaCommandBuilder, ToolRunner};
use crate::metadata::{MediaMetadata, MetadataExtractor};
use crate::scratch::{Scratch, ScratchFile};

/// Offset from the end used when a capture position falls on or past it.
/// The very last frame decodes as empty.
const LAST_FRAME_MARGIN: f64 = 0.1;

/// Seconds trimmed from the end of a timeline strip
const TIMELINE_TAIL: f64 = 1.0;

/// One captured frame
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailArtifact {
    pub content: Vec<u8>,
    pub metadata: MediaMetadata,
    /// Seconds into the source the frame was taken from
    pub position: f64,
}

/// Position actually used for a single capture
pub fn capture_position(duration: f64, position: f64) -> f64 {
    if position >= duration {
        non_negative(duration - LAST_FRAME_MARGIN)
    } else {
        position
    }
}

/// Spacing between timeline frames
pub fn timeline_interval(duration: f64, count: usize) -> f64 {
    if count <= 1 {
        duration - TIMELINE_TAIL
    } else {
        (duration - TIMELINE_TAIL) / (count - 1) as f64
    }
}

/// Positions of the frames of a timeline strip
pub fn timeline_positions(duration: f64, count: usize) -> Vec<f64> {
    let interval = timeline_interval(duration, count);
    if count == 1 {
        return vec![non_negative(interval)];
    }
    (0..count)
        .map(|index| non_negative(index as f64 * interval))
        .collect()
}

// clips shorter than the tail would otherwise seek before the start
fn non_negative(seconds: f64) -> f64 {
    if seconds > 0.0 { seconds } else { 0.0 }
}

fn validate_duration(duration: f64) -> Result<()> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(ReelcutError::InvalidEditRequest(format!(
            "duration must be a positive number of seconds, got {}",
            duration
        )));
    }
    Ok(())
}

/// Extracts still frames as images
#[derive(Clone)]
pub struct ThumbnailCapturer {
    runner: Arc<dyn ToolRunner>,
    extractor: MetadataExtractor,
    command_builder: Arc<MediaCommandBuilder>,
    scratch_root: Option<PathBuf>,
    image_extension: String,
    mimetype: String,
}

impl ThumbnailCapturer {
    pub fn new(runner: Arc<dyn ToolRunner>, config: &Config) -> Self {
        Self {
            extractor: MetadataExtractor::new(runner.clone(), config),
            runner,
            command_builder: Arc::new(MediaCommandBuilder::new(
                &config.media.ffmpeg_path,
                &config.media.ffprobe_path,
            )),
            scratch_root: config.scratch.root.clone(),
            image_extension: config.thumbnail.image_extension.clone(),
            mimetype: config.thumbnail.mimetype.clone(),
        }
    }

    /// Capture the frame at `position` seconds
    pub fn capture<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        filename: &str,
        duration: f64,
        position: f64,
    ) -> Result<ThumbnailArtifact> {
        validate_duration(duration)?;
        if !position.is_finite() || position < 0.0 {
            return Err(ReelcutError::InvalidEditRequest(format!(
                "capture position must be a non-negative number of seconds, got {}",
                position
            )));
        }
        let position = capture_position(duration, position);

        let scratch = Scratch::new(self.scratch_root.as_deref(), "reelcut_thumb")?;
        let artifact = self.capture_in(&scratch, reader, filename, position);
        scratch.close();
        artifact
    }

    fn capture_in<R: Read + ?Sized>(
        &self,
        scratch: &Scratch,
        reader: &mut R,
        filename: &str,
        position: f64,
    ) -> Result<ThumbnailArtifact> {
        let input = scratch.materialize(reader, filename)?;
        let output = scratch.reserve("preview_thumbnail", &self.image_extension);

        let command = self
            .command_builder
            .capture_frame(input.path(), position, output.path());
        self.runner.run(&command)?;
        drop(input);

        let artifact = read_frame(&self.extractor, &self.mimetype, output, position)?;
        info!("Captured thumbnail of {} at {:.3}s", filename, position);
        Ok(artifact)
    }

    /// Capture `count` evenly spaced frames with a single engine invocation.
    ///
    /// The returned iterator yields frames in order and removes each frame's
    /// file as it is yielded. It cannot be restarted.
    pub fn capture_timeline<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        filename: &str,
        duration: f64,
        count: usize,
    ) -> Result<TimelineThumbnails> {
        validate_duration(duration)?;
        if count == 0 {
            return Err(ReelcutError::InvalidEditRequest(
                "timeline needs at least one frame".to_string(),
            ));
        }

        let positions = timeline_positions(duration, count);
        debug!(
            "Timeline of {} frames every {:.3}s",
            count,
            timeline_interval(duration, count)
        );

        let scratch = Scratch::new(self.scratch_root.as_deref(), "reelcut_timeline")?;
        let input = scratch.materialize(reader, filename)?;
        let frames: Vec<ScratchFile> = (0..count)
            .map(|index| scratch.reserve(&format!("timeline_{}", index), &self.image_extension))
            .collect();
        let outputs: Vec<PathBuf> = frames.iter().map(|frame| frame.path().to_path_buf()).collect();

        let command = self
            .command_builder
            .capture_frames(input.path(), &positions, &outputs);
        // on failure the frame guards and the scratch directory drop here
        self.runner.run(&command)?;
        drop(input);

        info!("Captured {} timeline frames of {}", count, filename);
        Ok(TimelineThumbnails {
            frames: positions.into_iter().zip(frames).collect::<Vec<_>>().into_iter(),
            extractor: self.extractor.clone(),
            mimetype: self.mimetype.clone(),
            scratch: Some(scratch),
        })
    }
}

fn read_frame(
    extractor: &MetadataExtractor,
    mimetype: &str,
    frame: ScratchFile,
    position: f64,
) -> Result<ThumbnailArtifact> {
    let metadata = extractor.extract(frame.path())?.with_mimetype(mimetype);
    let content = frame.read()?;
    drop(frame);
    Ok(ThumbnailArtifact {
        content,
        metadata,
        position,
    })
}

/// Single-pass sequence of timeline frames.
///
/// Frame `i` is read and deleted when it is yielded, before frame `i + 1` is
/// touched. Dropping the iterator early removes whatever frames remain. After
/// an error the sequence ends.
pub struct TimelineThumbnails {
    frames: std::vec::IntoIter<(f64, ScratchFile)>,
    extractor: MetadataExtractor,
    mimetype: String,
    // declared last so it drops after the frame guards
    scratch: Option<Scratch>,
}

impl TimelineThumbnails {
    fn finish(&mut self) {
        self.frames = Vec::new().into_iter();
        if let Some(scratch) = self.scratch.take() {
            scratch.close();
        }
    }
}

impl Iterator for TimelineThumbnails {
    type Item = Result<ThumbnailArtifact>;

    fn next(&mut self) -> Option<Self::Item> {
        let Some((position, frame)) = self.frames.next() else {
            self.finish();
            return None;
        };

        let artifact = read_frame(&self.extractor, &self.mimetype, frame, position);
        if artifact.is_err() || self.frames.len() == 0 {
            self.finish();
        }
        Some(artifact)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.frames.size_hint()
    }
}

impl ExactSizeIterator for TimelineThumbnails {}

impl FusedIterator for TimelineThumbnails {}
