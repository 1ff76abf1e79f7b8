use indicatif::{ProgressBar, ProgressStyle};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::editor::{EditOutcome, VideoEditor};
use crate::error::{Result, ReelcutError};
use crate::filters::EditRequest;
use crate::media::ToolRunner;
use crate::metadata::{MediaMetadata, MetadataExtractor};
use crate::storage::MediaStorage;
use crate::thumbnail::ThumbnailCapturer;

const VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm"];

/// Counts reported after a directory batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Storage-backed operations used by the command-line tool
pub struct Workflow<S: MediaStorage> {
    config: Config,
    storage: S,
    extractor: MetadataExtractor,
    editor: VideoEditor,
    capturer: ThumbnailCapturer,
}

impl<S: MediaStorage + 'static> Workflow<S> {
    pub fn new(config: Config, runner: Arc<dyn ToolRunner>, storage: S) -> Self {
        Self {
            extractor: MetadataExtractor::new(runner.clone(), &config),
            editor: VideoEditor::new(runner.clone(), &config),
            capturer: ThumbnailCapturer::new(runner, &config),
            config,
            storage,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Inspect a stored media file
    pub fn probe(&self, input: &str) -> Result<MediaMetadata> {
        let content = self.storage.get(input)?;
        self.extractor.extract_from_reader(&mut Cursor::new(content), input)
    }

    /// Edit a stored video and store the result.
    /// Returns `None` when the request leaves the video unchanged.
    pub fn edit(&self, input: &str, output: &str, request: &EditRequest) -> Result<Option<(String, MediaMetadata)>> {
        info!("Editing {} -> {}", input, output);
        let content = self.storage.get(input)?;

        match self.editor.edit(&mut Cursor::new(content), input, None, request)? {
            EditOutcome::Unchanged => {
                info!("{} needs no edit, nothing stored", input);
                Ok(None)
            }
            EditOutcome::Edited { content, metadata } => {
                let location = self.storage.put(&content, output)?;
                Ok(Some((location, metadata)))
            }
        }
    }

    /// Capture one frame of a stored video.
    /// Without a position the middle of the clip is used.
    pub fn thumbnail(&self, input: &str, output: &str, position: Option<f64>) -> Result<String> {
        let content = self.storage.get(input)?;
        let duration = self.duration_of(&content, input)?;
        let position = position.unwrap_or(duration / 2.0);

        let artifact = self
            .capturer
            .capture(&mut Cursor::new(content), input, duration, position)?;
        self.storage.put(&artifact.content, output)
    }

    /// Capture a timeline strip, storing frame `i` at `{output_prefix}_{i}.{ext}`
    pub fn timeline(&self, input: &str, output_prefix: &str, count: Option<usize>) -> Result<Vec<String>> {
        let count = count.unwrap_or(self.config.thumbnail.timeline_count);
        let content = self.storage.get(input)?;
        let duration = self.duration_of(&content, input)?;

        let frames = self
            .capturer
            .capture_timeline(&mut Cursor::new(content), input, duration, count)?;

        let mut locations = Vec::with_capacity(count);
        for (index, frame) in frames.enumerate() {
            let frame = frame?;
            let path = format!("{}_{}.{}", output_prefix, index, self.config.thumbnail.image_extension);
            locations.push(self.storage.put(&frame.content, &path)?);
        }
        Ok(locations)
    }

    /// Capture one thumbnail per video, one blocking worker per file.
    /// A failing file is logged and counted; the rest of the batch continues.
    pub async fn thumbnail_directory(self: Arc<Self>, inputs: Vec<String>, output_dir: &str) -> Result<BatchSummary> {
        info!("Found {} video files to process", inputs.len());

        let pb = ProgressBar::new(inputs.len() as u64);
        pb.set_style(ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| ReelcutError::Config(format!("Invalid progress template: {}", e)))?
            .progress_chars("#>-"));

        let semaphore = Arc::new(Semaphore::new(self.config.batch.max_workers));
        let mut workers = JoinSet::new();

        for input in inputs {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ReelcutError::Config(format!("Worker pool closed: {}", e)))?;
            let output = thumbnail_path(output_dir, &input, &self.config.thumbnail.image_extension);
            let workflow = self.clone();

            workers.spawn_blocking(move || {
                let _permit = permit;
                let result = workflow.thumbnail(&input, &output, None);
                (input, result)
            });
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((input, Ok(location))) => {
                    info!("Successfully processed: {} -> {}", input, location);
                    summary.succeeded += 1;
                }
                Ok((input, Err(e))) => {
                    warn!("Failed to process {}: {}", input, e);
                    summary.failed += 1;
                }
                Err(e) => {
                    warn!("Worker stopped unexpectedly: {}", e);
                    summary.failed += 1;
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message(format!("{} ok, {} failed", summary.succeeded, summary.failed));

        Ok(summary)
    }

    fn duration_of(&self, content: &[u8], input: &str) -> Result<f64> {
        let metadata = self
            .extractor
            .extract_from_reader(&mut Cursor::new(content), input)?;
        metadata.duration.ok_or_else(|| {
            ReelcutError::InvalidEditRequest(format!("{} has no known duration", input))
        })
    }
}

/// Storage paths of the video files under `dir`, relative to `root`, sorted
pub fn discover_videos(root: &Path, dir: &str) -> Result<Vec<String>> {
    let start = root.join(dir);
    if !start.is_dir() {
        return Err(ReelcutError::FileNotFound(start.display().to_string()));
    }

    let mut videos = Vec::new();
    for entry in WalkDir::new(&start).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let is_video = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if !is_video {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(root) {
            videos.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    videos.sort();
    Ok(videos)
}

/// `{output_dir}/{stem}.{extension}` for a stored video path
fn thumbnail_path(output_dir: &str, input: &str, extension: &str) -> String {
    let stem = Path::new(input)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "thumbnail".to_string());
    format!("{}/{}.{}", output_dir.trim_end_matches('/'), stem, extension)
}
