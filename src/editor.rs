use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, ReelcutError};
use crate::filters::{compose, EditRequest};
use crate::media::{EncodingPolicy, MediaCommand, MediaCommandBuilder, ToolRunner};
use crate::metadata::{MediaMetadata, MetadataExtractor};
use crate::scratch::{Scratch, ScratchFile};

/// Result of an edit call
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// The request would not change the media; nothing was run
    Unchanged,
    Edited {
        content: Vec<u8>,
        metadata: MediaMetadata,
    },
}

impl EditOutcome {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, EditOutcome::Unchanged)
    }

    pub fn content(&self) -> Option<&[u8]> {
        match self {
            EditOutcome::Unchanged => None,
            EditOutcome::Edited { content, .. } => Some(content),
        }
    }

    pub fn metadata(&self) -> Option<&MediaMetadata> {
        match self {
            EditOutcome::Unchanged => None,
            EditOutcome::Edited { metadata, .. } => Some(metadata),
        }
    }
}

/// Applies edit plans through ffmpeg, one stage at a time
#[derive(Clone)]
pub struct VideoEditor {
    runner: Arc<dyn ToolRunner>,
    extractor: MetadataExtractor,
    command_builder: Arc<MediaCommandBuilder>,
    policy: EncodingPolicy,
    scratch_root: Option<PathBuf>,
}

impl VideoEditor {
    pub fn new(runner: Arc<dyn ToolRunner>, config: &Config) -> Self {
        Self {
            extractor: MetadataExtractor::new(runner.clone(), config),
            runner,
            command_builder: Arc::new(MediaCommandBuilder::new(
                &config.media.ffmpeg_path,
                &config.media.ffprobe_path,
            )),
            policy: EncodingPolicy::from(&config.encoding),
            scratch_root: config.scratch.root.clone(),
        }
    }

    /// Edit the media read from `reader`.
    ///
    /// `filename` only contributes its extension, which selects the container.
    /// When `metadata` is `None` the input is probed first. Returns
    /// [`EditOutcome::Unchanged`] without launching any stage when the request
    /// is a no-op for this input.
    pub fn edit<R: Read + ?Sized>(
        &self,
        reader: &mut R,
        filename: &str,
        metadata: Option<MediaMetadata>,
        request: &EditRequest,
    ) -> Result<EditOutcome> {
        request.validate()?;

        let scratch = Scratch::new(self.scratch_root.as_deref(), "reelcut_edit")?;
        let outcome = self.edit_in(&scratch, reader, filename, metadata, request);
        scratch.close();
        outcome
    }

    fn edit_in<R: Read + ?Sized>(
        &self,
        scratch: &Scratch,
        reader: &mut R,
        filename: &str,
        metadata: Option<MediaMetadata>,
        request: &EditRequest,
    ) -> Result<EditOutcome> {
        let mut working = scratch.materialize(reader, filename)?;

        let metadata = match metadata {
            Some(metadata) => metadata,
            None => self.extractor.extract(working.path())?,
        };

        let plan = compose(&metadata, request)?;
        if !plan.needs_edit {
            info!("No edit needed for {}", filename);
            return Ok(EditOutcome::Unchanged);
        }

        let extension = working.extension();

        if let Some(cut) = plan.cut_stage {
            let output = scratch.reserve("stage_cut", &extension);
            let command = self
                .command_builder
                .cut(working.path(), output.path(), cut.start, cut.length);
            self.run_stage(&command, &output)?;
            // the superseded input is deleted here
            working = output;
        }

        if let Some(graph) = plan.filter_graph {
            let output = scratch.reserve("stage_filter", &extension);
            let command = self.command_builder.filter(
                working.path(),
                output.path(),
                &graph.expression(),
                &self.policy,
            );
            self.run_stage(&command, &output)?;
            working = output;
        }

        let content = working.read()?;
        let metadata = self.extractor.extract(working.path())?;

        info!("Edited {} ({} bytes)", filename, content.len());
        Ok(EditOutcome::Edited { content, metadata })
    }

    fn run_stage(&self, command: &MediaCommand, output: &ScratchFile) -> Result<()> {
        info!("Running stage: {}", command.description);
        self.runner.run(command)?;

        if !output.path().exists() {
            return Err(ReelcutError::ExternalTool {
                tool: command.tool_name(),
                code: Some(0),
                stderr: format!("{} produced no output file", command.description),
            });
        }
        debug!("Stage wrote {}", output.path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{CropSpec, CutSpec, QualitySpec, RotateSpec};
    use crate::media::MockToolRunner;
    use std::fs;
    use std::io::Cursor;
    use std::sync::Mutex;

    const PROBE: &str = r#"{
        "streams": [{"codec_type": "video", "codec_name": "h264", "width": 1280, "height": 720,
                     "r_frame_rate": "25/1", "bit_rate": "2000000", "nb_frames": "250", "duration": "10.000000"}],
        "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "size": "2500000", "duration": "10.000000"}
    }"#;

    fn scratch_config(root: &assert_fs::TempDir) -> Config {
        let mut config = Config::default();
        config.scratch.root = Some(root.path().to_path_buf());
        config
    }

    /// ffprobe answers with `PROBE`; ffmpeg writes its declared outputs
    fn fake_tools(log: Arc<Mutex<Vec<MediaCommand>>>) -> MockToolRunner {
        let mut runner = MockToolRunner::new();
        runner.expect_run().returning(move |cmd| {
            log.lock().unwrap().push(cmd.clone());
            if cmd.binary_path == "ffprobe" {
                return Ok(PROBE.as_bytes().to_vec());
            }
            for output in &cmd.outputs {
                fs::write(output, format!("output of {}", cmd.description)).unwrap();
            }
            Ok(Vec::new())
        });
        runner
    }

    fn source() -> MediaMetadata {
        crate::metadata::parse_probe_output(PROBE.as_bytes()).unwrap()
    }

    #[test]
    fn test_noop_edit_launches_nothing() {
        let root = assert_fs::TempDir::new().unwrap();
        let mut runner = MockToolRunner::new();
        runner.expect_run().times(0);

        let editor = VideoEditor::new(Arc::new(runner), &scratch_config(&root));
        let request = EditRequest {
            cut: Some(CutSpec { start: 0.0, end: 10.0 }),
            rotate: Some(RotateSpec { degree: 360 }),
            ..Default::default()
        };
        let outcome = editor
            .edit(&mut Cursor::new(vec![1u8; 32]), "clip.mp4", Some(source()), &request)
            .unwrap();

        assert!(outcome.is_unchanged());
        assert!(outcome.content().is_none());
        assert!(outcome.metadata().is_none());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_noop_after_probe_runs_only_inspector() {
        let root = assert_fs::TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let editor = VideoEditor::new(Arc::new(fake_tools(log.clone())), &scratch_config(&root));

        let outcome = editor
            .edit(&mut Cursor::new(vec![1u8; 32]), "clip.mp4", None, &EditRequest::default())
            .unwrap();

        assert!(outcome.is_unchanged());
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].binary_path, "ffprobe");
    }

    #[test]
    fn test_sub_quarter_rotation_returns_reprobed_input() {
        let root = assert_fs::TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let editor = VideoEditor::new(Arc::new(fake_tools(log.clone())), &scratch_config(&root));

        let request = EditRequest {
            rotate: Some(RotateSpec { degree: 10 }),
            ..Default::default()
        };
        let outcome = editor
            .edit(&mut Cursor::new(b"source bytes".to_vec()), "clip.mp4", Some(source()), &request)
            .unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].binary_path, "ffprobe");
        assert_eq!(outcome.content(), Some(&b"source bytes"[..]));
        assert_eq!(outcome.metadata().and_then(|m| m.width), Some(1280));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_cut_then_filter_runs_in_order() {
        let root = assert_fs::TempDir::new().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let editor = VideoEditor::new(Arc::new(fake_tools(log.clone())), &scratch_config(&root));

        let request = EditRequest {
            cut: Some(CutSpec { start: 2.0, end: 5.0 }),
            crop: Some(CropSpec { width: 2000, height: 400, x: 0, y: 100 }),
            rotate: Some(RotateSpec { degree: 270 }),
            quality: Some(QualitySpec { quality: 640 }),
        };
        let outcome = editor
            .edit(&mut Cursor::new(vec![1u8; 32]), "clip.mp4", None, &request)
            .unwrap();

        let log = log.lock().unwrap();
        let stages: Vec<&str> = log.iter().map(|cmd| cmd.binary_path.as_str()).collect();
        assert_eq!(stages, vec!["ffprobe", "ffmpeg", "ffmpeg", "ffprobe"]);

        let cut = log[1].args.join(" ");
        assert!(cut.contains("-ss 2 -t 3 -c copy"));

        let filter = log[2].args.join(" ");
        assert!(filter.contains("-filter:v crop=1280:400:0:100,transpose=2,scale=640:-2"));
        assert!(filter.contains("-c:a copy"));
        // the filter stage consumes the cut stage's output
        assert_eq!(
            log[2].args[log[2].args.iter().position(|a| a == "-i").unwrap() + 1],
            log[1].outputs[0].to_string_lossy()
        );
        assert!(log[1].outputs[0].to_string_lossy().ends_with(".mp4"));

        match outcome {
            EditOutcome::Edited { content, metadata } => {
                assert!(String::from_utf8(content).unwrap().starts_with("output of Filter graph"));
                assert_eq!(metadata.width, Some(1280));
            }
            EditOutcome::Unchanged => panic!("expected an edit"),
        }
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_engine_failure_propagates_and_cleans_up() {
        let root = assert_fs::TempDir::new().unwrap();
        let mut runner = MockToolRunner::new();
        runner.expect_run().times(1).returning(|cmd| {
            assert_eq!(cmd.binary_path, "ffmpeg");
            fs::write(&cmd.outputs[0], b"partial").unwrap();
            Err(ReelcutError::ExternalTool {
                tool: cmd.tool_name(),
                code: Some(1),
                stderr: "Conversion failed!".to_string(),
            })
        });

        let editor = VideoEditor::new(Arc::new(runner), &scratch_config(&root));
        let request = EditRequest {
            quality: Some(QualitySpec { quality: 320 }),
            ..Default::default()
        };
        let err = editor
            .edit(&mut Cursor::new(vec![1u8; 32]), "clip.mp4", Some(source()), &request)
            .unwrap_err();

        assert!(err.is_external_tool_failure());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_stage_output_is_a_failure() {
        let root = assert_fs::TempDir::new().unwrap();
        let mut runner = MockToolRunner::new();
        runner.expect_run().times(1).returning(|_| Ok(Vec::new()));

        let editor = VideoEditor::new(Arc::new(runner), &scratch_config(&root));
        let request = EditRequest {
            cut: Some(CutSpec { start: 1.0, end: 2.0 }),
            ..Default::default()
        };
        let err = editor
            .edit(&mut Cursor::new(vec![1u8; 32]), "clip.mp4", Some(source()), &request)
            .unwrap_err();

        assert!(err.is_external_tool_failure());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_request_rejected_before_any_work() {
        let root = assert_fs::TempDir::new().unwrap();
        let mut runner = MockToolRunner::new();
        runner.expect_run().times(0);

        let editor = VideoEditor::new(Arc::new(runner), &scratch_config(&root));
        let request = EditRequest {
            cut: Some(CutSpec { start: 4.0, end: 1.0 }),
            ..Default::default()
        };
        let err = editor
            .edit(&mut Cursor::new(vec![1u8; 32]), "clip.mp4", None, &request)
            .unwrap_err();

        assert!(matches!(err, ReelcutError::InvalidEditRequest(_)));
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
