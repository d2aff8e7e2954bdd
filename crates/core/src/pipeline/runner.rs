//! The per-asset conversion loop.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::detect::DetectedAsset;
use crate::exec::{ToolOutput, ToolRunner};
use crate::metadata::{self, AudioArtifact, OutputMetadata, SubtitleArtifact, VideoArtifact};
use crate::policy;
use crate::progress::{ErrorReport, ErrorSink, ProgressPublisher};

use super::types::{ConversionTask, RunProgress, Stage, StageError, TaskState};

/// An extracted audio stream awaiting segmentation.
struct ExtractedAudio {
    language: Option<String>,
    title: Option<String>,
    codec: String,
    path: PathBuf,
}

/// Runs the ordered stage sequence over a catalog of assets, one external
/// tool invocation at a time.
///
/// Failure isolation is per asset: a failed stage marks that asset's task
/// failed, reports it, and moves on to the next asset, unless the run is
/// configured to abort on the first failure.
pub struct ConversionPipeline {
    config: Config,
    runner: Arc<dyn ToolRunner>,
    publisher: Arc<ProgressPublisher>,
    errors: Arc<ErrorSink>,
}

impl ConversionPipeline {
    pub fn new(
        config: Config,
        runner: Arc<dyn ToolRunner>,
        publisher: Arc<ProgressPublisher>,
        errors: Arc<ErrorSink>,
    ) -> Self {
        Self {
            config,
            runner,
            publisher,
            errors,
        }
    }

    /// Converts every asset in catalog order and returns the final progress.
    ///
    /// Returns `Err` only when `abort_on_failure` is configured and an asset
    /// failed; the published snapshot reaches a terminal state either way.
    pub async fn run(&self, assets: &[DetectedAsset]) -> Result<RunProgress, StageError> {
        let mut progress = RunProgress::new(assets.len());
        self.publisher.publish(progress.clone());
        info!(assets = assets.len(), "conversion run started");

        for asset in assets {
            let task_idx = progress.tasks.len();
            progress.tasks.push(ConversionTask::begin(asset));
            self.publisher.publish(progress.clone());

            match self.convert_asset(asset, &mut progress, task_idx).await {
                Ok(()) => {
                    progress.assets_processed += 1;
                    let task = &mut progress.tasks[task_idx];
                    task.state = TaskState::Done;
                    task.finished_at = Some(Utc::now());
                    info!(asset = %asset.base_name, "asset processed");
                }
                Err(e) => {
                    progress.assets_failed += 1;
                    let task = &mut progress.tasks[task_idx];
                    task.state = TaskState::Failed;
                    task.failed = true;
                    task.finished_at = Some(Utc::now());
                    error!(asset = %asset.base_name, error = %e, "asset failed");
                    self.errors.recoverable(ErrorReport::new(
                        "Error!",
                        format!("Failed to convert {}", asset.base_name),
                        e.to_string(),
                    ));
                    if self.config.pipeline.abort_on_failure {
                        progress.finished_at = Some(Utc::now());
                        self.publisher.publish(progress.clone());
                        return Err(e);
                    }
                }
            }
            self.publisher.publish(progress.clone());
        }

        progress.finished_at = Some(Utc::now());
        self.publisher.publish(progress.clone());
        info!(
            processed = progress.assets_processed,
            failed = progress.assets_failed,
            "conversion run finished"
        );
        Ok(progress)
    }

    async fn convert_asset(
        &self,
        asset: &DetectedAsset,
        progress: &mut RunProgress,
        task_idx: usize,
    ) -> Result<(), StageError> {
        let paths = &self.config.paths;

        // Mirror the source's relative layout under the destination root.
        let rel_dir = asset
            .source_path
            .parent()
            .and_then(|p| p.strip_prefix(&paths.source_root).ok())
            .unwrap_or_else(|| Path::new(""))
            .to_path_buf();
        let dest_dir = paths.dest_root.join(&rel_dir);
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|e| StageError::Io {
                stage: Stage::Video,
                source: e,
            })?;

        let base = asset.base_name.clone();
        let mut sidecar = OutputMetadata::new(&base);

        // Video: one invocation, first video stream only. Profile-compliant
        // streams are copied; everything else is re-encoded to what the
        // segmenter requires.
        self.enter_stage(progress, task_idx, Stage::Video);
        let video_ok = asset
            .video_streams
            .first()
            .map(|s| policy::is_compliant_profile(s, policy::WEB_SAFE_VIDEO))
            .unwrap_or(false);
        let intermediate = dest_dir.join(format!("{base}.mp4"));
        debug!(asset = %base, stream_copy = video_ok, "video stage");
        let args = self.video_args(&asset.source_path, video_ok, &intermediate);
        self.run_stage(Stage::Video, &self.config.tools.ffmpeg, args)
            .await?;
        if video_ok {
            progress.video_streams_copied += 1;
        } else {
            progress.video_streams_transcoded += 1;
        }
        self.advance(progress, task_idx);

        // Audio: every stream extracted into its own file, copied when the
        // codec is already acceptable.
        self.enter_stage(progress, task_idx, Stage::Audio);
        let mut extracted = Vec::with_capacity(asset.audio_streams.len());
        for (pos, stream) in asset.audio_streams.iter().enumerate() {
            let copy = policy::is_compliant_codec(stream, policy::WEB_SAFE_AUDIO);
            let out = dest_dir.join(format!("{base}-audio-{pos}.mp4"));
            debug!(asset = %base, stream = pos, stream_copy = copy, "audio stage");
            let args = self.audio_args(&asset.source_path, pos, copy, &out);
            self.run_stage(Stage::Audio, &self.config.tools.ffmpeg, args)
                .await?;
            if copy {
                progress.audio_streams_copied += 1;
            } else {
                progress.audio_streams_transcoded += 1;
            }
            let codec = if copy {
                stream
                    .codec_name
                    .clone()
                    .unwrap_or_else(|| policy::TARGET_AUDIO_CODEC.to_string())
            } else {
                policy::TARGET_AUDIO_CODEC.to_string()
            };
            extracted.push(ExtractedAudio {
                language: stream.language.clone(),
                title: stream.title.clone(),
                codec,
                path: out,
            });
            self.advance(progress, task_idx);
        }

        // Segmentation: the segmented output supersedes both the manifest
        // file (embedded into the sidecar) and the intermediate.
        self.enter_stage(progress, task_idx, Stage::Segmentation);
        let manifest = self.segment(&intermediate).await?;
        sidecar.video = Some(VideoArtifact {
            init_segment: format!("{base}_dashinit.mp4"),
            manifest,
        });
        self.advance(progress, task_idx);

        for audio in extracted {
            let manifest = self.segment(&audio.path).await?;
            let stem = audio
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            sidecar.audios.push(AudioArtifact {
                language: audio.language,
                title: audio.title,
                codec: audio.codec,
                init_segment: format!("{stem}_dashinit.mp4"),
                manifest,
            });
            self.advance(progress, task_idx);
        }

        // Subtitles: accepted formats are extracted through a scratch file
        // and embedded as text; everything else is counted as skipped.
        self.enter_stage(progress, task_idx, Stage::Subtitles);
        tokio::fs::create_dir_all(&paths.temp_root)
            .await
            .map_err(|e| StageError::Io {
                stage: Stage::Subtitles,
                source: e,
            })?;
        for (pos, stream) in asset.subtitle_streams.iter().enumerate() {
            let format = stream
                .codec_name
                .as_deref()
                .filter(|_| policy::is_extractable_subtitle(stream));
            match format {
                Some(format) => {
                    let scratch = paths.temp_root.join(format!(
                        "{base}-sub-{pos}.{ext}",
                        ext = subtitle_extension(format)
                    ));
                    let args = self.subtitle_args(&asset.source_path, pos, &scratch);
                    self.run_stage(Stage::Subtitles, &self.config.tools.ffmpeg, args)
                        .await?;
                    let io = |e| StageError::Io {
                        stage: Stage::Subtitles,
                        source: e,
                    };
                    let text = tokio::fs::read_to_string(&scratch).await.map_err(io)?;
                    tokio::fs::remove_file(&scratch).await.map_err(io)?;
                    let title = stream
                        .title
                        .clone()
                        .or_else(|| stream.language.clone())
                        .unwrap_or_else(|| format!("Subtitle Stream {}", pos + 1));
                    sidecar.subtitles.push(SubtitleArtifact {
                        format: format.to_string(),
                        language: stream.language.clone(),
                        title,
                        text,
                    });
                    progress.subtitle_tracks_extracted += 1;
                }
                None => {
                    debug!(
                        asset = %base,
                        index = stream.index,
                        codec = stream.codec_name.as_deref().unwrap_or("unknown"),
                        "skipping subtitle stream in unsupported format"
                    );
                    progress.subtitle_tracks_skipped += 1;
                }
            }
            self.advance(progress, task_idx);
        }

        // The sidecar write is the asset's last step.
        self.enter_stage(progress, task_idx, Stage::Metadata);
        let sidecar_path = dest_dir.join(metadata::sidecar_file_name(&base));
        metadata::write_sidecar(&sidecar_path, &sidecar)
            .await
            .map_err(|e| StageError::Persist {
                path: sidecar_path.clone(),
                source: e,
            })?;
        self.advance(progress, task_idx);

        if self.config.pipeline.relocate_processed {
            self.enter_stage(progress, task_idx, Stage::Relocate);
            self.relocate_source(asset, &rel_dir).await?;
        }

        Ok(())
    }

    /// Segments one intermediate file, returning the manifest text. The
    /// manifest file and the intermediate are deleted once embedded.
    async fn segment(&self, input: &Path) -> Result<String, StageError> {
        let stage = Stage::Segmentation;
        let io = move |e| StageError::Io { stage, source: e };

        let mpd = input.with_extension("mpd");
        let args = vec![
            "-dash".to_string(),
            self.config.pipeline.segment_duration_ms.to_string(),
            "-rap".to_string(),
            "-out".to_string(),
            mpd.display().to_string(),
            input.display().to_string(),
        ];
        self.run_stage(stage, &self.config.tools.mp4box, args)
            .await?;

        let manifest = tokio::fs::read_to_string(&mpd).await.map_err(io)?;
        tokio::fs::remove_file(&mpd).await.map_err(io)?;
        tokio::fs::remove_file(input).await.map_err(io)?;
        Ok(manifest)
    }

    /// Moves a fully-processed source out of the scan root so re-runs skip
    /// it. Falls back to copy-and-remove when a rename crosses filesystems.
    async fn relocate_source(
        &self,
        asset: &DetectedAsset,
        rel_dir: &Path,
    ) -> Result<(), StageError> {
        let stage = Stage::Relocate;
        let io = move |e| StageError::Io { stage, source: e };

        let target_dir = self.config.paths.processed_root.join(rel_dir);
        tokio::fs::create_dir_all(&target_dir).await.map_err(io)?;
        let file_name = asset.source_path.file_name().unwrap_or_default();
        let target = target_dir.join(file_name);

        if tokio::fs::rename(&asset.source_path, &target).await.is_err() {
            tokio::fs::copy(&asset.source_path, &target)
                .await
                .map_err(io)?;
            tokio::fs::remove_file(&asset.source_path)
                .await
                .map_err(io)?;
        }
        debug!(from = %asset.source_path.display(), to = %target.display(), "relocated source");
        Ok(())
    }

    async fn run_stage(
        &self,
        stage: Stage,
        tool: &Path,
        args: Vec<String>,
    ) -> Result<ToolOutput, StageError> {
        let output = self.runner.run(tool, &args).await?;
        if !output.success() {
            return Err(StageError::Tool {
                stage,
                tool: tool.display().to_string(),
                exit_code: output.exit_code,
                diagnostic: output.last_stderr_line,
            });
        }
        Ok(output)
    }

    /// Advances the task one sub-step and publishes a fresh snapshot.
    fn advance(&self, progress: &mut RunProgress, task_idx: usize) {
        progress.tasks[task_idx].steps_done += 1;
        self.publisher.publish(progress.clone());
    }

    /// Marks which stage the task is in and publishes the transition.
    fn enter_stage(&self, progress: &mut RunProgress, task_idx: usize, stage: Stage) {
        progress.tasks[task_idx].state = TaskState::Running(stage);
        self.publisher.publish(progress.clone());
    }

    fn video_args(&self, source: &Path, stream_copy: bool, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "warning".to_string(),
            "-i".to_string(),
            source.display().to_string(),
            "-map".to_string(),
            "0:v:0".to_string(),
            "-an".to_string(),
            "-sn".to_string(),
        ];
        if stream_copy {
            args.extend(["-vcodec".to_string(), "copy".to_string()]);
        } else {
            // The keyframe interval is pinned so segment boundaries land on
            // keyframes.
            let interval = self.config.pipeline.keyframe_interval.to_string();
            args.extend([
                "-vcodec".to_string(),
                "libx264".to_string(),
                "-profile:v".to_string(),
                "high".to_string(),
                "-pix_fmt".to_string(),
                "yuv420p".to_string(),
                "-g".to_string(),
                interval.clone(),
                "-keyint_min".to_string(),
                interval,
                "-sc_threshold".to_string(),
                "0".to_string(),
            ]);
        }
        args.push(output.display().to_string());
        args
    }

    fn audio_args(
        &self,
        source: &Path,
        stream_pos: usize,
        stream_copy: bool,
        output: &Path,
    ) -> Vec<String> {
        let codec = if stream_copy {
            "copy"
        } else {
            policy::TARGET_AUDIO_CODEC
        };
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "warning".to_string(),
            "-i".to_string(),
            source.display().to_string(),
            "-map".to_string(),
            format!("0:a:{stream_pos}"),
            "-vn".to_string(),
            "-sn".to_string(),
            "-acodec".to_string(),
            codec.to_string(),
            output.display().to_string(),
        ]
    }

    fn subtitle_args(&self, source: &Path, stream_pos: usize, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "warning".to_string(),
            "-i".to_string(),
            source.display().to_string(),
            "-map".to_string(),
            format!("0:s:{stream_pos}"),
            output.display().to_string(),
        ]
    }
}

/// Scratch file extension for an extractable subtitle format.
fn subtitle_extension(format: &str) -> &str {
    match format {
        "subrip" => "srt",
        "webvtt" => "vtt",
        other => other,
    }
}
