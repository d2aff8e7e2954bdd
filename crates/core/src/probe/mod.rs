//! Stream probing.
//!
//! [`StreamProbe`] asks the structured prober (ffprobe) for the audio, video
//! and subtitle streams of one container, one `-select_streams` invocation
//! per kind, preserving the reported order. Subtitle streams the primary
//! prober cannot name are resolved through the text-based container
//! inspector (mkvinfo), whose track numbers are corrected by a configured
//! offset before matching.
//!
//! A probe failure is fatal for the one file being probed, never for the
//! scan as a whole.

mod ffprobe;
mod mkvinfo;
mod types;

pub use mkvinfo::normalize_codec_id;
pub use types::{ProbedStreams, StreamDescriptor, StreamKind};

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Config;
use crate::exec::{ExecError, ToolRunner};

/// Errors determining a file's streams.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// A prober exited non-zero.
    #[error("{tool} exited with status {exit_code}: {diagnostic}")]
    Tool {
        tool: String,
        exit_code: i32,
        diagnostic: String,
    },

    /// A prober's output could not be parsed.
    #[error("unparsable {tool} output: {reason}")]
    Parse { tool: String, reason: String },

    /// A prober could not be spawned.
    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// Probes one container file for its stream layout.
pub struct StreamProbe {
    runner: Arc<dyn ToolRunner>,
    config: Config,
}

impl StreamProbe {
    pub fn new(runner: Arc<dyn ToolRunner>, config: Config) -> Self {
        Self { runner, config }
    }

    /// Returns the file's audio, video and subtitle streams.
    pub async fn probe_streams(&self, path: &Path) -> Result<ProbedStreams, ProbeError> {
        let audio = self.probe_kind(path, StreamKind::Audio).await?;
        let video = self.probe_kind(path, StreamKind::Video).await?;
        let mut subtitle = self.probe_kind(path, StreamKind::Subtitle).await?;

        if subtitle.iter().any(|s| s.codec_name.is_none()) {
            self.resolve_subtitle_codecs(path, &mut subtitle).await?;
        }

        debug!(
            path = %path.display(),
            audio = audio.len(),
            video = video.len(),
            subtitle = subtitle.len(),
            "probed streams"
        );

        Ok(ProbedStreams {
            audio,
            video,
            subtitle,
        })
    }

    async fn probe_kind(
        &self,
        path: &Path,
        kind: StreamKind,
    ) -> Result<Vec<StreamDescriptor>, ProbeError> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            kind.selector().to_string(),
            "-show_streams".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            path.display().to_string(),
        ];

        let output = self.runner.run(&self.config.tools.ffprobe, &args).await?;
        if !output.success() {
            return Err(ProbeError::Tool {
                tool: self.config.tools.ffprobe.display().to_string(),
                exit_code: output.exit_code,
                diagnostic: output.last_stderr_line,
            });
        }

        ffprobe::parse_streams(kind, &output.stdout)
    }

    /// Backfills missing subtitle codec names from the container inspector.
    async fn resolve_subtitle_codecs(
        &self,
        path: &Path,
        subtitles: &mut [StreamDescriptor],
    ) -> Result<(), ProbeError> {
        let args = vec![path.display().to_string()];
        let output = self.runner.run(&self.config.tools.mkvinfo, &args).await?;
        if !output.success() {
            return Err(ProbeError::Tool {
                tool: self.config.tools.mkvinfo.display().to_string(),
                exit_code: output.exit_code,
                diagnostic: output.last_stderr_line,
            });
        }

        let tracks = mkvinfo::parse_track_codecs(&output.stdout);
        let offset = self.config.pipeline.subtitle_probe_offset;

        for stream in subtitles.iter_mut().filter(|s| s.codec_name.is_none()) {
            let corrected = stream.index as i64 + offset;
            match tracks.get(&corrected) {
                Some(raw) => {
                    stream.codec_name = Some(normalize_codec_id(raw));
                }
                None => {
                    // The offset between the two probers is observed, not
                    // guaranteed; leave the codec unresolved rather than
                    // guess at a neighboring track.
                    warn!(
                        path = %path.display(),
                        stream_index = stream.index,
                        corrected,
                        "fallback prober has no track at corrected index, codec left unresolved"
                    );
                }
            }
        }

        Ok(())
    }
}
