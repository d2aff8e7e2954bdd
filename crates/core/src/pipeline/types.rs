//! Pipeline state and error types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::detect::DetectedAsset;
use crate::exec::ExecError;
use crate::policy;

/// The stages an asset moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Video,
    Audio,
    Segmentation,
    Subtitles,
    Metadata,
    Relocate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Segmentation => "segmentation",
            Self::Subtitles => "subtitles",
            Self::Metadata => "metadata",
            Self::Relocate => "relocate",
        };
        f.write_str(name)
    }
}

/// Errors inside one asset's stage sequence. Isolated per asset unless the
/// run is configured to abort on the first failure.
#[derive(Debug, Error)]
pub enum StageError {
    /// An external tool exited non-zero; carries its last diagnostic line.
    #[error("{tool} failed during the {stage} stage (exit {exit_code}): {diagnostic}")]
    Tool {
        stage: Stage,
        tool: String,
        exit_code: i32,
        diagnostic: String,
    },

    /// The metadata sidecar could not be written.
    #[error("failed to persist metadata sidecar at {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tool could not be spawned at all.
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// Filesystem failure between tool invocations.
    #[error("i/o failure during the {stage} stage: {source}")]
    Io {
        stage: Stage,
        #[source]
        source: std::io::Error,
    },
}

/// Lifecycle of one asset's stage sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "stage", rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running(Stage),
    Done,
    Failed,
}

/// Per-asset state, mutated as the stage sequence advances.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionTask {
    /// Asset base name.
    pub video_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub steps_done: usize,
    pub steps_total: usize,
    pub state: TaskState,
    pub failed: bool,
    pub needs_audio_conversion: bool,
    pub needs_video_conversion: bool,
}

impl ConversionTask {
    /// Opens the task for one asset, deciding up front what needs converting
    /// and how many sub-steps the stage sequence will take.
    pub fn begin(asset: &DetectedAsset) -> Self {
        // The segmenter is stricter than general playback, so the primary
        // video stream must be profile-compliant to be copied.
        let needs_video_conversion = !asset
            .video_streams
            .first()
            .map(|s| policy::is_compliant_profile(s, policy::WEB_SAFE_VIDEO))
            .unwrap_or(false);
        let needs_audio_conversion = !asset
            .audio_streams
            .iter()
            .all(|s| policy::is_compliant_codec(s, policy::WEB_SAFE_AUDIO));

        let n_audio = asset.audio_streams.len();
        let n_subs = asset.subtitle_streams.len();

        Self {
            video_name: asset.base_name.clone(),
            started_at: Utc::now(),
            finished_at: None,
            steps_done: 0,
            // video + per-stream audio + segmentation of each + subtitles
            // + the sidecar write.
            steps_total: 1 + n_audio + 1 + n_audio + n_subs + 1,
            state: TaskState::Pending,
            failed: false,
            needs_audio_conversion,
            needs_video_conversion,
        }
    }
}

/// Run-wide aggregate, published as a full snapshot after every sub-step.
#[derive(Debug, Clone, Serialize)]
pub struct RunProgress {
    pub assets_total: usize,
    pub assets_processed: usize,
    pub assets_failed: usize,
    pub video_streams_copied: u64,
    pub video_streams_transcoded: u64,
    pub audio_streams_copied: u64,
    pub audio_streams_transcoded: u64,
    pub subtitle_tracks_extracted: u64,
    pub subtitle_tracks_skipped: u64,
    pub tasks: Vec<ConversionTask>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunProgress {
    pub fn new(assets_total: usize) -> Self {
        Self {
            assets_total,
            assets_processed: 0,
            assets_failed: 0,
            video_streams_copied: 0,
            video_streams_transcoded: 0,
            audio_streams_copied: 0,
            audio_streams_transcoded: 0,
            subtitle_tracks_extracted: 0,
            subtitle_tracks_skipped: 0,
            tasks: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Whether the run has reached its terminal state.
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}
