//! The conversion pipeline.
//!
//! For each detected asset, in catalog order, the pipeline runs an ordered
//! stage sequence against the external toolchain:
//!
//! 1. **Video**: copy or re-encode the first video stream into an
//!    intermediate file.
//! 2. **Audio**: extract every audio stream into its own file, copying
//!    already-compliant codecs.
//! 3. **Segmentation**: DASH-segment the video and each audio file,
//!    embedding the manifests into the sidecar and deleting the
//!    intermediates.
//! 4. **Subtitles**: extract accepted text formats through scratch files.
//! 5. **Metadata**: persist the sidecar.
//!
//! Execution is strictly sequential: one tool invocation at a time, within
//! and across assets. Progress snapshots are published after every sub-step.

mod runner;
mod types;

pub use runner::ConversionPipeline;
pub use types::{ConversionTask, RunProgress, Stage, StageError, TaskState};
