//! Core library for webreel, a batch transcoder that prepares media
//! libraries for web playback.
//!
//! The flow is: [`detect::Detector`] scans the source tree and probes every
//! container ([`probe`]), [`policy`] decides which streams are already
//! web-safe, and [`pipeline::ConversionPipeline`] drives the external
//! toolchain through the ordered stage sequence, publishing progress through
//! [`progress`] and writing one [`metadata`] sidecar per asset.
//! [`orchestrator::TranscodeOrchestrator`] is the facade a transport layer
//! (or the bundled CLI) talks to, with [`guard::JobGuard`] enforcing a
//! single run per process.

pub mod config;
pub mod detect;
pub mod exec;
pub mod guard;
pub mod metadata;
pub mod orchestrator;
pub mod pipeline;
pub mod policy;
pub mod probe;
pub mod progress;
pub mod testing;

pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use detect::{DetectError, DetectedAsset, DetectionProgress, Detector};
pub use exec::{ExecError, ProcessRunner, ToolOutput, ToolRunner};
pub use guard::{GuardError, JobGuard, RunPermit};
pub use metadata::{AudioArtifact, OutputMetadata, SubtitleArtifact, VideoArtifact};
pub use orchestrator::{OrchestratorError, StartOutcome, TranscodeOrchestrator};
pub use pipeline::{ConversionPipeline, ConversionTask, RunProgress, Stage, StageError, TaskState};
pub use probe::{ProbeError, ProbedStreams, StreamDescriptor, StreamKind, StreamProbe};
pub use progress::{ErrorReport, ErrorSink, ProgressPublisher};
