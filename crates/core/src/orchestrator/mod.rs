//! The entry-point facade the transport layer talks to.
//!
//! [`TranscodeOrchestrator`] wires the detector, the single-flight guard,
//! the conversion pipeline and the progress/error sinks together behind two
//! operations:
//!
//! - `detect(force)`: the cached catalog, or a fresh scan; a forced re-scan
//!   during an active run is refused with a distinct busy condition.
//! - `start_transcode()`: guard checks synchronously, then the run is
//!   spawned in the background; the caller observes it through the sinks.

mod runner;
mod types;

pub use runner::TranscodeOrchestrator;
pub use types::{OrchestratorError, StartOutcome};
