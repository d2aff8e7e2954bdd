//! Orchestrator outcome and error types.

use serde::Serialize;
use thiserror::Error;

use crate::detect::DetectError;
use crate::guard::GuardError;

/// What happened to a start request. `Busy` and `DestinationNotEmpty` are
/// refusals reported back without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// The run was accepted and is now executing in the background.
    Accepted,
    /// A run is already active.
    Busy,
    /// The destination root holds prior output and clearing was not
    /// configured.
    DestinationNotEmpty,
}

/// Unexpected failures preparing a run or a catalog.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Guard(#[from] GuardError),
}
