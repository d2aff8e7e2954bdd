//! Subprocess primitive for driving the external toolchain.
//!
//! Everything the pipeline does to the outside world goes through the
//! [`ToolRunner`] trait: run a program, wait for it, and come back with the
//! exit code, the full stdout text, and the last line the tool wrote to
//! stderr. Encoders log their progress to stderr continuously; only the final
//! line is worth keeping as a diagnostic when something goes wrong.
//!
//! Invocations have no timeout. A hung tool hangs the run; that is a known
//! limitation of the single-flight design, not something the runner papers
//! over.

mod process;

pub use process::ProcessRunner;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Outcome of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit code (`-1` when terminated by a signal).
    pub exit_code: i32,
    /// Full standard output, decoded lossily.
    pub stdout: String,
    /// The last non-empty line written to standard error.
    pub last_stderr_line: String,
}

impl ToolOutput {
    /// Whether the tool exited cleanly.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Errors spawning or waiting on an external tool.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The program is not installed or not on PATH.
    #[error("{program} not found, is it installed and on PATH?")]
    NotFound { program: String },

    /// Any other I/O failure while running the program.
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs external programs and captures their output.
///
/// The pipeline and probers consume this trait rather than spawning processes
/// directly, so tests can script the toolchain without ffmpeg installed.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Runs `program` with `args`, waiting for it to exit.
    async fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput, ExecError>;
}
