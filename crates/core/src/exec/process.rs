//! `ToolRunner` backed by real child processes.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use super::{ExecError, ToolOutput, ToolRunner};

/// Spawns tools with `tokio::process`, stdout and stderr piped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput, ExecError> {
        debug!(program = %program.display(), ?args, "running external tool");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExecError::NotFound {
                        program: program.display().to_string(),
                    }
                } else {
                    ExecError::Io {
                        program: program.display().to_string(),
                        source: e,
                    }
                }
            })?;

        let io_err = |e| ExecError::Io {
            program: program.display().to_string(),
            source: e,
        };

        let mut stdout_pipe = child.stdout.take().expect("stdout should be captured");
        let stderr_pipe = child.stderr.take().expect("stderr should be captured");

        // Encoders stream progress to stderr for the whole run; only the last
        // line matters as a diagnostic, so drain it line-by-line instead of
        // buffering everything.
        let stderr_task = async {
            let mut lines = BufReader::new(stderr_pipe).lines();
            let mut last = String::new();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    last = line;
                }
            }
            last
        };

        let stdout_task = async {
            let mut text = String::new();
            let _ = stdout_pipe.read_to_string(&mut text).await;
            text
        };

        let (stdout, last_stderr_line) = tokio::join!(stdout_task, stderr_task);

        let status = child.wait().await.map_err(io_err)?;

        Ok(ToolOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            last_stderr_line,
        })
    }
}
