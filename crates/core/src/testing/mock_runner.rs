//! A scripted `ToolRunner`.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::exec::{ExecError, ToolOutput, ToolRunner};

type Handler = dyn Fn(&Path, &[String]) -> Result<ToolOutput, ExecError> + Send + Sync;

/// One recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
}

/// A `ToolRunner` whose behavior is a closure; every invocation is recorded.
pub struct MockRunner {
    handler: Box<Handler>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRunner {
    /// Scripts the runner with a handler deciding each invocation's outcome
    /// (and performing any filesystem side effects the real tool would).
    pub fn new(
        handler: impl Fn(&Path, &[String]) -> Result<ToolOutput, ExecError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A runner where every tool exits cleanly with no output.
    pub fn succeeding() -> Self {
        Self::new(|_, _| {
            Ok(ToolOutput {
                exit_code: 0,
                stdout: String::new(),
                last_stderr_line: String::new(),
            })
        })
    }

    /// Sleeps before each invocation, for tests racing an active run.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Everything that has been asked of the runner, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The recorded invocations of one program, matched on file name.
    pub fn calls_of(&self, program: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                Path::new(&call.program)
                    .file_name()
                    .map(|n| n.to_string_lossy().eq_ignore_ascii_case(program))
                    .unwrap_or(false)
            })
            .collect()
    }
}

#[async_trait]
impl ToolRunner for MockRunner {
    async fn run(&self, program: &Path, args: &[String]) -> Result<ToolOutput, ExecError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(RecordedCall {
            program: program.display().to_string(),
            args: args.to_vec(),
        });
        (self.handler)(program, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_records_calls() {
        let runner = MockRunner::succeeding();
        runner
            .run(Path::new("ffmpeg"), &["-y".to_string()])
            .await
            .unwrap();
        runner.run(Path::new("MP4Box"), &[]).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].program, "ffmpeg");
        assert_eq!(calls[0].args, vec!["-y".to_string()]);
        assert_eq!(runner.calls_of("mp4box").len(), 1);
    }
}
