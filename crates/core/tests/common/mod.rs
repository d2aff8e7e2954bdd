//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use tempfile::TempDir;

use webreel_core::exec::{ExecError, ToolOutput};
use webreel_core::pipeline::RunProgress;
use webreel_core::testing::fixtures;
use webreel_core::{Config, TranscodeOrchestrator};

/// A scratch tree with every working root pointed inside it.
pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
}

pub fn test_env() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.paths.source_root = dir.path().join("src");
    config.paths.dest_root = dir.path().join("dest");
    config.paths.temp_root = dir.path().join("tmp");
    config.paths.processed_root = dir.path().join("processed");
    TestEnv { dir, config }
}

impl TestEnv {
    /// Drops a placeholder input container into the source root.
    pub fn seed_source(&self, name: &str) -> std::path::PathBuf {
        std::fs::create_dir_all(&self.config.paths.source_root).unwrap();
        let path = self.config.paths.source_root.join(name);
        std::fs::write(&path, b"mkv").unwrap();
        path
    }

    /// Drops leftover output into the destination root.
    pub fn seed_dest(&self, name: &str) {
        std::fs::create_dir_all(&self.config.paths.dest_root).unwrap();
        std::fs::write(self.config.paths.dest_root.join(name), b"old").unwrap();
    }
}

/// Emulates the full toolchain: canned prober output plus the fake encoder
/// and segmenter from the testing fixtures.
pub fn media_handler(program: &Path, args: &[String]) -> Result<ToolOutput, ExecError> {
    let name = program
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    if name.contains("ffprobe") {
        let json = match args[3].as_str() {
            "a" => fixtures::ffprobe_json(&[(1, "aac", Some("LC"), Some("jpn"), None)]),
            "v" => fixtures::ffprobe_json(&[(0, "h264", Some("High"), None, None)]),
            _ => fixtures::ffprobe_json(&[(2, "ass", None, Some("eng"), None)]),
        };
        return Ok(fixtures::tool_ok(&json));
    }

    fixtures::fake_toolchain(program, args)
}

/// Follows progress snapshots until the run reaches its terminal state.
pub async fn wait_for_finish(orchestrator: &TranscodeOrchestrator) -> RunProgress {
    let mut rx = orchestrator.subscribe_progress();
    loop {
        let finished = rx
            .borrow_and_update()
            .as_ref()
            .filter(|p| p.is_finished())
            .cloned();
        if let Some(progress) = finished {
            return progress;
        }
        rx.changed().await.expect("progress publisher dropped");
    }
}
