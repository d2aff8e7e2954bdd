//! Asset detection.
//!
//! Scans the source tree for input containers, probes each one, and returns
//! the catalog of detected assets in enumeration order. Scanning never
//! mutates files and is safe to re-run at any time; a file that cannot be
//! probed is logged and omitted from the catalog rather than failing the
//! scan.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::exec::ToolRunner;
use crate::probe::{StreamDescriptor, StreamProbe};

/// One detected source file and its probed stream layout. Read-only after
/// the scan; no two assets share a `source_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedAsset {
    pub source_path: PathBuf,
    /// File name without the container extension.
    pub base_name: String,
    pub audio_streams: Vec<StreamDescriptor>,
    pub video_streams: Vec<StreamDescriptor>,
    pub subtitle_streams: Vec<StreamDescriptor>,
}

/// Scan progress, reported after every probed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectionProgress {
    pub scanned: usize,
    pub total: usize,
}

/// Errors producing a catalog.
#[derive(Debug, Error)]
pub enum DetectError {
    /// A forced re-scan raced an active transcode run; file state is in
    /// flux, so the caller gets a distinct busy condition.
    #[error("a transcode run is active, refusing forced re-scan")]
    Busy,

    #[error("i/o error scanning source tree: {0}")]
    Io(#[from] std::io::Error),
}

/// Scans the source root and probes every input container found.
pub struct Detector {
    probe: StreamProbe,
    config: Config,
}

impl Detector {
    pub fn new(runner: Arc<dyn ToolRunner>, config: Config) -> Self {
        Self {
            probe: StreamProbe::new(runner, config.clone()),
            config,
        }
    }

    /// Scans without progress reporting.
    pub async fn scan(&self) -> Result<Vec<DetectedAsset>, DetectError> {
        self.scan_with_progress(|_| {}).await
    }

    /// Scans the source tree, invoking `on_progress` after each probed file.
    pub async fn scan_with_progress(
        &self,
        on_progress: impl Fn(DetectionProgress),
    ) -> Result<Vec<DetectedAsset>, DetectError> {
        self.ensure_working_dirs().await?;

        let files = self.enumerate_inputs()?;
        let total = files.len();
        info!(total, root = %self.config.paths.source_root.display(), "scanning source tree");

        let mut assets = Vec::with_capacity(total);
        for (scanned, path) in files.into_iter().enumerate() {
            match self.probe.probe_streams(&path).await {
                Ok(probed) => {
                    let base_name = path
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_string())
                        .unwrap_or_default();
                    assets.push(DetectedAsset {
                        source_path: path,
                        base_name,
                        audio_streams: probed.audio,
                        video_streams: probed.video,
                        subtitle_streams: probed.subtitle,
                    });
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unprobeable file");
                }
            }
            on_progress(DetectionProgress {
                scanned: scanned + 1,
                total,
            });
        }

        info!(detected = assets.len(), "scan complete");
        Ok(assets)
    }

    /// Creates the working roots if absent. Idempotent.
    async fn ensure_working_dirs(&self) -> std::io::Result<()> {
        let paths = &self.config.paths;
        tokio::fs::create_dir_all(&paths.source_root).await?;
        tokio::fs::create_dir_all(&paths.dest_root).await?;
        tokio::fs::create_dir_all(&paths.temp_root).await?;
        Ok(())
    }

    /// All input containers under the source root, in deterministic
    /// enumeration order.
    fn enumerate_inputs(&self) -> Result<Vec<PathBuf>, DetectError> {
        let extension = &self.config.pipeline.input_extension;
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.config.paths.source_root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                DetectError::Io(e.into_io_error().unwrap_or_else(|| {
                    std::io::Error::other("walk entry without i/o cause")
                }))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().eq_ignore_ascii_case(extension))
                .unwrap_or(false);
            if matches {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }
}
