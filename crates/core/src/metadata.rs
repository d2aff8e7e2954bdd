//! Sidecar metadata.
//!
//! One JSON document per asset, written next to the produced artifacts,
//! describing the segmented video, every segmented audio stream (with its
//! manifest embedded as text), and every extracted subtitle track. The
//! `video`, `audios` and `subtitles` fields are always present, even when
//! empty: consumers key on them unconditionally.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The segmented video artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoArtifact {
    /// File name of the initialization segment, relative to the sidecar.
    pub init_segment: String,
    /// The adaptive-streaming manifest, embedded as text.
    pub manifest: String,
}

/// One segmented audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioArtifact {
    pub language: Option<String>,
    pub title: Option<String>,
    /// Codec of the produced stream (the target codec after a re-encode).
    pub codec: String,
    pub init_segment: String,
    pub manifest: String,
}

/// One extracted subtitle track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleArtifact {
    /// Canonical format token, e.g. `ass` or `subrip`.
    pub format: String,
    pub language: Option<String>,
    /// Display label; falls back to `Subtitle Stream N` when the source
    /// carries neither title nor language.
    pub title: String,
    /// The full subtitle text.
    pub text: String,
}

/// The per-asset sidecar document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputMetadata {
    /// Asset base name.
    pub name: String,
    pub video: Option<VideoArtifact>,
    pub audios: Vec<AudioArtifact>,
    pub subtitles: Vec<SubtitleArtifact>,
}

impl OutputMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            video: None,
            audios: Vec::new(),
            subtitles: Vec::new(),
        }
    }
}

/// File name of an asset's sidecar.
pub fn sidecar_file_name(base_name: &str) -> String {
    format!("{base_name}-metadata.json")
}

/// Persists the sidecar. Failure here is fatal to the asset's task: output
/// without its descriptor is unusable.
pub async fn write_sidecar(path: &Path, metadata: &OutputMetadata) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(metadata)?;
    tokio::fs::write(path, json).await
}
