//! Typed configuration sections.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Working directory roots.
    #[serde(default)]
    pub paths: PathsConfig,
    /// External tool locations.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Pipeline behavior toggles.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// The directory roots the run operates on. All are created on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Scanned for input containers.
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Receives the output tree, mirroring the source's relative layout.
    #[serde(default = "default_dest_root")]
    pub dest_root: PathBuf,

    /// Scratch space for subtitle extraction.
    #[serde(default = "default_temp_root")]
    pub temp_root: PathBuf,

    /// Where fully-processed sources are relocated when
    /// [`PipelineConfig::relocate_processed`] is set.
    #[serde(default = "default_processed_root")]
    pub processed_root: PathBuf,
}

/// Paths (or bare names resolved via PATH) of the external toolchain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: PathBuf,

    /// Text-based container inspector, used only as the subtitle codec
    /// fallback prober.
    #[serde(default = "default_mkvinfo")]
    pub mkvinfo: PathBuf,

    /// The DASH segmenter.
    #[serde(default = "default_mp4box")]
    pub mp4box: PathBuf,
}

/// Pipeline behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Container extension scanned for under the source root.
    #[serde(default = "default_input_extension")]
    pub input_extension: String,

    /// Clear the destination root before a run instead of refusing to start
    /// into a non-empty one.
    #[serde(default)]
    pub clear_destination: bool,

    /// Stop the whole run at the first failed asset instead of continuing
    /// with the rest.
    #[serde(default)]
    pub abort_on_failure: bool,

    /// Move fully-processed sources to the processed root so re-runs skip
    /// them.
    #[serde(default)]
    pub relocate_processed: bool,

    /// DASH segment duration handed to the segmenter, in milliseconds.
    #[serde(default = "default_segment_duration_ms")]
    pub segment_duration_ms: u64,

    /// Keyframe interval forced on re-encodes so segment boundaries land on
    /// keyframes.
    #[serde(default = "default_keyframe_interval")]
    pub keyframe_interval: u32,

    /// Offset between the primary prober's stream indices and the fallback
    /// prober's track numbers. Observed to be 1 (the fallback counts the
    /// container itself as entry zero), but empirical, so overridable.
    #[serde(default = "default_subtitle_probe_offset")]
    pub subtitle_probe_offset: i64,
}

fn default_source_root() -> PathBuf {
    PathBuf::from("src")
}

fn default_dest_root() -> PathBuf {
    PathBuf::from("dest")
}

fn default_temp_root() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_processed_root() -> PathBuf {
    PathBuf::from("processed")
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_mkvinfo() -> PathBuf {
    PathBuf::from("mkvinfo")
}

fn default_mp4box() -> PathBuf {
    PathBuf::from("MP4Box")
}

fn default_input_extension() -> String {
    "mkv".to_string()
}

fn default_segment_duration_ms() -> u64 {
    4000
}

fn default_keyframe_interval() -> u32 {
    48
}

fn default_subtitle_probe_offset() -> i64 {
    1
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            dest_root: default_dest_root(),
            temp_root: default_temp_root(),
            processed_root: default_processed_root(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
            mkvinfo: default_mkvinfo(),
            mp4box: default_mp4box(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_extension: default_input_extension(),
            clear_destination: false,
            abort_on_failure: false,
            relocate_processed: false,
            segment_duration_ms: default_segment_duration_ms(),
            keyframe_interval: default_keyframe_interval(),
            subtitle_probe_offset: default_subtitle_probe_offset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.paths.source_root, PathBuf::from("src"));
        assert_eq!(config.paths.dest_root, PathBuf::from("dest"));
        assert_eq!(config.tools.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(config.pipeline.input_extension, "mkv");
        assert_eq!(config.pipeline.segment_duration_ms, 4000);
        assert_eq!(config.pipeline.subtitle_probe_offset, 1);
        assert!(!config.pipeline.clear_destination);
        assert!(!config.pipeline.abort_on_failure);
        assert!(!config.pipeline.relocate_processed);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(
            parsed.pipeline.keyframe_interval,
            config.pipeline.keyframe_interval
        );
        assert_eq!(parsed.paths.dest_root, config.paths.dest_root);
    }
}
