//! Testing utilities and mock implementations for integration tests.
//!
//! [`MockRunner`] stands in for the external toolchain, scripting each
//! invocation's outcome and recording what was asked of it, so the detector,
//! probers and pipeline can be exercised without ffmpeg installed.

mod mock_runner;

pub use mock_runner::{MockRunner, RecordedCall};

/// Canned prober outputs and descriptor constructors.
pub mod fixtures {
    use std::path::{Path, PathBuf};

    use crate::detect::DetectedAsset;
    use crate::exec::{ExecError, ToolOutput};
    use crate::probe::{StreamDescriptor, StreamKind};

    /// A clean tool exit with the given stdout.
    pub fn tool_ok(stdout: &str) -> ToolOutput {
        ToolOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            last_stderr_line: String::new(),
        }
    }

    /// A failed tool exit with the given diagnostic line.
    pub fn tool_err(exit_code: i32, last_stderr_line: &str) -> ToolOutput {
        ToolOutput {
            exit_code,
            stdout: String::new(),
            last_stderr_line: last_stderr_line.to_string(),
        }
    }

    /// Builds ffprobe-shaped JSON from `(index, codec, profile, language,
    /// title)` tuples.
    pub fn ffprobe_json(
        streams: &[(usize, &str, Option<&str>, Option<&str>, Option<&str>)],
    ) -> String {
        let streams: Vec<serde_json::Value> = streams
            .iter()
            .map(|(index, codec, profile, language, title)| {
                let mut tags = serde_json::Map::new();
                if let Some(language) = language {
                    tags.insert("language".into(), (*language).into());
                }
                if let Some(title) = title {
                    tags.insert("title".into(), (*title).into());
                }
                let mut stream = serde_json::Map::new();
                stream.insert("index".into(), (*index).into());
                stream.insert("codec_name".into(), (*codec).into());
                if let Some(profile) = profile {
                    stream.insert("profile".into(), (*profile).into());
                }
                stream.insert("tags".into(), tags.into());
                stream.into()
            })
            .collect();
        serde_json::json!({ "streams": streams }).to_string()
    }

    /// A stream descriptor with the common fields filled in.
    pub fn stream(
        kind: StreamKind,
        index: usize,
        codec: &str,
        profile: Option<&str>,
        language: Option<&str>,
        title: Option<&str>,
    ) -> StreamDescriptor {
        StreamDescriptor {
            index,
            kind,
            codec_name: Some(codec.to_string()),
            profile: profile.map(str::to_string),
            language: language.map(str::to_string),
            title: title.map(str::to_string),
        }
    }

    /// A detected asset rooted at `source_path`.
    pub fn asset(
        source_path: impl Into<PathBuf>,
        audio: Vec<StreamDescriptor>,
        video: Vec<StreamDescriptor>,
        subtitle: Vec<StreamDescriptor>,
    ) -> DetectedAsset {
        let source_path = source_path.into();
        let base_name = source_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        DetectedAsset {
            source_path,
            base_name,
            audio_streams: audio,
            video_streams: video,
            subtitle_streams: subtitle,
        }
    }

    /// Emulates the toolchain for pipeline tests: creates the files each
    /// tool would have produced and exits cleanly.
    pub fn fake_toolchain(program: &Path, args: &[String]) -> Result<ToolOutput, ExecError> {
        let name = program
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if name.contains("mp4box") {
            let out_idx = args
                .iter()
                .position(|a| a == "-out")
                .expect("segmenter invocations carry -out");
            let mpd = PathBuf::from(&args[out_idx + 1]);
            let input = PathBuf::from(args.last().expect("segmenter input"));
            let stem = input.file_stem().unwrap().to_string_lossy().to_string();
            let init = input.with_file_name(format!("{stem}_dashinit.mp4"));
            std::fs::write(&mpd, format!("<MPD media=\"{stem}\"/>\n")).unwrap();
            std::fs::write(&init, b"init").unwrap();
            return Ok(tool_ok(""));
        }

        if name.contains("ffprobe") || name.contains("mkvinfo") {
            return Ok(tool_ok("{}"));
        }

        // ffmpeg: the last argument is the output file.
        let output = PathBuf::from(args.last().expect("encoder output path"));
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let content: &[u8] = match output.extension().and_then(|e| e.to_str()) {
            Some("ass" | "ssa" | "srt" | "vtt") => b"Dialogue: sample subtitle line\n",
            _ => b"media",
        };
        std::fs::write(&output, content).unwrap();
        Ok(tool_ok(""))
    }
}
