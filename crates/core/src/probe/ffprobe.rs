//! Parsing of the primary (JSON) prober's output.

use serde::Deserialize;

use super::mkvinfo::normalize_codec_id;
use super::types::{StreamDescriptor, StreamKind};
use super::ProbeError;

#[derive(Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize)]
struct FfprobeStream {
    index: usize,
    codec_name: Option<String>,
    profile: Option<String>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Deserialize, Default)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

/// Parses one `-select_streams` invocation's JSON into descriptors,
/// preserving the prober's ordering.
pub(super) fn parse_streams(kind: StreamKind, json: &str) -> Result<Vec<StreamDescriptor>, ProbeError> {
    let output: FfprobeOutput = serde_json::from_str(json).map_err(|e| ProbeError::Parse {
        tool: "ffprobe".to_string(),
        reason: e.to_string(),
    })?;

    Ok(output
        .streams
        .into_iter()
        .map(|s| StreamDescriptor {
            index: s.index,
            kind,
            codec_name: s.codec_name.as_deref().map(normalize_codec_id),
            profile: s.profile,
            language: s.tags.language,
            title: s.tags.title,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_audio_streams() {
        let json = r#"{
            "streams": [
                {
                    "index": 1,
                    "codec_name": "aac",
                    "profile": "LC",
                    "tags": { "language": "jpn", "title": "Stereo" }
                },
                {
                    "index": 2,
                    "codec_name": "flac",
                    "tags": { "language": "eng" }
                }
            ]
        }"#;

        let streams = parse_streams(StreamKind::Audio, json).unwrap();
        assert_eq!(streams.len(), 2);
        assert_eq!(streams[0].index, 1);
        assert_eq!(streams[0].codec_name.as_deref(), Some("aac"));
        assert_eq!(streams[0].profile.as_deref(), Some("LC"));
        assert_eq!(streams[0].language.as_deref(), Some("jpn"));
        assert_eq!(streams[0].title.as_deref(), Some("Stereo"));
        assert_eq!(streams[1].codec_name.as_deref(), Some("flac"));
        assert_eq!(streams[1].title, None);
    }

    #[test]
    fn test_parse_subtitle_stream_without_codec_name() {
        let json = r#"{
            "streams": [
                { "index": 3, "tags": { "language": "eng" } }
            ]
        }"#;

        let streams = parse_streams(StreamKind::Subtitle, json).unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].codec_name, None);
        assert_eq!(streams[0].kind, StreamKind::Subtitle);
    }

    #[test]
    fn test_parse_no_streams_key() {
        let streams = parse_streams(StreamKind::Video, "{}").unwrap();
        assert!(streams.is_empty());
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = parse_streams(StreamKind::Video, "not json");
        assert!(matches!(result, Err(ProbeError::Parse { .. })));
    }

    #[test]
    fn test_codec_names_are_normalized() {
        let json = r#"{"streams": [{"index": 0, "codec_name": "H264"}]}"#;
        let streams = parse_streams(StreamKind::Video, json).unwrap();
        assert_eq!(streams[0].codec_name.as_deref(), Some("h264"));
    }
}
