//! Parsing of the fallback (text) prober's track listing.
//!
//! The primary prober sometimes reports no codec for subtitle tracks it does
//! not recognize; the container inspector still names them. Its track numbers
//! do not line up with the primary prober's stream indices (it counts the
//! container itself as entry zero), so callers correct by a configured offset
//! before matching.

use regex_lite::Regex;
use std::collections::HashMap;

/// Maps a track number to its raw codec identifier.
pub(super) fn parse_track_codecs(output: &str) -> HashMap<i64, String> {
    // Lines look like:
    // |  + Track number: 3 (track ID for mkvmerge & mkvextract: 2)
    // |  + Codec ID: S_TEXT/ASS
    let track_re = Regex::new(r"Track number: (\d+)").expect("static regex");
    let codec_re = Regex::new(r"Codec ID: (\S+)").expect("static regex");

    let mut tracks = HashMap::new();
    let mut current_track: Option<i64> = None;

    for line in output.lines() {
        if let Some(caps) = track_re.captures(line) {
            current_track = caps[1].parse().ok();
        } else if let Some(caps) = codec_re.captures(line) {
            if let Some(number) = current_track {
                tracks.insert(number, caps[1].to_string());
            }
        }
    }

    tracks
}

/// Normalizes a codec identifier (container codec ID or prober codec name)
/// to the canonical lowercase token the policy tables use.
pub fn normalize_codec_id(raw: &str) -> String {
    match raw {
        "S_TEXT/ASS" | "S_ASS" => "ass".to_string(),
        "S_TEXT/SSA" | "S_SSA" => "ssa".to_string(),
        "S_TEXT/UTF8" | "S_TEXT/ASCII" => "subrip".to_string(),
        "S_TEXT/WEBVTT" | "D_WEBVTT/SUBTITLES" => "webvtt".to_string(),
        other => other.to_ascii_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
+ EBML head
+ Segment: size 1234567
|+ Tracks
| + Track
|  + Track number: 1 (track ID for mkvmerge & mkvextract: 0)
|  + Track type: video
|  + Codec ID: V_MPEG4/ISO/AVC
| + Track
|  + Track number: 2 (track ID for mkvmerge & mkvextract: 1)
|  + Track type: audio
|  + Codec ID: A_AAC
| + Track
|  + Track number: 3 (track ID for mkvmerge & mkvextract: 2)
|  + Track type: subtitles
|  + Codec ID: S_TEXT/ASS
";

    #[test]
    fn test_parse_track_codecs() {
        let tracks = parse_track_codecs(SAMPLE);
        assert_eq!(tracks.len(), 3);
        assert_eq!(tracks[&1], "V_MPEG4/ISO/AVC");
        assert_eq!(tracks[&2], "A_AAC");
        assert_eq!(tracks[&3], "S_TEXT/ASS");
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_track_codecs("").is_empty());
    }

    #[test]
    fn test_codec_id_without_track_number_is_ignored() {
        let tracks = parse_track_codecs("|  + Codec ID: S_TEXT/ASS\n");
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_normalize_matroska_subtitle_ids() {
        assert_eq!(normalize_codec_id("S_TEXT/ASS"), "ass");
        assert_eq!(normalize_codec_id("S_TEXT/SSA"), "ssa");
        assert_eq!(normalize_codec_id("S_TEXT/UTF8"), "subrip");
        assert_eq!(normalize_codec_id("S_TEXT/WEBVTT"), "webvtt");
        assert_eq!(normalize_codec_id("D_WEBVTT/SUBTITLES"), "webvtt");
    }

    #[test]
    fn test_normalize_passes_other_ids_through_lowercased() {
        assert_eq!(normalize_codec_id("H264"), "h264");
        assert_eq!(normalize_codec_id("hevc"), "hevc");
        assert_eq!(normalize_codec_id("S_HDMV/PGS"), "s_hdmv/pgs");
    }
}
