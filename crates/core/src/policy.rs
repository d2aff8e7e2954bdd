//! Web-safe codec policy.
//!
//! Static tables of what browsers can play without a re-encode, and the two
//! predicates the pipeline bases its copy-vs-transcode decisions on. Profile
//! compliance is the stricter check: it requires a codec match first, so
//! `is_compliant_profile` implies `is_compliant_codec` and never the other
//! way around.

use crate::probe::StreamDescriptor;

/// One acceptable codec, optionally narrowed to a set of profiles.
///
/// No profile list means any profile of that codec is acceptable.
#[derive(Debug, Clone, Copy)]
pub struct CodecRequirement {
    pub codec: &'static str,
    pub profiles: Option<&'static [&'static str]>,
}

/// Audio codecs browsers play directly. AAC is the transcode target; MP3 is
/// the one other codec eligible for stream copy.
pub const WEB_SAFE_AUDIO: &[CodecRequirement] = &[
    CodecRequirement {
        codec: "aac",
        profiles: Some(&["lc"]),
    },
    CodecRequirement {
        codec: "mp3",
        profiles: None,
    },
];

/// Video codecs the segmenter accepts. The profile restriction matters here:
/// the segmenter chokes on streams general playback would tolerate.
pub const WEB_SAFE_VIDEO: &[CodecRequirement] = &[CodecRequirement {
    codec: "h264",
    profiles: Some(&["high"]),
}];

/// Text subtitle formats the player understands; anything else (bitmap
/// formats in particular) is skipped rather than extracted.
pub const EXTRACTABLE_SUBTITLES: &[&str] = &["ass", "subrip", "ssa", "webvtt"];

/// The target audio codec for re-encodes.
pub const TARGET_AUDIO_CODEC: &str = "aac";

fn find_requirement<'a>(
    stream: &StreamDescriptor,
    requirements: &'a [CodecRequirement],
) -> Option<&'a CodecRequirement> {
    let codec = stream.codec_name.as_deref()?;
    requirements
        .iter()
        .find(|req| req.codec.eq_ignore_ascii_case(codec))
}

/// Whether the stream's codec is in the requirement table.
pub fn is_compliant_codec(stream: &StreamDescriptor, requirements: &[CodecRequirement]) -> bool {
    find_requirement(stream, requirements).is_some()
}

/// Whether the stream's codec *and* profile are acceptable.
///
/// An absent profile is compared as the empty string, so a codec with a
/// profile restriction never matches a stream that reports no profile.
pub fn is_compliant_profile(stream: &StreamDescriptor, requirements: &[CodecRequirement]) -> bool {
    let Some(req) = find_requirement(stream, requirements) else {
        return false;
    };
    match req.profiles {
        None => true,
        Some(profiles) => {
            let profile = stream.profile.as_deref().unwrap_or("");
            profiles.iter().any(|p| p.eq_ignore_ascii_case(profile))
        }
    }
}

/// Whether a subtitle stream can be extracted as text.
pub fn is_extractable_subtitle(stream: &StreamDescriptor) -> bool {
    stream
        .codec_name
        .as_deref()
        .map(|codec| {
            EXTRACTABLE_SUBTITLES
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(codec))
        })
        .unwrap_or(false)
}
