//! Stream descriptors produced by probing.

use serde::{Deserialize, Serialize};

/// The kind of a container stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Audio,
    Video,
    Subtitle,
}

impl StreamKind {
    /// The `-select_streams` specifier the primary prober uses.
    pub fn selector(&self) -> &'static str {
        match self {
            Self::Audio => "a",
            Self::Video => "v",
            Self::Subtitle => "s",
        }
    }
}

/// One probed stream. Immutable once built; `codec_name` may start out
/// absent for subtitle streams and be backfilled by the fallback prober.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    /// Container-global stream index as reported by the primary prober.
    pub index: usize,
    pub kind: StreamKind,
    /// Canonical lowercase codec token, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The three stream lists of one container, each in prober order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbedStreams {
    pub audio: Vec<StreamDescriptor>,
    pub video: Vec<StreamDescriptor>,
    pub subtitle: Vec<StreamDescriptor>,
}
