use serde::{Deserialize, Serialize};

/// Placeholder transcript for videos where captions are switched off
pub const PLACEHOLDER_DISABLED: &str = "[Transcript is disabled for this video]";

/// Placeholder transcript for videos with no matching transcript
pub const PLACEHOLDER_NOT_AVAILABLE: &str = "[Transcript not available for this video]";

/// Placeholder transcript for any other per-video fetch failure
pub const PLACEHOLDER_FETCH_FAILED: &str = "[Transcript fetch failed]";

/// Canonical watch URL for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// A video as listed from a channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    /// Provider video identifier
    pub id: String,

    /// Video title
    pub title: String,

    /// Canonical watch URL derived from the id
    pub url: String,
}

/// A listed video together with its transcript text (or a placeholder)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResult {
    /// Provider video identifier
    pub id: String,

    /// Video title
    pub title: String,

    /// Canonical watch URL
    pub url: String,

    /// Concatenated transcript text, or one of the fixed placeholders
    pub transcript: String,
}

impl VideoResult {
    pub fn new(video: VideoRef, transcript: String) -> Self {
        Self {
            id: video.id,
            title: video.title,
            url: video.url,
            transcript,
        }
    }
}

/// One event on the extraction stream.
///
/// A well-formed stream carries zero or one `Total` before any per-video
/// event, then `Progress`/`Transcript` pairs, and ends with exactly one of
/// `Done` or `Error` -- unless the requester cancelled, in which case the
/// stream simply stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtractionEvent {
    /// Number of videos that survived filtering; sent once, first
    Total { count: usize },

    /// Per-video progress; `count` is 1-based and never decreases
    Progress {
        count: usize,
        total: usize,
        message: String,
    },

    /// A processed video with its transcript (or placeholder)
    Transcript { data: VideoResult },

    /// Terminal failure; nothing follows
    Error { message: String },

    /// Terminal success; nothing follows
    Done { message: String },
}

impl ExtractionEvent {
    /// Whether this event ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExtractionEvent::Error { .. } | ExtractionEvent::Done { .. })
    }
}
