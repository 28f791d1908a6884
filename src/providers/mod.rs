use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod listing;
pub mod summarize;
pub mod transcript;

use crate::Result;

/// A single raw video item as returned by the listing provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoItem {
    /// Provider video identifier (unique within a channel)
    pub video_id: String,

    /// Video title
    pub title: String,

    /// Relative upload label such as "3 weeks ago", when the provider has one
    pub published_text: Option<String>,
}

/// One page of a channel's video list
#[derive(Debug, Clone, Default)]
pub struct VideoPage {
    /// Items in the order the provider returned them (newest first)
    pub items: Vec<VideoItem>,

    /// Opaque cursor for the next page; absent on the last page
    pub continuation: Option<String>,
}

/// A timed fragment of transcript text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptFragment {
    /// Fragment text
    pub text: String,

    /// Offset from the start of the video in seconds
    pub start: f64,
}

/// Why a transcript fetch failed for one video
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("transcripts are disabled for this video")]
    Disabled,

    #[error("no transcript available for this video")]
    NotFound,

    #[error("transcript fetch failed: {0}")]
    Other(String),
}

/// Paged channel video listing boundary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoListing: Send + Sync {
    /// Fetch one page of the channel's videos, newest first.
    /// `continuation` is the cursor from the previous page, if any.
    async fn list_page(
        &self,
        channel_id: &str,
        continuation: Option<String>,
    ) -> Result<VideoPage>;
}

/// Per-video transcript boundary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript fragments for one video in the given language.
    async fn fetch(
        &self,
        video_id: &str,
        language: &str,
    ) -> std::result::Result<Vec<TranscriptFragment>, TranscriptError>;
}

/// Large-language-model summarization boundary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Run the prompt and return the generated analysis text.
    async fn summarize(&self, prompt: &str) -> Result<String>;
}
