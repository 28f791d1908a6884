//! Channel Transcriptor - extract transcripts from whole YouTube channels
//!
//! This library drives a streaming extraction pipeline: it resolves a channel
//! reference, pages through the channel's video list, filters by upload date,
//! fetches per-video transcripts (serially or concurrently) and emits an
//! ordered newline-delimited JSON event stream. An optional analysis step
//! summarizes the collected transcripts with a Gemini call.

pub mod analyze;
pub mod channel;
pub mod cli;
pub mod client;
pub mod config;
pub mod output;
pub mod pipeline;
pub mod providers;
pub mod server;
pub mod stream;

pub use channel::filter::DateFilter;
pub use channel::resolver::resolve_channel_reference;
pub use cli::{Cli, Commands};
pub use config::Config;
pub use pipeline::event::{ExtractionEvent, VideoRef, VideoResult};
pub use pipeline::{ExtractionPipeline, ExtractionRequest, FetchPolicy};

/// Result type used throughout the library
pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

/// Errors that terminate a whole extraction before any per-video work
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Could not determine a channel identifier from: {0}")]
    UnrecognizedChannelReference(String),

    #[error("Failed to fetch the channel's video list: {0}")]
    ListingFailed(String),

    #[error("No videos were found for this channel")]
    NoVideosFound,

    #[error("No videos match the selected date filter")]
    NoVideosMatchFilter,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
