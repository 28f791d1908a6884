//! Client-side consumer for the extraction event stream.
//!
//! Issues one cancellable request per extraction attempt, decodes the
//! newline-delimited event body incrementally and folds events into a local
//! [`ExtractionState`]. Cancelling is not an error: the stream just stops and
//! the state keeps whatever had arrived by then.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::analyze::{AnalyzeRequest, AnalyzeResponse};
use crate::channel::filter::DateFilter;
use crate::pipeline::event::{ExtractionEvent, VideoRef, VideoResult};
use crate::pipeline::{ExtractionRequest, FetchPolicy};
use crate::stream::LineDecoder;

/// Client-side progress counters; `current` and `total` never decrease.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Accumulated view of one extraction as seen by the consumer
#[derive(Debug, Clone, Default)]
pub struct ExtractionState {
    pub progress: Progress,

    /// Results in arrival order; append-only, never reordered or deduplicated
    pub transcripts: Vec<VideoResult>,

    /// Set by the terminal `done` event
    pub completed: bool,

    /// Set by the terminal `error` event
    pub error: Option<String>,

    /// Set when the requester cancelled; never treated as an error
    pub cancelled: bool,
}

impl ExtractionState {
    /// Fold one decoded event into the state.
    pub fn apply(&mut self, event: &ExtractionEvent) {
        match event {
            ExtractionEvent::Total { count } => {
                self.progress.total = self.progress.total.max(*count);
            }
            ExtractionEvent::Progress {
                count,
                total,
                message,
            } => {
                self.progress.current = self.progress.current.max(*count);
                self.progress.total = self.progress.total.max(*total);
                self.progress.message = message.clone();
            }
            ExtractionEvent::Transcript { data } => {
                self.transcripts.push(data.clone());
            }
            ExtractionEvent::Error { message } => {
                self.error = Some(message.clone());
            }
            ExtractionEvent::Done { message } => {
                self.completed = true;
                self.progress.message = message.clone();
            }
        }
    }
}

/// HTTP client for the extraction API with at most one active extraction
/// per session.
pub struct ExtractClient {
    http: reqwest::Client,
    base_url: String,
    active: Mutex<Option<CancellationToken>>,
}

impl ExtractClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http,
            base_url,
            active: Mutex::new(None),
        }
    }

    /// Cancel the in-flight extraction, if any.
    pub async fn cancel(&self) {
        if let Some(token) = self.active.lock().await.as_ref() {
            token.cancel();
        }
    }

    /// Cancel any prior extraction and register a fresh token for this one.
    async fn begin_session(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut active = self.active.lock().await;
        if let Some(previous) = active.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Run one streamed extraction, invoking `on_event` for every decoded
    /// event. An HTTP failure before the stream starts is an `Err`; an
    /// in-stream `error` event lands in `ExtractionState::error` instead.
    pub async fn run_extraction(
        &self,
        request: &ExtractionRequest,
        mut on_event: impl FnMut(&ExtractionEvent),
    ) -> Result<ExtractionState> {
        let cancel = self.begin_session().await;

        let url = format!(
            "{}/api/extract?channel={}&language={}&date_filter={}&policy={}",
            self.base_url,
            urlencoding::encode(&request.channel_reference),
            urlencoding::encode(&request.language),
            date_filter_query(request.date_filter),
            policy_query(request.policy),
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Extraction request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Extraction rejected with HTTP {}", response.status());
        }

        let mut state = ExtractionState::default();
        let mut decoder = LineDecoder::new();
        let mut body = response.bytes_stream();

        'read: loop {
            let chunk = tokio::select! {
                chunk = body.next() => chunk,
                _ = cancel.cancelled() => {
                    state.cancelled = true;
                    break 'read;
                }
            };

            let chunk = match chunk {
                Some(chunk) => chunk.context("Failed to read event stream")?,
                None => break 'read,
            };

            for event in decoder.push(&chunk) {
                state.apply(&event);
                on_event(&event);
                if event.is_terminal() {
                    break 'read;
                }
            }
        }

        if !state.completed && state.error.is_none() {
            if let Some(event) = decoder.finish() {
                state.apply(&event);
                on_event(&event);
            }
        }

        Ok(state)
    }

    /// Fetch a channel's video list without transcripts.
    pub async fn fetch_videos(&self, channel_reference: &str) -> Result<Vec<VideoRef>> {
        let url = format!(
            "{}/api/videos?channel={}",
            self.base_url,
            urlencoding::encode(channel_reference)
        );

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Video listing request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Video listing rejected with HTTP {}", response.status());
        }

        response
            .json()
            .await
            .context("Failed to parse video listing response")
    }

    /// Run the analysis call. Both deployment variants are accepted: a JSON
    /// `{"analysis": ...}` object or a plain-text body, detected from the
    /// response shape.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<String> {
        let url = format!("{}/api/analyze", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .context("Analysis request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Analysis rejected with HTTP {}", response.status());
        }

        let body = response
            .bytes()
            .await
            .context("Failed to read analysis response")?;

        if let Ok(parsed) = serde_json::from_slice::<AnalyzeResponse>(&body) {
            return Ok(parsed.analysis);
        }
        String::from_utf8(body.to_vec()).context("Analysis response was not valid UTF-8")
    }
}

fn date_filter_query(filter: DateFilter) -> &'static str {
    match filter {
        DateFilter::All => "all",
        DateFilter::LastMonth => "last_month",
        DateFilter::LastYear => "last_year",
    }
}

fn policy_query(policy: FetchPolicy) -> &'static str {
    match policy {
        FetchPolicy::Serial => "serial",
        FetchPolicy::Concurrent => "concurrent",
    }
}
