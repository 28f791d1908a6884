//! Streaming channel-extraction orchestrator.
//!
//! Drives resolving -> listing -> filtering -> per-video emission as an
//! explicit stage progression and writes ordered [`ExtractionEvent`]s into an
//! mpsc sink. Cancellation is cooperative: the token is checked between
//! stages and before each fetch, and a closed sink is treated the same way as
//! a cancelled request (the consumer is gone, nothing more may be written).

use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::channel::filter::{apply_date_filter, DateFilter};
use crate::channel::lister::collect_channel_videos;
use crate::channel::resolver::resolve_channel_reference;
use crate::providers::{TranscriptError, TranscriptSource, VideoItem, VideoListing};

pub mod event;

use event::{
    watch_url, ExtractionEvent, VideoRef, VideoResult, PLACEHOLDER_DISABLED,
    PLACEHOLDER_FETCH_FAILED, PLACEHOLDER_NOT_AVAILABLE,
};

/// How per-video transcript fetches are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FetchPolicy {
    /// One video in flight at a time, events emitted as each video finishes
    Serial,
    /// All fetches launched at once, emission deferred until the batch
    /// settles and then replayed in original list order
    Concurrent,
}

/// One extraction request as issued by a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Channel URL or bare identifier/handle
    pub channel_reference: String,

    /// Preferred transcript language code
    pub language: String,

    /// Upload-date filter
    pub date_filter: DateFilter,

    /// Fetch scheduling policy
    pub policy: FetchPolicy,
}

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// All videos emitted and `done` written
    Completed,
    /// Requester cancelled or the sink closed; the stream just ends
    Cancelled,
    /// A fatal error was written as the terminal `error` event
    Failed,
}

/// Internal reason a stage could not continue
enum RunError {
    Cancelled,
    SinkClosed,
    Fatal(String),
}

/// Explicit orchestrator stages; each loop turn consumes one
enum Stage {
    Resolving,
    Listing { channel_id: String },
    Filtering { items: Vec<VideoItem> },
    Emitting { videos: Vec<VideoRef> },
    Finished,
}

/// The extraction pipeline: listing + transcript providers plus the state
/// machine that turns one request into an event stream.
pub struct ExtractionPipeline {
    listing: Arc<dyn VideoListing>,
    transcripts: Arc<dyn TranscriptSource>,
}

impl ExtractionPipeline {
    pub fn new(listing: Arc<dyn VideoListing>, transcripts: Arc<dyn TranscriptSource>) -> Self {
        Self {
            listing,
            transcripts,
        }
    }

    /// Run one extraction, writing events to `tx` until the request is
    /// exhausted, fails, or is cancelled.
    ///
    /// Exactly one terminal event (`done` xor `error`) is written unless the
    /// run was cancelled, in which case the stream ends without one.
    pub async fn run(
        &self,
        request: ExtractionRequest,
        tx: mpsc::Sender<ExtractionEvent>,
        cancel: CancellationToken,
    ) -> RunOutcome {
        match self.drive(&request, &tx, &cancel).await {
            Ok(()) => {
                let done = ExtractionEvent::Done {
                    message: "Extraction complete!".to_string(),
                };
                if send(&tx, done).await.is_err() {
                    return RunOutcome::Cancelled;
                }
                RunOutcome::Completed
            }
            Err(RunError::Cancelled) | Err(RunError::SinkClosed) => {
                tracing::info!("extraction cancelled");
                RunOutcome::Cancelled
            }
            Err(RunError::Fatal(message)) => {
                tracing::error!(error = %message, "extraction failed");
                // Nothing may be written once the requester is gone.
                if !cancel.is_cancelled() {
                    let _ = send(&tx, ExtractionEvent::Error { message }).await;
                }
                RunOutcome::Failed
            }
        }
    }

    async fn drive(
        &self,
        request: &ExtractionRequest,
        tx: &mpsc::Sender<ExtractionEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        let mut stage = Stage::Resolving;

        loop {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }

            stage = match stage {
                Stage::Resolving => {
                    let channel_id = resolve_channel_reference(&request.channel_reference)
                        .map_err(|e| RunError::Fatal(e.to_string()))?;
                    tracing::debug!(%channel_id, "channel reference resolved");
                    Stage::Listing { channel_id }
                }
                Stage::Listing { channel_id } => {
                    let items = collect_channel_videos(self.listing.as_ref(), &channel_id)
                        .await
                        .map_err(|e| RunError::Fatal(e.to_string()))?;
                    Stage::Filtering { items }
                }
                Stage::Filtering { items } => {
                    let kept = apply_date_filter(items, request.date_filter, Utc::now());
                    if kept.is_empty() {
                        return Err(RunError::Fatal(
                            crate::ExtractError::NoVideosMatchFilter.to_string(),
                        ));
                    }
                    let videos = kept
                        .into_iter()
                        .map(|item| VideoRef {
                            url: watch_url(&item.video_id),
                            id: item.video_id,
                            title: item.title,
                        })
                        .collect();
                    Stage::Emitting { videos }
                }
                Stage::Emitting { videos } => {
                    send(tx, ExtractionEvent::Total {
                        count: videos.len(),
                    })
                    .await?;

                    match request.policy {
                        FetchPolicy::Serial => {
                            self.emit_serial(&videos, &request.language, tx, cancel).await?
                        }
                        FetchPolicy::Concurrent => {
                            self.emit_concurrent(&videos, &request.language, tx, cancel)
                                .await?
                        }
                    }
                    Stage::Finished
                }
                Stage::Finished => return Ok(()),
            };
        }
    }

    /// One video at a time; the cancel token is checked before every fetch.
    async fn emit_serial(
        &self,
        videos: &[VideoRef],
        language: &str,
        tx: &mpsc::Sender<ExtractionEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        let total = videos.len();
        for (index, video) in videos.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(RunError::Cancelled);
            }

            send(tx, progress_event(index + 1, total, &video.title)).await?;
            let transcript = self.fetch_transcript_text(&video.id, language).await;
            send(tx, ExtractionEvent::Transcript {
                data: VideoResult::new(video.clone(), transcript),
            })
            .await?;
        }
        Ok(())
    }

    /// Fan out all fetches at once, join them, then replay in list order.
    ///
    /// Results land in an index-addressed slot buffer so no sorting is needed
    /// and a fetch that settles early never jumps the queue.
    async fn emit_concurrent(
        &self,
        videos: &[VideoRef],
        language: &str,
        tx: &mpsc::Sender<ExtractionEvent>,
        cancel: &CancellationToken,
    ) -> Result<(), RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let fetches = videos.iter().enumerate().map(|(index, video)| {
            let id = video.id.clone();
            async move { (index, self.fetch_transcript_text(&id, language).await) }
        });
        let settled = join_all(fetches).await;

        // In-flight fetches ran to completion, but if cancellation fired
        // while we waited their results are simply discarded.
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let mut slots: Vec<Option<String>> = vec![None; videos.len()];
        for (index, transcript) in settled {
            slots[index] = Some(transcript);
        }

        let total = videos.len();
        for (index, (video, slot)) in videos.iter().zip(slots.into_iter()).enumerate() {
            send(tx, progress_event(index + 1, total, &video.title)).await?;
            let transcript = slot.unwrap_or_else(|| PLACEHOLDER_FETCH_FAILED.to_string());
            send(tx, ExtractionEvent::Transcript {
                data: VideoResult::new(video.clone(), transcript),
            })
            .await?;
        }
        Ok(())
    }

    /// Fetch one transcript, absorbing every failure into a placeholder so a
    /// single bad video never aborts the batch.
    async fn fetch_transcript_text(&self, video_id: &str, language: &str) -> String {
        match self.transcripts.fetch(video_id, language).await {
            Ok(fragments) => fragments
                .iter()
                .map(|f| f.text.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            Err(TranscriptError::Disabled) => PLACEHOLDER_DISABLED.to_string(),
            Err(TranscriptError::NotFound) => PLACEHOLDER_NOT_AVAILABLE.to_string(),
            Err(TranscriptError::Other(reason)) => {
                tracing::warn!(video_id, reason = %reason, "transcript fetch failed");
                PLACEHOLDER_FETCH_FAILED.to_string()
            }
        }
    }
}

fn progress_event(count: usize, total: usize, title: &str) -> ExtractionEvent {
    ExtractionEvent::Progress {
        count,
        total,
        message: format!("Processing ({}/{}): \"{}\"", count, total, title),
    }
}

async fn send(
    tx: &mpsc::Sender<ExtractionEvent>,
    event: ExtractionEvent,
) -> Result<(), RunError> {
    tx.send(event).await.map_err(|_| RunError::SinkClosed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockVideoListing, TranscriptFragment, VideoPage};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Test transcript source with per-video delays and failures.
    struct FakeTranscripts {
        delays: HashMap<String, Duration>,
        failures: HashMap<String, fn() -> TranscriptError>,
        cancel_on_first_fetch: Option<CancellationToken>,
    }

    impl FakeTranscripts {
        fn new() -> Self {
            Self {
                delays: HashMap::new(),
                failures: HashMap::new(),
                cancel_on_first_fetch: None,
            }
        }
    }

    #[async_trait]
    impl TranscriptSource for FakeTranscripts {
        async fn fetch(
            &self,
            video_id: &str,
            _language: &str,
        ) -> Result<Vec<TranscriptFragment>, TranscriptError> {
            if let Some(token) = &self.cancel_on_first_fetch {
                token.cancel();
            }
            if let Some(delay) = self.delays.get(video_id) {
                tokio::time::sleep(*delay).await;
            }
            if let Some(make_error) = self.failures.get(video_id) {
                return Err(make_error());
            }
            Ok(vec![
                TranscriptFragment {
                    text: format!("transcript of {}", video_id),
                    start: 0.0,
                },
                TranscriptFragment {
                    text: "part two".to_string(),
                    start: 5.0,
                },
            ])
        }
    }

    fn listing_with(ids: &[&str]) -> MockVideoListing {
        let page = VideoPage {
            items: ids
                .iter()
                .map(|id| VideoItem {
                    video_id: id.to_string(),
                    title: format!("Video {}", id),
                    published_text: Some("1 day ago".to_string()),
                })
                .collect(),
            continuation: None,
        };
        let mut listing = MockVideoListing::new();
        listing
            .expect_list_page()
            .returning(move |_, _| Ok(page.clone()));
        listing
    }

    fn request(policy: FetchPolicy) -> ExtractionRequest {
        ExtractionRequest {
            channel_reference: "UC123".to_string(),
            language: "en".to_string(),
            date_filter: DateFilter::All,
            policy,
        }
    }

    async fn run_and_collect(
        listing: MockVideoListing,
        transcripts: FakeTranscripts,
        request: ExtractionRequest,
        cancel: CancellationToken,
    ) -> (RunOutcome, Vec<ExtractionEvent>) {
        let pipeline = ExtractionPipeline::new(Arc::new(listing), Arc::new(transcripts));
        let (tx, mut rx) = mpsc::channel(64);

        let outcome = pipeline.run(request, tx, cancel).await;

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (outcome, events)
    }

    fn assert_stream_shape(events: &[ExtractionEvent], expect_terminal: bool) {
        let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
        if expect_terminal {
            assert_eq!(terminal_count, 1);
            assert!(events.last().unwrap().is_terminal());
        } else {
            assert_eq!(terminal_count, 0);
        }

        // Total, if present, comes before every per-video event.
        if let Some(total_pos) = events
            .iter()
            .position(|e| matches!(e, ExtractionEvent::Total { .. }))
        {
            assert_eq!(total_pos, 0);
        }
    }

    #[tokio::test]
    async fn test_serial_happy_path() {
        let (outcome, events) = run_and_collect(
            listing_with(&["a", "b"]),
            FakeTranscripts::new(),
            request(FetchPolicy::Serial),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_stream_shape(&events, true);
        assert_eq!(events[0], ExtractionEvent::Total { count: 2 });
        assert!(matches!(events.last(), Some(ExtractionEvent::Done { .. })));

        let transcripts: Vec<&VideoResult> = events
            .iter()
            .filter_map(|e| match e {
                ExtractionEvent::Transcript { data } => Some(data),
                _ => None,
            })
            .collect();
        assert_eq!(transcripts.len(), 2);
        assert_eq!(transcripts[0].id, "a");
        assert_eq!(transcripts[0].transcript, "transcript of a part two");
        assert_eq!(transcripts[0].url, "https://www.youtube.com/watch?v=a");
    }

    #[tokio::test]
    async fn test_progress_precedes_each_transcript() {
        let (_, events) = run_and_collect(
            listing_with(&["a", "b", "c"]),
            FakeTranscripts::new(),
            request(FetchPolicy::Serial),
            CancellationToken::new(),
        )
        .await;

        let mut expected = 1;
        for window in events.windows(2) {
            if let ExtractionEvent::Transcript { .. } = window[1] {
                match &window[0] {
                    ExtractionEvent::Progress { count, total, .. } => {
                        assert_eq!(*count, expected);
                        assert_eq!(*total, 3);
                        expected += 1;
                    }
                    other => panic!("transcript not preceded by progress: {:?}", other),
                }
            }
        }
        assert_eq!(expected, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_emits_in_list_order() {
        // Video "a" settles long after "b"; emission must still be a, b.
        let mut transcripts = FakeTranscripts::new();
        transcripts
            .delays
            .insert("a".to_string(), Duration::from_secs(5));

        let (outcome, events) = run_and_collect(
            listing_with(&["a", "b"]),
            transcripts,
            request(FetchPolicy::Concurrent),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, RunOutcome::Completed);
        assert_stream_shape(&events, true);

        let ids: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                ExtractionEvent::Transcript { data } => Some(data.id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_single_failure_does_not_abort_batch() {
        let mut transcripts = FakeTranscripts::new();
        transcripts
            .failures
            .insert("b".to_string(), || TranscriptError::Other("boom".into()));

        let (outcome, events) = run_and_collect(
            listing_with(&["a", "b", "c"]),
            transcripts,
            request(FetchPolicy::Concurrent),
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, RunOutcome::Completed);
        let results: Vec<&VideoResult> = events
            .iter()
            .filter_map(|e| match e {
                ExtractionEvent::Transcript { data } => Some(data),
                _ => None,
            })
            .collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].transcript, PLACEHOLDER_FETCH_FAILED);
        assert!(results[0].transcript.starts_with("transcript of"));
        assert!(matches!(events.last(), Some(ExtractionEvent::Done { .. })));
    }

    #[tokio::test]
    async fn test_disabled_and_missing_become_placeholders() {
        let mut transcripts = FakeTranscripts::new();
        transcripts
            .failures
            .insert("a".to_string(), || TranscriptError::Disabled);
        transcripts
            .failures
            .insert("b".to_string(), || TranscriptError::NotFound);

        let (_, events) = run_and_collect(
            listing_with(&["a", "b"]),
            transcripts,
            request(FetchPolicy::Serial),
            CancellationToken::new(),
        )
        .await;

        let results: Vec<&VideoResult> = events
            .iter()
            .filter_map(|e| match e {
                ExtractionEvent::Transcript { data } => Some(data),
                _ => None,
            })
            .collect();
        assert_eq!(results[0].transcript, PLACEHOLDER_DISABLED);
        assert_eq!(results[1].transcript, PLACEHOLDER_NOT_AVAILABLE);
    }

    #[tokio::test]
    async fn test_serial_cancellation_ends_stream_without_terminal() {
        let cancel = CancellationToken::new();
        let mut transcripts = FakeTranscripts::new();
        // Fires mid-extraction, after Total but before the batch finishes.
        transcripts.cancel_on_first_fetch = Some(cancel.clone());

        let (outcome, events) = run_and_collect(
            listing_with(&["a", "b", "c"]),
            transcripts,
            request(FetchPolicy::Serial),
            cancel,
        )
        .await;

        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_stream_shape(&events, false);
        assert_eq!(events[0], ExtractionEvent::Total { count: 3 });
        // The in-flight video still completed; nothing after it was started.
        assert!(events.len() < 7);
    }

    #[tokio::test]
    async fn test_unresolvable_reference_is_terminal_error() {
        let (outcome, events) = run_and_collect(
            listing_with(&["a"]),
            FakeTranscripts::new(),
            ExtractionRequest {
                channel_reference: "https://www.youtube.com/watch?v=abc".to_string(),
                ..request(FetchPolicy::Serial)
            },
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ExtractionEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_empty_after_filter_is_terminal_error() {
        let mut listing = MockVideoListing::new();
        listing.expect_list_page().returning(|_, _| {
            Ok(VideoPage {
                items: vec![VideoItem {
                    video_id: "old".to_string(),
                    title: "Old video".to_string(),
                    published_text: Some("2 years ago".to_string()),
                }],
                continuation: None,
            })
        });

        let (outcome, events) = run_and_collect(
            listing,
            FakeTranscripts::new(),
            ExtractionRequest {
                date_filter: DateFilter::LastMonth,
                ..request(FetchPolicy::Serial)
            },
            CancellationToken::new(),
        )
        .await;

        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(events.len(), 1);
        match &events[0] {
            ExtractionEvent::Error { message } => {
                assert!(message.contains("date filter"));
            }
            other => panic!("expected error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_closed_sink_counts_as_cancellation() {
        let pipeline = ExtractionPipeline::new(
            Arc::new(listing_with(&["a", "b"])),
            Arc::new(FakeTranscripts::new()),
        );
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = pipeline
            .run(request(FetchPolicy::Serial), tx, CancellationToken::new())
            .await;
        assert_eq!(outcome, RunOutcome::Cancelled);
    }
}
