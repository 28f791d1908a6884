//! HTTP surface for the extraction pipeline.
//!
//! Three routes: `/api/extract` streams newline-delimited events over a
//! chunked body, `/api/videos` returns a channel's video list as plain JSON,
//! and `/api/analyze` runs the combined-transcript analysis. The extract
//! handler spawns the pipeline onto its own task; a client that drops the
//! connection closes the event channel, which the pipeline observes as
//! cancellation.

use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::analyze::{run_analysis, AnalyzeRequest, AnalyzeResponse};
use crate::channel::filter::DateFilter;
use crate::channel::lister::collect_channel_videos;
use crate::channel::resolver::resolve_channel_reference;
use crate::pipeline::event::{watch_url, ExtractionEvent, VideoRef};
use crate::pipeline::{ExtractionPipeline, ExtractionRequest, FetchPolicy};
use crate::providers::{Summarizer, VideoListing};
use crate::stream::encode_line;
use crate::ExtractError;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ExtractionPipeline>,
    pub listing: Arc<dyn VideoListing>,
    pub summarizer: Option<Arc<dyn Summarizer>>,
    pub default_language: String,
    pub default_policy: FetchPolicy,
}

/// JSON error body with the status the route mapped it to
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ExtractError> for ApiError {
    fn from(error: ExtractError) -> Self {
        let status = match error {
            ExtractError::UnrecognizedChannelReference(_) | ExtractError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ExtractError::NoVideosFound | ExtractError::NoVideosMatchFilter => {
                StatusCode::NOT_FOUND
            }
            ExtractError::ListingFailed(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/extract", get(extract))
        .route("/api/videos", get(videos))
        .route("/api/analyze", post(analyze))
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(%addr, "server listening");
    axum::serve(listener, router(state))
        .await
        .context("Server error")
}

#[derive(Debug, Deserialize)]
struct ExtractParams {
    channel: String,
    language: Option<String>,
    date_filter: Option<DateFilter>,
    policy: Option<FetchPolicy>,
}

#[derive(Debug, Deserialize)]
struct VideosParams {
    channel: String,
}

/// GET /api/extract -- stream extraction events as NDJSON.
///
/// The response status is committed before the pipeline runs, so every
/// failure after this point is reported in-stream as an `error` event.
async fn extract(State(state): State<AppState>, Query(params): Query<ExtractParams>) -> Response {
    let request = ExtractionRequest {
        channel_reference: params.channel,
        language: params.language.unwrap_or_else(|| state.default_language.clone()),
        date_filter: params.date_filter.unwrap_or(DateFilter::All),
        policy: params.policy.unwrap_or(state.default_policy),
    };

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("extract", %request_id, channel = %request.channel_reference);

    let (tx, rx) = mpsc::channel::<ExtractionEvent>(32);
    let pipeline = state.pipeline.clone();
    tokio::spawn(
        async move {
            let outcome = pipeline.run(request, tx, CancellationToken::new()).await;
            tracing::info!(?outcome, "extraction finished");
        }
        .instrument(span),
    );

    let body = Body::from_stream(futures_util::stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        match encode_line(&event) {
            Ok(line) => Some((Ok::<_, Infallible>(Bytes::from(line)), rx)),
            Err(error) => {
                tracing::error!(%error, "failed to encode event, ending stream");
                None
            }
        }
    }));

    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        body,
    )
        .into_response()
}

/// GET /api/videos -- list a channel's videos without transcripts.
async fn videos(
    State(state): State<AppState>,
    Query(params): Query<VideosParams>,
) -> Result<Json<Vec<VideoRef>>, ApiError> {
    let channel_id = resolve_channel_reference(&params.channel)?;
    let items = collect_channel_videos(state.listing.as_ref(), &channel_id).await?;

    let videos = items
        .into_iter()
        .map(|item| VideoRef {
            url: watch_url(&item.video_id),
            id: item.video_id,
            title: item.title,
        })
        .collect();
    Ok(Json(videos))
}

/// POST /api/analyze -- combine transcripts and run the analysis prompt.
async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    request.validate()?;

    let summarizer = state.summarizer.as_ref().ok_or_else(|| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Analysis is not configured: no Gemini API key is set",
        )
    })?;

    let response = run_analysis(summarizer.as_ref(), &request)
        .await
        .map_err(|error| {
            tracing::error!(%error, "analysis failed");
            ApiError::new(StatusCode::BAD_GATEWAY, format!("Analysis failed: {}", error))
        })?;
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockTranscriptSource, MockVideoListing, VideoItem, VideoPage};
    use axum::body::to_bytes;
    use axum::http::Request;
    use tower::ServiceExt;

    fn state_with_listing(listing: MockVideoListing) -> AppState {
        let listing: Arc<dyn VideoListing> = Arc::new(listing);
        let transcripts = Arc::new(MockTranscriptSource::new());
        AppState {
            pipeline: Arc::new(ExtractionPipeline::new(listing.clone(), transcripts)),
            listing,
            summarizer: None,
            default_language: "en".to_string(),
            default_policy: FetchPolicy::Concurrent,
        }
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Bytes) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn test_videos_returns_channel_list() {
        let mut listing = MockVideoListing::new();
        listing.expect_list_page().returning(|_, _| {
            Ok(VideoPage {
                items: vec![VideoItem {
                    video_id: "abc123".to_string(),
                    title: "First".to_string(),
                    published_text: None,
                }],
                continuation: None,
            })
        });

        let router = router(state_with_listing(listing));
        let (status, body) = get(router, "/api/videos?channel=UCsomething").await;

        assert_eq!(status, StatusCode::OK);
        let videos: Vec<VideoRef> = serde_json::from_slice(&body).unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "abc123");
        assert_eq!(videos[0].url, "https://www.youtube.com/watch?v=abc123");
    }

    #[tokio::test]
    async fn test_videos_empty_channel_is_not_found() {
        let mut listing = MockVideoListing::new();
        listing.expect_list_page().returning(|_, _| {
            Ok(VideoPage {
                items: vec![],
                continuation: None,
            })
        });

        let router = router(state_with_listing(listing));
        let (status, _) = get(router, "/api/videos?channel=UCempty").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_videos_upstream_failure_is_bad_gateway() {
        let mut listing = MockVideoListing::new();
        listing
            .expect_list_page()
            .returning(|_, _| Err(anyhow::anyhow!("instance unreachable")));

        let router = router(state_with_listing(listing));
        let (status, body) = get(router, "/api/videos?channel=UCdown").await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(error["error"].as_str().unwrap().contains("video list"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_empty_transcripts() {
        let router = router(state_with_listing(MockVideoListing::new()));
        let request = Request::post("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"transcripts":[],"customPrompt":"Summarize"}"#))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analyze_without_key_is_server_error() {
        let router = router(state_with_listing(MockVideoListing::new()));
        let body = serde_json::json!({
            "transcripts": [{
                "id": "a",
                "title": "A",
                "url": "https://www.youtube.com/watch?v=a",
                "transcript": "hello"
            }],
            "customPrompt": "Summarize"
        });
        let request = Request::post("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_extract_streams_terminal_error_for_bad_reference() {
        let router = router(state_with_listing(MockVideoListing::new()));
        let (status, body) =
            get(router, "/api/extract?channel=https://example.com/not-a-channel").await;

        // The stream itself is 200; the failure arrives as an event.
        assert_eq!(status, StatusCode::OK);
        let line = String::from_utf8(body.to_vec()).unwrap();
        let event: ExtractionEvent = serde_json::from_str(line.trim()).unwrap();
        assert!(matches!(event, ExtractionEvent::Error { .. }));
    }
}
