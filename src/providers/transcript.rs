use async_trait::async_trait;
use serde::Deserialize;

use super::{TranscriptError, TranscriptFragment, TranscriptSource};

/// Transcript client against an Invidious-compatible captions API.
///
/// Two round trips per video: `GET {base}/api/v1/captions/{id}` lists the
/// available caption tracks, then the matching track is fetched as WebVTT and
/// flattened into timed text fragments.
pub struct CaptionTranscripts {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CaptionIndex {
    captions: Vec<CaptionTrack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    language_code: String,
    url: String,
}

impl CaptionTranscripts {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }

    async fn list_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
        let url = format!(
            "{}/api/v1/captions/{}",
            self.base_url,
            urlencoding::encode(video_id)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TranscriptError::Other(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TranscriptError::NotFound);
        }
        if !response.status().is_success() {
            return Err(TranscriptError::Other(format!(
                "caption index returned HTTP {}",
                response.status()
            )));
        }

        let index: CaptionIndex = response
            .json()
            .await
            .map_err(|e| TranscriptError::Other(e.to_string()))?;
        Ok(index.captions)
    }

    async fn fetch_track(&self, track_url: &str) -> Result<String, TranscriptError> {
        // Track URLs are relative to the instance root.
        let url = if track_url.starts_with("http") {
            track_url.to_string()
        } else {
            format!("{}{}", self.base_url, track_url)
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| TranscriptError::Other(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TranscriptError::Other(format!(
                "caption track returned HTTP {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| TranscriptError::Other(e.to_string()))
    }
}

#[async_trait]
impl TranscriptSource for CaptionTranscripts {
    async fn fetch(
        &self,
        video_id: &str,
        language: &str,
    ) -> Result<Vec<TranscriptFragment>, TranscriptError> {
        let tracks = self.list_tracks(video_id).await?;

        // An indexable video with zero caption tracks has captions switched
        // off by the uploader.
        if tracks.is_empty() {
            return Err(TranscriptError::Disabled);
        }

        let track = tracks
            .iter()
            .find(|t| t.language_code == language)
            .or_else(|| {
                // Fall back to a regional variant ("en-GB" for "en").
                tracks
                    .iter()
                    .find(|t| t.language_code.starts_with(&format!("{}-", language)))
            })
            .ok_or(TranscriptError::NotFound)?;

        let vtt = self.fetch_track(&track.url).await?;
        Ok(parse_webvtt(&vtt))
    }
}

/// Flatten a WebVTT document into timed fragments.
///
/// Only cue timing lines and their payload are interpreted; header blocks,
/// cue identifiers and styling are skipped.
fn parse_webvtt(vtt: &str) -> Vec<TranscriptFragment> {
    let mut fragments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_text = String::new();

    for line in vtt.lines() {
        let line = line.trim();
        if let Some((start, _)) = parse_cue_timing(line) {
            // A new cue starts; close out the previous one.
            push_fragment(&mut fragments, current_start.take(), &mut current_text);
            current_start = Some(start);
        } else if line.is_empty() {
            push_fragment(&mut fragments, current_start.take(), &mut current_text);
        } else if current_start.is_some() {
            if !current_text.is_empty() {
                current_text.push(' ');
            }
            current_text.push_str(line);
        }
    }
    push_fragment(&mut fragments, current_start, &mut current_text);

    fragments
}

fn push_fragment(fragments: &mut Vec<TranscriptFragment>, start: Option<f64>, text: &mut String) {
    if let Some(start) = start {
        if !text.is_empty() {
            fragments.push(TranscriptFragment {
                text: std::mem::take(text),
                start,
            });
            return;
        }
    }
    text.clear();
}

/// Parse a `00:00:01.000 --> 00:00:04.000` cue line into (start, end) seconds.
fn parse_cue_timing(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    Some((
        parse_vtt_timestamp(start.trim())?,
        // Cue settings may trail the end timestamp.
        parse_vtt_timestamp(end.trim().split_whitespace().next()?)?,
    ))
}

fn parse_vtt_timestamp(ts: &str) -> Option<f64> {
    let parts: Vec<&str> = ts.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (h.parse::<f64>().ok()?, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        [m, s] => (0.0, m.parse::<f64>().ok()?, s.parse::<f64>().ok()?),
        _ => return None,
    };
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
