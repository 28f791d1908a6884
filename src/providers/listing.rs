use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{VideoItem, VideoListing, VideoPage};
use crate::Result;

/// Channel listing client against an Invidious-compatible API.
///
/// `GET {base}/api/v1/channels/{id}/videos?sort_by=newest[&continuation=..]`
/// returns one page of videos plus an opaque continuation token. The
/// `publishedText` field carries the relative upload label the date filter
/// parses.
pub struct InvidiousListing {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideosResponse {
    videos: Vec<ChannelVideo>,
    continuation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelVideo {
    #[serde(default)]
    video_id: String,
    #[serde(default)]
    title: String,
    published_text: Option<String>,
}

impl InvidiousListing {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }
}

#[async_trait]
impl VideoListing for InvidiousListing {
    async fn list_page(
        &self,
        channel_id: &str,
        continuation: Option<String>,
    ) -> Result<VideoPage> {
        let mut url = format!(
            "{}/api/v1/channels/{}/videos?sort_by=newest",
            self.base_url,
            urlencoding::encode(channel_id)
        );
        if let Some(token) = &continuation {
            url.push_str("&continuation=");
            url.push_str(&urlencoding::encode(token));
        }

        tracing::debug!(%url, "fetching channel video page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Listing request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Listing provider returned HTTP {}", response.status());
        }

        let page: VideosResponse = response
            .json()
            .await
            .context("Failed to parse listing response")?;

        Ok(VideoPage {
            items: page
                .videos
                .into_iter()
                .map(|v| VideoItem {
                    video_id: v.video_id,
                    title: v.title,
                    published_text: v.published_text,
                })
                .collect(),
            continuation: page.continuation,
        })
    }
}
