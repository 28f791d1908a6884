use crate::providers::{VideoItem, VideoListing};
use crate::ExtractError;

/// Hard ceiling on listing pages per channel (roughly 50 * 60 videos).
/// Hitting it silently truncates the result instead of erroring.
const MAX_PAGES: usize = 50;

/// Accumulate a channel's full video list across continuation pages.
///
/// The provider returns newest-first pages; items are appended in response
/// order without re-sorting. A failed first page means the channel could not
/// be listed at all; an empty accumulation is reported as `NoVideosFound`.
pub async fn collect_channel_videos(
    listing: &dyn VideoListing,
    channel_id: &str,
) -> Result<Vec<VideoItem>, ExtractError> {
    let mut items: Vec<VideoItem> = Vec::new();

    let first = listing
        .list_page(channel_id, None)
        .await
        .map_err(|e| ExtractError::ListingFailed(e.to_string()))?;
    items.extend(first.items);
    let mut continuation = first.continuation;
    let mut pages_loaded = 1;

    while let Some(token) = continuation.take() {
        if pages_loaded >= MAX_PAGES {
            tracing::warn!(
                channel_id,
                pages_loaded,
                "page ceiling reached, truncating channel listing"
            );
            break;
        }

        let page = listing
            .list_page(channel_id, Some(token))
            .await
            .map_err(|e| ExtractError::ListingFailed(e.to_string()))?;
        items.extend(page.items);
        continuation = page.continuation;
        pages_loaded += 1;
    }

    // Some providers return entries without an id (upcoming streams, shelf
    // padding); they cannot be fetched so they are dropped here.
    items.retain(|item| !item.video_id.is_empty());

    if items.is_empty() {
        return Err(ExtractError::NoVideosFound);
    }

    tracing::debug!(channel_id, count = items.len(), pages_loaded, "channel listed");
    Ok(items)
}
