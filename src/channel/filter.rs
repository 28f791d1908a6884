use chrono::{DateTime, Duration, Months, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::providers::VideoItem;

/// Upload-date filter applied after listing.
///
/// The listing provider only exposes relative labels ("3 weeks ago"), so the
/// cutoff comparison is a best-effort approximation, not an exact timestamp
/// check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DateFilter {
    /// Keep every video
    All,
    /// Keep videos uploaded within the last month
    LastMonth,
    /// Keep videos uploaded within the last year
    LastYear,
}

impl DateFilter {
    fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            DateFilter::All => None,
            DateFilter::LastMonth => now.checked_sub_months(Months::new(1)),
            DateFilter::LastYear => now.checked_sub_months(Months::new(12)),
        }
    }
}

/// Parse a provider-supplied relative label like "3 weeks ago" into an
/// absolute time. Weeks are always 7 days; months and years use calendar
/// arithmetic. The `<integer> <unit> ago` pattern may appear anywhere in the
/// label ("Streamed 2 days ago" parses); the first match wins. Returns `None`
/// when no word window matches.
pub fn parse_published_text(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();

    for window in words.windows(3) {
        let &[quantity, unit, ago] = window else {
            continue;
        };
        if ago != "ago" {
            continue;
        }
        let Ok(quantity) = quantity.parse::<u32>() else {
            continue;
        };

        return match unit.trim_end_matches('s') {
            "year" => now.checked_sub_months(Months::new(quantity.checked_mul(12)?)),
            "month" => now.checked_sub_months(Months::new(quantity)),
            "week" => now.checked_sub_signed(Duration::days(i64::from(quantity) * 7)),
            "day" => now.checked_sub_signed(Duration::days(i64::from(quantity))),
            "hour" => now.checked_sub_signed(Duration::hours(i64::from(quantity))),
            "minute" => now.checked_sub_signed(Duration::minutes(i64::from(quantity))),
            _ => continue,
        };
    }
    None
}

/// Drop items older than the filter's cutoff.
///
/// Fail-closed: items with a missing or unparseable label are dropped under
/// any non-`All` filter, since we cannot prove they are recent enough.
pub fn apply_date_filter(
    items: Vec<VideoItem>,
    filter: DateFilter,
    now: DateTime<Utc>,
) -> Vec<VideoItem> {
    let cutoff = match filter.cutoff(now) {
        Some(cutoff) => cutoff,
        None => return items,
    };

    items
        .into_iter()
        .filter(|item| {
            item.published_text
                .as_deref()
                .and_then(|text| parse_published_text(text, now))
                .map(|published| published >= cutoff)
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(published_text: Option<&str>) -> VideoItem {
        VideoItem {
            video_id: "abc".to_string(),
            title: "A video".to_string(),
            published_text: published_text.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_parse_relative_labels() {
        let now = Utc::now();
        assert!(parse_published_text("3 weeks ago", now).is_some());
        assert!(parse_published_text("1 year ago", now).is_some());
        assert!(parse_published_text("45 MINUTES AGO", now).is_some());
        assert!(parse_published_text("yesterday", now).is_none());
        assert!(parse_published_text("3 fortnights ago", now).is_none());
        assert!(parse_published_text("", now).is_none());
    }

    #[test]
    fn test_pattern_matches_anywhere_in_label() {
        let now = Utc::now();
        let parsed = parse_published_text("Streamed 2 days ago", now).unwrap();
        assert_eq!(now - parsed, Duration::days(2));
        assert!(parse_published_text("3 weeks ago exactly", now).is_some());
        assert!(parse_published_text("Streamed live", now).is_none());
    }

    #[test]
    fn test_week_is_exactly_seven_days() {
        let now = Utc::now();
        let parsed = parse_published_text("2 weeks ago", now).unwrap();
        assert_eq!(now - parsed, Duration::days(14));
    }

    #[test]
    fn test_two_months_ago_excluded_under_last_month() {
        let now = Utc::now();
        let items = vec![item(Some("2 months ago"))];

        assert!(apply_date_filter(items.clone(), DateFilter::LastMonth, now).is_empty());
        assert_eq!(apply_date_filter(items.clone(), DateFilter::LastYear, now).len(), 1);
        assert_eq!(apply_date_filter(items, DateFilter::All, now).len(), 1);
    }

    #[test]
    fn test_missing_label_dropped_unless_all() {
        let now = Utc::now();
        let items = vec![item(None)];

        assert!(apply_date_filter(items.clone(), DateFilter::LastMonth, now).is_empty());
        assert!(apply_date_filter(items.clone(), DateFilter::LastYear, now).is_empty());
        assert_eq!(apply_date_filter(items, DateFilter::All, now).len(), 1);
    }

    #[test]
    fn test_unparseable_label_dropped() {
        let now = Utc::now();
        let items = vec![item(Some("Streamed live")), item(Some("2 days ago"))];

        let kept = apply_date_filter(items, DateFilter::LastMonth, now);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].published_text.as_deref(), Some("2 days ago"));
    }
}
