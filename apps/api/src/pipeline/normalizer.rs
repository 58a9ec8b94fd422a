//! Normalizer — maps raw source records to canonical `FeedbackItem`s,
//! computes engagement scores, and provides deduplication and
//! priority-sorting utilities over item collections.
//!
//! `normalize` is total: a record with missing fields produces an item with
//! empty defaults, never an error. Ingestion must not fail on shape.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;

use crate::models::feedback::{FeedbackItem, FeedbackSource, RawRecord};
use crate::pipeline::text::dedup_key;

// ────────────────────────────────────────────────────────────────────────────
// Engagement scoring
// ────────────────────────────────────────────────────────────────────────────

/// Reddit engagement: `round(min(score/500,1)*60 + min(comments/100,1)*40)`,
/// 0–100. Negative vote totals count as zero.
pub fn reddit_engagement(score: i64, num_comments: i64) -> u32 {
    let score_ratio = (score.max(0) as f64 / 500.0).min(1.0);
    let comment_ratio = (num_comments.max(0) as f64 / 100.0).min(1.0);
    (score_ratio * 60.0 + comment_ratio * 40.0).round() as u32
}

/// Twitter engagement: capped ratios weighted replies 40 / retweets 35 /
/// likes 25. Monotone in every input, capped at 100.
pub fn twitter_engagement(reply_count: i64, retweet_count: i64, like_count: i64) -> u32 {
    let reply_ratio = (reply_count.max(0) as f64 / 100.0).min(1.0);
    let retweet_ratio = (retweet_count.max(0) as f64 / 200.0).min(1.0);
    let like_ratio = (like_count.max(0) as f64 / 1000.0).min(1.0);
    (reply_ratio * 40.0 + retweet_ratio * 35.0 + like_ratio * 25.0).round() as u32
}

// ────────────────────────────────────────────────────────────────────────────
// Normalization
// ────────────────────────────────────────────────────────────────────────────

/// Converts one raw record into a `FeedbackItem`, stamping `fetched_at` now.
pub fn normalize(record: &RawRecord) -> FeedbackItem {
    normalize_at(record, Utc::now())
}

/// Deterministic core of `normalize` — `fetched_at` supplied by the caller.
pub fn normalize_at(record: &RawRecord, fetched_at: DateTime<Utc>) -> FeedbackItem {
    match record {
        RawRecord::Reddit(post) => {
            let created_at = epoch_seconds_to_utc(post.created_utc).unwrap_or(fetched_at);
            FeedbackItem {
                id: item_id(FeedbackSource::Reddit, &post.id, fetched_at),
                source: FeedbackSource::Reddit,
                source_id: post.id.clone(),
                source_url: if post.permalink.is_empty() {
                    String::new()
                } else {
                    format!("https://reddit.com{}", post.permalink)
                },
                title: none_if_empty(&post.title),
                content: post.selftext.clone(),
                author: post.author.clone(),
                author_handle: None,
                created_at,
                fetched_at,
                engagement_score: reddit_engagement(post.score, post.num_comments),
                metadata: json!({
                    "subreddit": post.subreddit,
                    "score": post.score,
                    "num_comments": post.num_comments,
                }),
            }
        }
        RawRecord::Twitter(tweet) => FeedbackItem {
            id: item_id(FeedbackSource::Twitter, &tweet.id, fetched_at),
            source: FeedbackSource::Twitter,
            source_id: tweet.id.clone(),
            source_url: tweet.url.clone(),
            title: None,
            content: tweet.text.clone(),
            author: tweet.author_name.clone(),
            author_handle: none_if_empty(&tweet.author_username),
            created_at: tweet.created_at.unwrap_or(fetched_at),
            fetched_at,
            engagement_score: twitter_engagement(
                tweet.reply_count,
                tweet.retweet_count,
                tweet.like_count,
            ),
            metadata: json!({
                "reply_count": tweet.reply_count,
                "retweet_count": tweet.retweet_count,
                "like_count": tweet.like_count,
                "hashtags": tweet.hashtags,
            }),
        },
        RawRecord::Web(hit) => FeedbackItem {
            id: item_id(FeedbackSource::Web, &hit.url, fetched_at),
            source: FeedbackSource::Web,
            source_id: hit.url.clone(),
            source_url: hit.url.clone(),
            title: none_if_empty(&hit.title),
            content: hit.snippet.clone(),
            author: hit.site_name.clone(),
            author_handle: None,
            created_at: fetched_at,
            fetched_at,
            engagement_score: 0,
            metadata: json!({ "site_name": hit.site_name }),
        },
        RawRecord::Upload(row) => FeedbackItem {
            id: item_id(FeedbackSource::Upload, &row_key(row), fetched_at),
            source: FeedbackSource::Upload,
            source_id: row_key(row),
            source_url: row.source_url.clone().unwrap_or_default(),
            title: row.title.clone().filter(|t| !t.is_empty()),
            content: row.content.clone(),
            author: row.author.clone().unwrap_or_default(),
            author_handle: None,
            created_at: fetched_at,
            fetched_at,
            engagement_score: 0,
            metadata: json!({}),
        },
    }
}

fn item_id(source: FeedbackSource, source_id: &str, fetched_at: DateTime<Utc>) -> String {
    format!("{}-{}-{}", source, source_id, fetched_at.timestamp_millis())
}

/// Upload rows have no native id; key on the normalized content instead so
/// the one-draft-per-source-id invariant still holds for repeated uploads.
fn row_key(row: &crate::models::feedback::UploadRow) -> String {
    dedup_key(&row.content)
}

fn none_if_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn epoch_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if seconds <= 0.0 {
        return None;
    }
    Utc.timestamp_opt(seconds as i64, 0).single()
}

// ────────────────────────────────────────────────────────────────────────────
// Deduplication
// ────────────────────────────────────────────────────────────────────────────

/// Drops new items whose normalized content exactly matches any existing
/// item's, or an earlier item's in this batch. Exact match only — reworded
/// near-duplicates pass through.
pub fn dedupe(new_items: Vec<FeedbackItem>, existing_items: &[FeedbackItem]) -> Vec<FeedbackItem> {
    let mut seen: std::collections::HashSet<String> = existing_items
        .iter()
        .map(|item| dedup_key(&item.content))
        .collect();

    let mut kept = Vec::with_capacity(new_items.len());
    for item in new_items {
        let key = dedup_key(&item.content);
        if seen.insert(key) {
            kept.push(item);
        }
    }
    kept
}

// ────────────────────────────────────────────────────────────────────────────
// Priority sort
// ────────────────────────────────────────────────────────────────────────────

/// Engagement-score difference at or below which two items count as tied.
const SCORE_TIE_BAND: i64 = 20;

/// Pairwise ordering: engagement score descending, but two items whose
/// scores differ by at most 20 compare on `created_at` descending instead
/// (newer first).
fn ranks_before(a: &FeedbackItem, b: &FeedbackItem) -> bool {
    let diff = (a.engagement_score as i64 - b.engagement_score as i64).abs();
    if diff <= SCORE_TIE_BAND {
        a.created_at > b.created_at
    } else {
        a.engagement_score > b.engagement_score
    }
}

/// Orders items by the tie-band rule. The rule is intentionally not a total
/// order (score wins across the band, date wins inside it), so it cannot be
/// handed to `sort_by`; a stable insertion sort applies it pairwise instead.
pub fn sort_by_priority(items: Vec<FeedbackItem>) -> Vec<FeedbackItem> {
    let mut sorted: Vec<FeedbackItem> = Vec::with_capacity(items.len());
    for item in items {
        let mut idx = sorted.len();
        while idx > 0 && ranks_before(&item, &sorted[idx - 1]) {
            idx -= 1;
        }
        sorted.insert(idx, item);
    }
    sorted
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feedback::{RedditPost, Tweet, UploadRow};
    use chrono::Duration;

    fn reddit_record(id: &str, selftext: &str, score: i64, comments: i64) -> RawRecord {
        RawRecord::Reddit(RedditPost {
            id: id.to_string(),
            title: "Need SSO".to_string(),
            selftext: selftext.to_string(),
            author: "jdoe".to_string(),
            subreddit: "saas".to_string(),
            score,
            num_comments: comments,
            permalink: format!("/r/saas/{id}"),
            created_utc: 1_700_000_000.0,
        })
    }

    #[test]
    fn test_reddit_engagement_formula() {
        // round(min(200/500,1)*60 + min(40/100,1)*40) = round(24 + 16) = 40
        assert_eq!(reddit_engagement(200, 40), 40);
    }

    #[test]
    fn test_reddit_engagement_caps_at_100() {
        assert_eq!(reddit_engagement(10_000, 10_000), 100);
    }

    #[test]
    fn test_reddit_engagement_negative_score_is_zero_ratio() {
        assert_eq!(reddit_engagement(-50, 0), 0);
    }

    #[test]
    fn test_twitter_engagement_monotone_and_capped() {
        let low = twitter_engagement(1, 1, 1);
        let mid = twitter_engagement(50, 100, 500);
        let max = twitter_engagement(1_000_000, 1_000_000, 1_000_000);
        assert!(low < mid, "more interactions must score higher");
        assert!(mid < max);
        assert_eq!(max, 100);
    }

    #[test]
    fn test_normalize_reddit_fields() {
        let fetched = Utc::now();
        let item = normalize_at(&reddit_record("abc", "We need SSO", 200, 40), fetched);
        assert_eq!(item.source, FeedbackSource::Reddit);
        assert_eq!(item.source_id, "abc");
        assert_eq!(item.title.as_deref(), Some("Need SSO"));
        assert_eq!(item.content, "We need SSO");
        assert_eq!(item.engagement_score, 40);
        assert_eq!(item.source_url, "https://reddit.com/r/saas/abc");
        assert_eq!(item.metadata["subreddit"], "saas");
        assert!(item.id.starts_with("reddit-abc-"));
    }

    #[test]
    fn test_normalize_is_idempotent_on_content_fields() {
        let record = reddit_record("abc", "We need SSO", 200, 40);
        let a = normalize(&record);
        let b = normalize(&record);
        assert_eq!(a.content, b.content);
        assert_eq!(a.author, b.author);
        assert_eq!(a.engagement_score, b.engagement_score);
    }

    #[test]
    fn test_normalize_never_fails_on_empty_record() {
        let item = normalize(&RawRecord::Reddit(RedditPost::default()));
        assert_eq!(item.content, "");
        assert_eq!(item.author, "");
        assert_eq!(item.engagement_score, 0);
        assert!(item.title.is_none());
        assert_eq!(item.source_url, "");
    }

    #[test]
    fn test_normalize_twitter_handle_and_metadata() {
        let item = normalize(&RawRecord::Twitter(Tweet {
            id: "t1".to_string(),
            text: "love this tool".to_string(),
            author_name: "Jane".to_string(),
            author_username: "jane_dev".to_string(),
            reply_count: 3,
            retweet_count: 5,
            like_count: 40,
            ..Tweet::default()
        }));
        assert_eq!(item.author_handle.as_deref(), Some("jane_dev"));
        assert_eq!(item.metadata["like_count"], 40);
    }

    #[test]
    fn test_normalize_upload_keys_on_content() {
        let a = normalize(&RawRecord::Upload(UploadRow {
            content: "Love the app!".to_string(),
            ..UploadRow::default()
        }));
        let b = normalize(&RawRecord::Upload(UploadRow {
            content: "love the app".to_string(),
            ..UploadRow::default()
        }));
        // Same normalized content -> same source_id, so the queue's
        // one-draft-per-source invariant also covers re-uploads.
        assert_eq!(a.source_id, b.source_id);
    }

    #[test]
    fn test_dedupe_drops_exact_normalized_matches() {
        let fetched = Utc::now();
        let existing = vec![normalize_at(
            &reddit_record("a", "The export button is broken!", 1, 1),
            fetched,
        )];
        let incoming = vec![
            normalize_at(&reddit_record("b", "the export button is broken", 1, 1), fetched),
            normalize_at(&reddit_record("c", "The export button fails", 1, 1), fetched),
            normalize_at(&reddit_record("d", "The export button fails.", 1, 1), fetched),
        ];
        let kept = dedupe(incoming, &existing);
        // b matches existing a; d matches c within the batch; c survives.
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].source_id, "c");
    }

    #[test]
    fn test_dedupe_is_exact_not_fuzzy() {
        let fetched = Utc::now();
        let incoming = vec![
            normalize_at(&reddit_record("a", "export is broken", 1, 1), fetched),
            normalize_at(&reddit_record("b", "export is very broken", 1, 1), fetched),
        ];
        assert_eq!(dedupe(incoming, &[]).len(), 2, "near-duplicates pass through");
    }

    fn item_with(score: u32, created_at: DateTime<Utc>) -> FeedbackItem {
        let mut item = normalize(&RawRecord::Reddit(RedditPost::default()));
        item.engagement_score = score;
        item.created_at = created_at;
        item
    }

    #[test]
    fn test_sort_tie_band_falls_through_to_date() {
        let now = Utc::now();
        let older_high = item_with(80, now - Duration::hours(2));
        let newer_low = item_with(65, now);
        // diff 15 <= 20 -> newer first regardless of score
        let sorted = sort_by_priority(vec![older_high, newer_low]);
        assert_eq!(sorted[0].engagement_score, 65);
        assert_eq!(sorted[1].engagement_score, 80);
    }

    #[test]
    fn test_sort_handles_large_mixed_batches() {
        // Scores spread across 0-100 with varying dates produce chains where
        // the tie-band rule is intransitive; the sort must still complete
        // and leave every adjacent pair consistent with the pairwise rule.
        let now = Utc::now();
        let items: Vec<FeedbackItem> = (0..2_000u32)
            .map(|n| item_with((n * 37) % 101, now - Duration::seconds(n as i64)))
            .collect();
        let sorted = sort_by_priority(items);
        assert_eq!(sorted.len(), 2_000);
        for pair in sorted.windows(2) {
            let diff = (pair[0].engagement_score as i64 - pair[1].engagement_score as i64).abs();
            if diff <= 20 {
                assert!(pair[0].created_at >= pair[1].created_at);
            } else {
                assert!(pair[0].engagement_score > pair[1].engagement_score);
            }
        }
    }

    #[test]
    fn test_sort_outside_tie_band_uses_score() {
        let now = Utc::now();
        let older_high = item_with(80, now - Duration::hours(2));
        let newer_low = item_with(50, now);
        // diff 30 > 20 -> score wins regardless of date
        let sorted = sort_by_priority(vec![newer_low, older_high]);
        assert_eq!(sorted[0].engagement_score, 80);
        assert_eq!(sorted[1].engagement_score, 50);
    }
}
