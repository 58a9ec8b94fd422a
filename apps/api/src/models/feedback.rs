//! Canonical feedback data model — the shapes every pipeline stage agrees on.
//!
//! Raw source records (Reddit posts, tweets, web hits, uploaded rows) enter
//! through `RawRecord` and leave the normalizer as `FeedbackItem`. A
//! `FeedbackItem` is created once and never mutated; downstream records
//! reference it rather than copying fields out of it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ────────────────────────────────────────────────────────────────────────────
// Source records
// ────────────────────────────────────────────────────────────────────────────

/// Where a piece of feedback was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSource {
    Reddit,
    Twitter,
    Web,
    Upload,
}

impl FeedbackSource {
    /// Stable string form, used in item ids and stats bucket keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackSource::Reddit => "reddit",
            FeedbackSource::Twitter => "twitter",
            FeedbackSource::Web => "web",
            FeedbackSource::Upload => "upload",
        }
    }
}

impl fmt::Display for FeedbackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Reddit submission as returned by the Reddit JSON API (fetcher concern).
/// All fields are defaulted — a missing field must never fail ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RedditPost {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub permalink: String,
    /// Seconds since the epoch, as Reddit serializes it.
    #[serde(default)]
    pub created_utc: f64,
}

/// A tweet as supplied by the Twitter fetcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tweet {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_username: String,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub retweet_count: i64,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// A result row from the web-search fetcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebHit {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub site_name: String,
}

/// One row from an uploaded feedback file (CSV/Excel/JSON — parsing is the
/// uploader's concern, we only see the extracted fields).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadRow {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// A raw record from any fetcher, tagged by source kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawRecord {
    Reddit(RedditPost),
    Twitter(Tweet),
    Web(WebHit),
    Upload(UploadRow),
}

// ────────────────────────────────────────────────────────────────────────────
// FeedbackItem
// ────────────────────────────────────────────────────────────────────────────

/// A canonicalized piece of feedback. Created once by the normalizer,
/// immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackItem {
    /// `"{source}-{source_id}-{ingestion millis}"` — unique, never reused.
    pub id: String,
    pub source: FeedbackSource,
    pub source_id: String,
    pub source_url: String,
    pub title: Option<String>,
    pub content: String,
    pub author: String,
    pub author_handle: Option<String>,
    /// Original post time.
    pub created_at: DateTime<Utc>,
    /// Ingestion time.
    pub fetched_at: DateTime<Utc>,
    /// 0–100, computed from source-specific signals.
    pub engagement_score: u32,
    /// Source-specific bag (subreddit, counts, hashtags). Never identity.
    #[serde(default)]
    pub metadata: Value,
}

// ────────────────────────────────────────────────────────────────────────────
// Classification
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Bug,
    FeatureRequest,
    Praise,
    Question,
    Complaint,
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Bug,
        Category::FeatureRequest,
        Category::Praise,
        Category::Question,
        Category::Complaint,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Bug => "bug",
            Category::FeatureRequest => "feature_request",
            Category::Praise => "praise",
            Category::Question => "question",
            Category::Complaint => "complaint",
            Category::Other => "other",
        }
    }

    /// Label form for issue trackers: underscores become hyphens.
    pub fn as_label(&self) -> String {
        self.as_str().replace('_', "-")
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Urgent,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// Ordering used for cluster aggregation: urgent(4) > high(3) > medium(2) > low(1).
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Urgent => 4,
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerSegment {
    Enterprise,
    #[serde(rename = "mid-market")]
    MidMarket,
    Smb,
    Unknown,
}

impl CustomerSegment {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerSegment::Enterprise => "enterprise",
            CustomerSegment::MidMarket => "mid-market",
            CustomerSegment::Smb => "smb",
            CustomerSegment::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The judgment attached to exactly one `FeedbackItem`. Produced once,
/// immutable; cluster-level aggregation derives new values, never edits these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    /// 0–100.
    pub confidence: u32,
    pub priority: Priority,
    /// Human-readable justifications, order-insignificant.
    pub priority_reasons: Vec<String>,
    pub sentiment: Sentiment,
    /// Most frequent first, at most 5 from the heuristic path.
    pub keywords: Vec<String>,
    pub customer_segment: CustomerSegment,
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_serde_snake_case() {
        let json = serde_json::to_string(&Category::FeatureRequest).unwrap();
        assert_eq!(json, r#""feature_request""#);
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::FeatureRequest);
    }

    #[test]
    fn test_mid_market_uses_hyphenated_wire_form() {
        let json = serde_json::to_string(&CustomerSegment::MidMarket).unwrap();
        assert_eq!(json, r#""mid-market""#);
        let back: CustomerSegment = serde_json::from_str(r#""mid-market""#).unwrap();
        assert_eq!(back, CustomerSegment::MidMarket);
    }

    #[test]
    fn test_priority_rank_ordering() {
        assert!(Priority::Urgent.rank() > Priority::High.rank());
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
    }

    #[test]
    fn test_category_label_hyphenates() {
        assert_eq!(Category::FeatureRequest.as_label(), "feature-request");
        assert_eq!(Category::Bug.as_label(), "bug");
    }

    #[test]
    fn test_raw_record_tagged_deserialization() {
        let json = r#"{
            "kind": "reddit",
            "id": "abc123",
            "title": "SSO support?",
            "selftext": "We need SSO",
            "author": "jdoe",
            "subreddit": "saas",
            "score": 42,
            "num_comments": 7,
            "permalink": "/r/saas/abc123",
            "created_utc": 1700000000.0
        }"#;
        match serde_json::from_str::<RawRecord>(json).unwrap() {
            RawRecord::Reddit(post) => {
                assert_eq!(post.id, "abc123");
                assert_eq!(post.score, 42);
            }
            other => panic!("Expected reddit record, got {other:?}"),
        }
    }

    #[test]
    fn test_reddit_post_missing_fields_default() {
        // A bare record must still parse — ingestion never fails on shape.
        let post: RedditPost = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(post.title, "");
        assert_eq!(post.score, 0);
        assert_eq!(post.num_comments, 0);
    }
}
