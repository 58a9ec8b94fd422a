//! Classifier — assigns category/priority/sentiment/segment to a
//! `FeedbackItem`.
//!
//! Two backends, composed the same way the fit scorer splits keyword vs LLM:
//! `try_llm` (primary, can fail) and `heuristic_classify` (total, never
//! fails). Any LLM failure — missing credential, network error, malformed or
//! schema-violating JSON, timeout — degrades silently to the heuristic, so
//! `classify` always returns a complete, schema-valid result.

use std::collections::HashMap;

use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::llm_client::{LlmClient, LlmError};
use crate::models::feedback::{
    Category, ClassificationResult, CustomerSegment, FeedbackItem, Priority, Sentiment,
};
use crate::pipeline::prompts::{CLASSIFY_PROMPT_TEMPLATE, CLASSIFY_SYSTEM};
use crate::pipeline::text::top_keywords;
use crate::pipeline::LLM_CALL_TIMEOUT;

/// Items classified concurrently per group; groups run sequentially.
const CLASSIFY_BATCH_SIZE: usize = 5;

/// Fixed confidence for heuristic results — signals lower certainty than an
/// LLM-backed classification.
const HEURISTIC_CONFIDENCE: u32 = 60;

/// Engagement score above which the "High engagement" priority rule fires.
const HIGH_ENGAGEMENT_THRESHOLD: u32 = 70;

// ────────────────────────────────────────────────────────────────────────────
// Heuristic keyword lists
// ────────────────────────────────────────────────────────────────────────────

const BUG_MARKERS: &[&str] = &["bug", "broken", "error", "crash", "not working"];
const FEATURE_MARKERS: &[&str] = &["feature", "would be great", "please add", "wish", "need"];
const PRAISE_MARKERS: &[&str] = &["love", "amazing", "great", "awesome"];
const COMPLAINT_MARKERS: &[&str] = &["terrible", "worst", "hate", "disappointed"];

const POSITIVE_WORDS: &[&str] = &["love", "great", "amazing", "awesome", "excellent", "best"];
const NEGATIVE_WORDS: &[&str] = &["hate", "terrible", "worst", "broken", "frustrated", "disappointed"];

const ENTERPRISE_PRIORITY_MARKERS: &[&str] = &["enterprise", "team of", "company"];
const BLOCKER_MARKERS: &[&str] = &["blocking", "blocker"];

const ENTERPRISE_SEGMENT_MARKERS: &[&str] = &["enterprise", "sso", "500", "1000"];
const MID_MARKET_SEGMENT_MARKERS: &[&str] = &["team", "company"];
const SMB_SEGMENT_MARKERS: &[&str] = &["personal", "solo"];

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

// ────────────────────────────────────────────────────────────────────────────
// Heuristic path — deterministic and total
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic keyword classification. Same input, byte-identical output.
pub fn heuristic_classify(item: &FeedbackItem) -> ClassificationResult {
    let combined = match &item.title {
        Some(title) => format!("{} {}", item.content, title),
        None => item.content.clone(),
    };
    let text = combined.to_lowercase();

    // Category marker lists are checked in priority order; first match wins.
    let category = if contains_any(&text, BUG_MARKERS) {
        Category::Bug
    } else if contains_any(&text, FEATURE_MARKERS) {
        Category::FeatureRequest
    } else if contains_any(&text, PRAISE_MARKERS) {
        Category::Praise
    } else if text.contains("how do") || text.contains("how to") || text.contains('?') {
        Category::Question
    } else if contains_any(&text, COMPLAINT_MARKERS) {
        Category::Complaint
    } else {
        Category::Other
    };

    // Sentiment uses its own word lists, independent of category.
    let sentiment = if contains_any(&text, POSITIVE_WORDS) {
        Sentiment::Positive
    } else if contains_any(&text, NEGATIVE_WORDS) {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    let mut priority = Priority::Medium;
    let mut priority_reasons = Vec::new();
    if contains_any(&text, ENTERPRISE_PRIORITY_MARKERS) {
        priority = Priority::High;
        priority_reasons.push("Enterprise mention".to_string());
    }
    if contains_any(&text, BLOCKER_MARKERS) {
        priority = Priority::Urgent;
        priority_reasons.push("Blocker mentioned".to_string());
    }
    if item.engagement_score > HIGH_ENGAGEMENT_THRESHOLD {
        if priority == Priority::Medium {
            priority = Priority::High;
        }
        // Appended even when priority was already elevated by other rules.
        priority_reasons.push("High engagement".to_string());
    }

    let customer_segment = if contains_any(&text, ENTERPRISE_SEGMENT_MARKERS) {
        CustomerSegment::Enterprise
    } else if contains_any(&text, MID_MARKET_SEGMENT_MARKERS) {
        CustomerSegment::MidMarket
    } else if contains_any(&text, SMB_SEGMENT_MARKERS) {
        CustomerSegment::Smb
    } else {
        CustomerSegment::Unknown
    };

    ClassificationResult {
        category,
        confidence: HEURISTIC_CONFIDENCE,
        priority,
        priority_reasons,
        sentiment,
        keywords: top_keywords(&combined, 5),
        customer_segment,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LLM path + orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Wire shape expected from the classification LLM call. Closed enums reject
/// out-of-vocabulary values at deserialization, which triggers the fallback.
#[derive(Debug, Deserialize)]
struct LlmClassification {
    category: Category,
    confidence: i64,
    priority: Priority,
    #[serde(default)]
    priority_reasons: Vec<String>,
    sentiment: Sentiment,
    #[serde(default)]
    keywords: Vec<String>,
    customer_segment: CustomerSegment,
}

impl LlmClassification {
    /// Clamps and bounds fields into a valid `ClassificationResult`.
    fn into_result(self) -> ClassificationResult {
        let mut keywords = self.keywords;
        keywords.truncate(10);
        ClassificationResult {
            category: self.category,
            confidence: self.confidence.clamp(0, 100) as u32,
            priority: self.priority,
            priority_reasons: self.priority_reasons,
            sentiment: self.sentiment,
            keywords,
            customer_segment: self.customer_segment,
        }
    }
}

/// Classification service. `llm: None` means heuristic-only mode.
#[derive(Clone)]
pub struct FeedbackClassifier {
    llm: Option<LlmClient>,
    company_context: Option<String>,
}

impl FeedbackClassifier {
    pub fn new(llm: Option<LlmClient>, company_context: Option<String>) -> Self {
        FeedbackClassifier {
            llm,
            company_context,
        }
    }

    /// Classifies one item. Never fails: the heuristic backstops every LLM
    /// failure mode.
    pub async fn classify(&self, item: &FeedbackItem) -> ClassificationResult {
        if let Some(llm) = &self.llm {
            match self.try_llm(llm, item).await {
                Ok(result) => return result,
                Err(e) => {
                    warn!("LLM classification unavailable for {}: {e} — using heuristic", item.id);
                }
            }
        }
        heuristic_classify(item)
    }

    /// Primary path: prompt the LLM for a single JSON object and validate it
    /// strictly. Timeout is treated as unavailability.
    async fn try_llm(
        &self,
        llm: &LlmClient,
        item: &FeedbackItem,
    ) -> Result<ClassificationResult, LlmError> {
        let prompt = build_classify_prompt(item, self.company_context.as_deref());
        let parsed: LlmClassification = tokio::time::timeout(
            LLM_CALL_TIMEOUT,
            llm.call_json(&prompt, CLASSIFY_SYSTEM),
        )
        .await
        .map_err(|_| LlmError::Timeout)??;
        debug!("LLM classified {} as {}", item.id, parsed.category);
        Ok(parsed.into_result())
    }

    /// Classifies items in concurrency groups of 5, groups running
    /// sequentially. Every input id gets exactly one result; completion
    /// order is not meaningful.
    pub async fn classify_batch(
        &self,
        items: &[FeedbackItem],
    ) -> HashMap<String, ClassificationResult> {
        let mut results = HashMap::with_capacity(items.len());
        for group in items.chunks(CLASSIFY_BATCH_SIZE) {
            let classified = join_all(group.iter().map(|item| self.classify(item))).await;
            for (item, result) in group.iter().zip(classified) {
                results.insert(item.id.clone(), result);
            }
        }
        results
    }
}

fn build_classify_prompt(item: &FeedbackItem, company_context: Option<&str>) -> String {
    let context_block = company_context
        .map(|c| format!("COMPANY CONTEXT:\n{c}\n\n"))
        .unwrap_or_default();
    CLASSIFY_PROMPT_TEMPLATE
        .replace("{company_context}", &context_block)
        .replace("{source}", item.source.as_str())
        .replace("{metadata}", &item.metadata.to_string())
        .replace("{engagement_score}", &item.engagement_score.to_string())
        .replace("{title}", item.title.as_deref().unwrap_or(""))
        .replace("{content}", &item.content)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feedback::FeedbackSource;
    use chrono::Utc;

    fn item(content: &str, title: Option<&str>, engagement: u32) -> FeedbackItem {
        FeedbackItem {
            id: format!("reddit-test-{engagement}"),
            source: FeedbackSource::Reddit,
            source_id: "test".to_string(),
            source_url: String::new(),
            title: title.map(str::to_string),
            content: content.to_string(),
            author: "jdoe".to_string(),
            author_handle: None,
            created_at: Utc::now(),
            fetched_at: Utc::now(),
            engagement_score: engagement,
            metadata: serde_json::json!({}),
        }
    }

    #[test]
    fn test_heuristic_is_deterministic() {
        let i = item("This bug is blocking our enterprise rollout", None, 90);
        assert_eq!(heuristic_classify(&i), heuristic_classify(&i));
    }

    #[test]
    fn test_bug_checked_before_feature_request() {
        let i = item("this is broken and also a feature request", None, 0);
        assert_eq!(heuristic_classify(&i).category, Category::Bug);
    }

    #[test]
    fn test_feature_request_on_need() {
        let i = item("we need dark mode", None, 0);
        assert_eq!(heuristic_classify(&i).category, Category::FeatureRequest);
    }

    #[test]
    fn test_praise_category_and_positive_sentiment() {
        let result = heuristic_classify(&item("I love this product", None, 0));
        assert_eq!(result.category, Category::Praise);
        assert_eq!(result.sentiment, Sentiment::Positive);
    }

    #[test]
    fn test_question_on_question_mark() {
        let i = item("is there an API for exports", Some("pricing?"), 0);
        assert_eq!(heuristic_classify(&i).category, Category::Question);
    }

    #[test]
    fn test_complaint_category() {
        let i = item("worst support experience ever", None, 0);
        assert_eq!(heuristic_classify(&i).category, Category::Complaint);
    }

    #[test]
    fn test_other_when_nothing_matches() {
        let i = item("just sharing my setup", None, 0);
        assert_eq!(heuristic_classify(&i).category, Category::Other);
    }

    #[test]
    fn test_broken_is_bug_category_and_negative_sentiment() {
        // "broken" sits on both the bug-category and negative-sentiment lists
        let result = heuristic_classify(&item("the dashboard is broken", None, 0));
        assert_eq!(result.category, Category::Bug);
        assert_eq!(result.sentiment, Sentiment::Negative);
    }

    #[test]
    fn test_title_participates_in_classification() {
        let result = heuristic_classify(&item("see title", Some("app keeps crashing with error"), 0));
        assert_eq!(result.category, Category::Bug);
    }

    #[test]
    fn test_blocker_overrides_engagement_bump_with_both_reasons() {
        let result = heuristic_classify(&item("this is blocking our launch", None, 90));
        assert_eq!(result.priority, Priority::Urgent);
        assert!(result.priority_reasons.iter().any(|r| r == "Blocker mentioned"));
        assert!(result.priority_reasons.iter().any(|r| r == "High engagement"));
    }

    #[test]
    fn test_enterprise_mention_sets_high_priority() {
        let result = heuristic_classify(&item("our company depends on this", None, 0));
        assert_eq!(result.priority, Priority::High);
        assert!(result.priority_reasons.iter().any(|r| r == "Enterprise mention"));
    }

    #[test]
    fn test_high_engagement_bumps_medium_to_high() {
        let result = heuristic_classify(&item("just some feedback text here", None, 71));
        assert_eq!(result.priority, Priority::High);
        assert_eq!(result.priority_reasons, vec!["High engagement".to_string()]);
    }

    #[test]
    fn test_engagement_at_threshold_does_not_fire() {
        let result = heuristic_classify(&item("just some feedback text here", None, 70));
        assert_eq!(result.priority, Priority::Medium);
        assert!(result.priority_reasons.is_empty());
    }

    #[test]
    fn test_segment_order_enterprise_before_mid_market() {
        // "company" alone is mid-market, but "sso" wins first
        let result = heuristic_classify(&item("our company wants sso", None, 0));
        assert_eq!(result.customer_segment, CustomerSegment::Enterprise);
    }

    #[test]
    fn test_segment_smb_and_unknown() {
        let smb = heuristic_classify(&item("using it for personal projects", None, 0));
        assert_eq!(smb.customer_segment, CustomerSegment::Smb);
        let unknown = heuristic_classify(&item("just some feedback", None, 0));
        assert_eq!(unknown.customer_segment, CustomerSegment::Unknown);
    }

    #[test]
    fn test_heuristic_confidence_is_60_and_keywords_capped() {
        let result = heuristic_classify(&item(
            "export export dashboard dashboard filters filters search search billing billing alerts",
            None,
            0,
        ));
        assert_eq!(result.confidence, 60);
        assert!(result.keywords.len() <= 5);
        assert_eq!(result.keywords[0], "export");
    }

    #[test]
    fn test_sso_end_to_end_scenario() {
        let i = item(
            "We are blocked without SSO for our enterprise rollout, team of 500",
            Some("Need SSO"),
            40,
        );
        let result = heuristic_classify(&i);
        assert_eq!(result.category, Category::FeatureRequest, "matches \"need\"");
        assert_eq!(result.customer_segment, CustomerSegment::Enterprise);
        assert!(result.priority.rank() >= Priority::High.rank());
    }

    #[test]
    fn test_llm_classification_clamps_confidence() {
        let parsed: LlmClassification = serde_json::from_str(
            r#"{
                "category": "bug",
                "confidence": 250,
                "priority": "high",
                "sentiment": "negative",
                "customer_segment": "unknown"
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.into_result().confidence, 100);
    }

    #[test]
    fn test_llm_classification_rejects_unknown_category() {
        let result = serde_json::from_str::<LlmClassification>(
            r#"{
                "category": "rant",
                "confidence": 80,
                "priority": "high",
                "sentiment": "negative",
                "customer_segment": "unknown"
            }"#,
        );
        assert!(result.is_err(), "out-of-vocabulary category must fail validation");
    }

    #[tokio::test]
    async fn test_batch_yields_one_result_per_input_id() {
        let classifier = FeedbackClassifier::new(None, None);
        let items: Vec<FeedbackItem> = (0..12)
            .map(|n| {
                let mut i = item("we need exports", None, n);
                i.id = format!("reddit-{n}-0");
                i
            })
            .collect();
        let results = classifier.classify_batch(&items).await;
        assert_eq!(results.len(), items.len());
        for i in &items {
            assert!(results.contains_key(&i.id), "missing result for {}", i.id);
        }
    }
}
