//! Drafter — turns one classified `FeedbackItem` into ticket text
//! (title, markdown description, labels, priority).
//!
//! LLM path with a deterministic template fallback; the template is the
//! documented contract and must stay byte-stable.

use std::collections::HashMap;

use futures::future::join_all;
use serde::Deserialize;
use tracing::warn;

use crate::llm_client::{LlmClient, LlmError};
use crate::models::feedback::{Category, ClassificationResult, FeedbackItem, Priority};
use crate::models::ticket::TicketDraft;
use crate::pipeline::prompts::{DRAFT_PROMPT_TEMPLATE, DRAFT_SYSTEM};
use crate::pipeline::text::{first_sentence, truncate_ellipsis};
use crate::pipeline::LLM_CALL_TIMEOUT;

/// Items drafted concurrently per group; groups run sequentially.
const DRAFT_BATCH_SIZE: usize = 3;

const TITLE_MAX_CHARS: usize = 70;
const QUOTE_MAX_CHARS: usize = 500;
const LABEL_KEYWORD_MAX_CHARS: usize = 20;
const LABEL_KEYWORD_LIMIT: usize = 2;

// ────────────────────────────────────────────────────────────────────────────
// Deterministic template
// ────────────────────────────────────────────────────────────────────────────

/// Title verb prefix per category.
pub fn category_prefix(category: Category) -> &'static str {
    match category {
        Category::Bug => "Fix:",
        Category::FeatureRequest => "Add:",
        Category::Complaint => "Address:",
        Category::Question => "Document:",
        Category::Praise => "Note:",
        Category::Other => "Review:",
    }
}

/// Deterministic ticket draft. Total — never fails.
pub fn template_draft(item: &FeedbackItem, classification: &ClassificationResult) -> TicketDraft {
    TicketDraft {
        title: draft_title(item, classification),
        description: draft_description(item, classification),
        suggested_labels: draft_labels(classification),
        suggested_priority: classification.priority,
    }
}

fn draft_title(item: &FeedbackItem, classification: &ClassificationResult) -> String {
    let subject = match &item.title {
        Some(title) if !title.is_empty() => truncate_ellipsis(title, TITLE_MAX_CHARS),
        _ => truncate_ellipsis(first_sentence(&item.content), TITLE_MAX_CHARS),
    };
    format!("{} {}", category_prefix(classification.category), subject)
}

fn draft_description(item: &FeedbackItem, classification: &ClassificationResult) -> String {
    let mut sections = Vec::new();

    sections.push(format!(
        "## Context\nSource: {} (by {})\nCategory: {} | Priority: {}",
        item.source, item.author, classification.category, classification.priority
    ));

    sections.push(format!(
        "## User Quote\n> {}",
        truncate_ellipsis(&item.content, QUOTE_MAX_CHARS)
    ));

    let mut details = format!(
        "## Classification Details\n- Category: {}\n- Sentiment: {}\n- Confidence: {}%\n- Customer Segment: {}",
        classification.category,
        classification.sentiment,
        classification.confidence,
        classification.customer_segment
    );
    if !classification.priority_reasons.is_empty() {
        details.push_str(&format!(
            "\n- Priority Reasons: {}",
            classification.priority_reasons.join("; ")
        ));
    }
    sections.push(details);

    if !classification.keywords.is_empty() {
        let backticked: Vec<String> = classification
            .keywords
            .iter()
            .map(|k| format!("`{k}`"))
            .collect();
        sections.push(format!("## Keywords\n{}", backticked.join(" ")));
    }

    if !item.source_url.is_empty() {
        sections.push(format!("## Source\n[View original]({})", item.source_url));
    }

    sections.join("\n\n")
}

fn draft_labels(classification: &ClassificationResult) -> Vec<String> {
    let mut labels = vec![classification.category.as_label()];
    if matches!(classification.priority, Priority::Urgent | Priority::High) {
        labels.push(classification.priority.as_str().to_string());
    }
    if classification.customer_segment == crate::models::feedback::CustomerSegment::Enterprise {
        labels.push("enterprise".to_string());
    }
    labels.extend(
        classification
            .keywords
            .iter()
            .filter(|k| k.chars().count() <= LABEL_KEYWORD_MAX_CHARS)
            .take(LABEL_KEYWORD_LIMIT)
            .cloned(),
    );
    labels
}

// ────────────────────────────────────────────────────────────────────────────
// LLM path + orchestrator
// ────────────────────────────────────────────────────────────────────────────

/// Wire shape expected from the drafting LLM call.
#[derive(Debug, Deserialize)]
struct LlmDraft {
    title: String,
    description: String,
    #[serde(default)]
    suggested_labels: Vec<String>,
    suggested_priority: Priority,
}

/// Drafting service. `llm: None` means template-only mode.
#[derive(Clone)]
pub struct TicketDrafter {
    llm: Option<LlmClient>,
}

impl TicketDrafter {
    pub fn new(llm: Option<LlmClient>) -> Self {
        TicketDrafter { llm }
    }

    /// Drafts one ticket. Never fails — the template backstops the LLM.
    pub async fn draft(
        &self,
        item: &FeedbackItem,
        classification: &ClassificationResult,
    ) -> TicketDraft {
        if let Some(llm) = &self.llm {
            match self.try_llm(llm, item, classification).await {
                Ok(draft) => return draft,
                Err(e) => {
                    warn!("LLM drafting unavailable for {}: {e} — using template", item.id);
                }
            }
        }
        template_draft(item, classification)
    }

    async fn try_llm(
        &self,
        llm: &LlmClient,
        item: &FeedbackItem,
        classification: &ClassificationResult,
    ) -> Result<TicketDraft, LlmError> {
        let prompt = build_draft_prompt(item, classification);
        let parsed: LlmDraft = tokio::time::timeout(
            LLM_CALL_TIMEOUT,
            llm.call_json(&prompt, DRAFT_SYSTEM),
        )
        .await
        .map_err(|_| LlmError::Timeout)??;

        if parsed.title.trim().is_empty() || parsed.description.trim().is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(TicketDraft {
            title: parsed.title,
            description: parsed.description,
            suggested_labels: parsed.suggested_labels,
            suggested_priority: parsed.suggested_priority,
        })
    }

    /// Drafts in concurrency groups of 3; every input id gets exactly one
    /// draft, keyed by item id.
    pub async fn draft_batch(
        &self,
        pairs: &[(FeedbackItem, ClassificationResult)],
    ) -> HashMap<String, TicketDraft> {
        let mut drafts = HashMap::with_capacity(pairs.len());
        for group in pairs.chunks(DRAFT_BATCH_SIZE) {
            let drafted = join_all(
                group
                    .iter()
                    .map(|(item, classification)| self.draft(item, classification)),
            )
            .await;
            for ((item, _), draft) in group.iter().zip(drafted) {
                drafts.insert(item.id.clone(), draft);
            }
        }
        drafts
    }
}

fn build_draft_prompt(item: &FeedbackItem, classification: &ClassificationResult) -> String {
    DRAFT_PROMPT_TEMPLATE
        .replace("{source}", item.source.as_str())
        .replace("{title}", item.title.as_deref().unwrap_or(""))
        .replace("{content}", &item.content)
        .replace("{category}", classification.category.as_str())
        .replace("{priority}", classification.priority.as_str())
        .replace("{sentiment}", classification.sentiment.as_str())
        .replace("{keywords}", &classification.keywords.join(", "))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
