//! Clusterer — groups classified feedback into theme clusters so a burst of
//! related mentions becomes one suggested ticket instead of many.
//!
//! Deterministic path: greedy shared-keyword merging inside category
//! partitions (clustering never crosses a category boundary). An LLM-assisted
//! path may name the themes instead when the batch is big enough and a
//! credential exists; malformed or empty model output falls back to the
//! deterministic algorithm.
//!
//! Clusters are ephemeral — recomputed per run, never persisted.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::llm_client::{LlmClient, LlmError};
use crate::models::feedback::{
    Category, ClassificationResult, FeedbackItem, FeedbackSource, Priority, Sentiment,
};
use crate::pipeline::drafter::category_prefix;
use crate::pipeline::prompts::{CLUSTER_PROMPT_TEMPLATE, CLUSTER_SYSTEM};
use crate::pipeline::text::{top_keywords, truncate_chars};
use crate::pipeline::LLM_CALL_TIMEOUT;

/// Keywords retained per item for overlap comparison.
const CLUSTER_KEYWORDS_PER_ITEM: usize = 10;
/// Minimum shared keywords for two items to merge into one theme.
const MIN_SHARED_KEYWORDS: usize = 2;
/// Keywords joined into a theme name.
const THEME_KEYWORD_LIMIT: usize = 3;
/// The LLM path is only attempted at or above this batch size.
const LLM_CLUSTER_MIN_ITEMS: usize = 5;

const SUMMARY_MAX_CHARS: usize = 200;
const SUMMARY_QUOTE_CHARS: usize = 50;
const SUMMARY_QUOTE_LIMIT: usize = 3;
const TICKET_QUOTE_LIMIT: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A feedback item paired with its classification — the clusterer's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedItem {
    pub item: FeedbackItem,
    pub classification: ClassificationResult,
}

/// Ticket text suggested for a whole cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedTicket {
    pub title: String,
    pub description: String,
    pub labels: Vec<String>,
}

/// A derived grouping of items sharing a theme. Aggregates are computed
/// fresh from the constituents; the originals are never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteredFeedback {
    pub theme: String,
    pub items: Vec<ClassifiedItem>,
    pub category: Category,
    pub priority: Priority,
    pub sentiment: Sentiment,
    pub summary: String,
    pub mention_count: usize,
    /// Distinct sources, deduplicated, first-encounter order.
    pub sources: Vec<FeedbackSource>,
    pub suggested_ticket: SuggestedTicket,
}

// ────────────────────────────────────────────────────────────────────────────
// Deterministic clustering
// ────────────────────────────────────────────────────────────────────────────

/// Keywords used for overlap comparison — independent of the classifier's
/// stored keywords, recomputed over `content + " " + title`.
fn cluster_keywords(item: &FeedbackItem) -> Vec<String> {
    let combined = match &item.title {
        Some(title) => format!("{} {}", item.content, title),
        None => item.content.clone(),
    };
    top_keywords(&combined, CLUSTER_KEYWORDS_PER_ITEM)
}

/// Greedy deterministic clustering. Items are partitioned by category, then
/// merged within each partition on ≥ 2 shared keywords in input order.
/// Result is sorted by priority descending, then mention count descending.
pub fn cluster_feedback(pairs: Vec<ClassifiedItem>) -> Vec<ClusteredFeedback> {
    // Category partitions in first-encounter order, for determinism.
    let mut partitions: Vec<(Category, Vec<ClassifiedItem>)> = Vec::new();
    for pair in pairs {
        let category = pair.classification.category;
        match partitions.iter_mut().find(|(c, _)| *c == category) {
            Some((_, members)) => members.push(pair),
            None => partitions.push((category, vec![pair])),
        }
    }

    let mut clusters = Vec::new();
    for (_, members) in partitions {
        clusters.extend(cluster_partition(members));
    }

    clusters.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then(b.mention_count.cmp(&a.mention_count))
    });
    clusters
}

fn cluster_partition(members: Vec<ClassifiedItem>) -> Vec<ClusteredFeedback> {
    let keywords: Vec<Vec<String>> = members.iter().map(|p| cluster_keywords(&p.item)).collect();
    let mut assigned = vec![false; members.len()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for i in 0..members.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut group = vec![i];
        for j in (i + 1)..members.len() {
            if assigned[j] {
                continue;
            }
            let shared = keywords[i].iter().filter(|k| keywords[j].contains(k)).count();
            if shared >= MIN_SHARED_KEYWORDS {
                assigned[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }

    let mut members: Vec<Option<ClassifiedItem>> = members.into_iter().map(Some).collect();
    groups
        .into_iter()
        .map(|group| {
            let theme = theme_name(&group, &keywords);
            // Group indexes are disjoint, so every take yields a member.
            let group_members: Vec<ClassifiedItem> = group
                .into_iter()
                .filter_map(|idx| members[idx].take())
                .collect();
            build_cluster(theme, group_members)
        })
        .collect()
}

/// Theme label: singleton = its own top keyword (or "Other"); merged group =
/// up to 3 keywords by combined frequency, joined with " + ".
fn theme_name(group: &[usize], keywords: &[Vec<String>]) -> String {
    if group.len() == 1 {
        return keywords[group[0]]
            .first()
            .cloned()
            .unwrap_or_else(|| "Other".to_string());
    }
    let mut counted: Vec<(&String, usize)> = Vec::new();
    for &idx in group {
        for keyword in &keywords[idx] {
            match counted.iter_mut().find(|(k, _)| *k == keyword) {
                Some((_, count)) => *count += 1,
                None => counted.push((keyword, 1)),
            }
        }
    }
    counted.sort_by(|a, b| b.1.cmp(&a.1));
    let top: Vec<String> = counted
        .into_iter()
        .take(THEME_KEYWORD_LIMIT)
        .map(|(k, _)| k.clone())
        .collect();
    if top.is_empty() {
        "Other".to_string()
    } else {
        top.join(" + ")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cluster aggregation
// ────────────────────────────────────────────────────────────────────────────

fn build_cluster(theme: String, members: Vec<ClassifiedItem>) -> ClusteredFeedback {
    let category = members[0].classification.category;
    let priority = aggregate_priority(&members);
    let sentiment = aggregate_sentiment(&members);
    let summary = cluster_summary(&theme, &members);
    let suggested_ticket = suggested_ticket(&theme, category, priority, sentiment, &members);

    let mut sources = Vec::new();
    for pair in &members {
        if !sources.contains(&pair.item.source) {
            sources.push(pair.item.source);
        }
    }

    ClusteredFeedback {
        mention_count: members.len(),
        theme,
        category,
        priority,
        sentiment,
        summary,
        sources,
        suggested_ticket,
        items: members,
    }
}

/// Maximum priority across members, by rank (urgent 4 … low 1).
fn aggregate_priority(members: &[ClassifiedItem]) -> Priority {
    members
        .iter()
        .map(|p| p.classification.priority)
        .max_by_key(Priority::rank)
        .unwrap_or(Priority::Medium)
}

/// Majority sentiment. Candidates are compared in the fixed order
/// positive → negative → neutral with strictly-greater, so the
/// first-counted candidate wins a tie.
fn aggregate_sentiment(members: &[ClassifiedItem]) -> Sentiment {
    let count = |s: Sentiment| {
        members
            .iter()
            .filter(|p| p.classification.sentiment == s)
            .count()
    };
    let mut best = Sentiment::Positive;
    let mut best_count = count(Sentiment::Positive);
    for candidate in [Sentiment::Negative, Sentiment::Neutral] {
        let n = count(candidate);
        if n > best_count {
            best = candidate;
            best_count = n;
        }
    }
    best
}

fn cluster_summary(theme: &str, members: &[ClassifiedItem]) -> String {
    if members.len() == 1 {
        return truncate_chars(&members[0].item.content, SUMMARY_MAX_CHARS);
    }
    let quotes: Vec<String> = members
        .iter()
        .take(SUMMARY_QUOTE_LIMIT)
        .map(|p| format!("\"{}\"", truncate_chars(&p.item.content, SUMMARY_QUOTE_CHARS)))
        .collect();
    format!(
        "{} mentions about \"{}\": {}",
        members.len(),
        theme,
        quotes.join("; ")
    )
}

fn suggested_ticket(
    theme: &str,
    category: Category,
    priority: Priority,
    sentiment: Sentiment,
    members: &[ClassifiedItem],
) -> SuggestedTicket {
    let noun = if members.len() == 1 { "mention" } else { "mentions" };
    let title = format!(
        "{} {} ({} {})",
        category_prefix(category),
        theme,
        members.len(),
        noun
    );

    let quotes: Vec<String> = members
        .iter()
        .take(TICKET_QUOTE_LIMIT)
        .map(|p| {
            format!(
                "- \"{}\" — {} ({})",
                truncate_chars(&p.item.content, 100),
                p.item.author,
                p.item.source
            )
        })
        .collect();

    let mut sources = Vec::new();
    for pair in members {
        let s = pair.item.source.as_str();
        if !sources.contains(&s) {
            sources.push(s);
        }
    }

    let description = format!(
        "## Summary\n{}\n\n## User Quotes\n{}\n\n## Sources\n{}\n\nPriority: {} | Sentiment: {}",
        cluster_summary(theme, members),
        quotes.join("\n"),
        sources.join(", "),
        priority,
        sentiment
    );

    let mut labels = vec![category.as_label()];
    if matches!(priority, Priority::Urgent | Priority::High) {
        labels.push(priority.as_str().to_string());
    }

    SuggestedTicket {
        title,
        description,
        labels,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// LLM-assisted path
// ────────────────────────────────────────────────────────────────────────────

/// Theme assignment as returned by the clustering LLM call.
#[derive(Debug, Deserialize)]
struct ThemeAssignment {
    theme: String,
    #[serde(default)]
    item_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct LlmThemes {
    themes: Vec<ThemeAssignment>,
}

/// Clustering service. The deterministic algorithm is always available; the
/// LLM path replaces theme discovery when the batch is big enough.
#[derive(Clone)]
pub struct FeedbackClusterer {
    llm: Option<LlmClient>,
}

impl FeedbackClusterer {
    pub fn new(llm: Option<LlmClient>) -> Self {
        FeedbackClusterer { llm }
    }

    pub async fn cluster(&self, pairs: Vec<ClassifiedItem>) -> Vec<ClusteredFeedback> {
        if pairs.len() >= LLM_CLUSTER_MIN_ITEMS {
            if let Some(llm) = &self.llm {
                match self.try_llm(llm, &pairs).await {
                    Ok(clusters) if !clusters.is_empty() => {
                        info!("LLM clustering produced {} themes", clusters.len());
                        return clusters;
                    }
                    Ok(_) => warn!("LLM clustering produced zero themes — using deterministic path"),
                    Err(e) => warn!("LLM clustering unavailable: {e} — using deterministic path"),
                }
            }
        }
        cluster_feedback(pairs)
    }

    async fn try_llm(
        &self,
        llm: &LlmClient,
        pairs: &[ClassifiedItem],
    ) -> Result<Vec<ClusteredFeedback>, LlmError> {
        let prompt = build_cluster_prompt(pairs);
        let parsed: LlmThemes = tokio::time::timeout(
            LLM_CALL_TIMEOUT,
            llm.call_json(&prompt, CLUSTER_SYSTEM),
        )
        .await
        .map_err(|_| LlmError::Timeout)??;

        Ok(clusters_from_themes(parsed, pairs))
    }
}

/// Materializes LLM theme assignments into clusters. Themes are split per
/// category (a model response never crosses the category-isolation
/// invariant), unknown ids are dropped, and unassigned items become
/// singleton clusters via the deterministic namer.
fn clusters_from_themes(parsed: LlmThemes, pairs: &[ClassifiedItem]) -> Vec<ClusteredFeedback> {
    let mut taken = vec![false; pairs.len()];
    let mut clusters = Vec::new();

    for assignment in parsed.themes {
        // Per-category split preserves category isolation.
        let mut by_category: Vec<(Category, Vec<ClassifiedItem>)> = Vec::new();
        for id in &assignment.item_ids {
            let Some(idx) = pairs.iter().position(|p| &p.item.id == id) else {
                continue; // hallucinated id
            };
            if taken[idx] {
                continue;
            }
            taken[idx] = true;
            let pair = pairs[idx].clone();
            let category = pair.classification.category;
            match by_category.iter_mut().find(|(c, _)| *c == category) {
                Some((_, members)) => members.push(pair),
                None => by_category.push((category, vec![pair])),
            }
        }
        for (_, members) in by_category {
            clusters.push(build_cluster(assignment.theme.clone(), members));
        }
    }

    // Items the model skipped still need a home.
    let leftovers: Vec<ClassifiedItem> = pairs
        .iter()
        .zip(&taken)
        .filter(|(_, taken)| !**taken)
        .map(|(p, _)| p.clone())
        .collect();
    if !leftovers.is_empty() {
        clusters.extend(cluster_feedback(leftovers));
    }

    clusters.sort_by(|a, b| {
        b.priority
            .rank()
            .cmp(&a.priority.rank())
            .then(b.mention_count.cmp(&a.mention_count))
    });
    clusters
}

fn build_cluster_prompt(pairs: &[ClassifiedItem]) -> String {
    let items_block: Vec<String> = pairs
        .iter()
        .map(|p| {
            format!(
                "- id: {} | category: {} | text: {}",
                p.item.id,
                p.classification.category,
                truncate_chars(&p.item.content, 200)
            )
        })
        .collect();
    CLUSTER_PROMPT_TEMPLATE.replace("{items}", &items_block.join("\n"))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
