//! Draft filtering — the review screen's query surface. All provided
//! dimensions are ANDed; an absent value or the literal `"all"` leaves a
//! dimension unconstrained.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::models::feedback::{Category, FeedbackSource, Priority};
use crate::models::ticket::{DraftedTicket, TicketStatus};

/// Query parameters of `GET /api/v1/review/drafts`. Enum dimensions arrive
/// as strings so `all` (and anything unparseable) can mean "unconstrained".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftFilters {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub source: Option<String>,
    /// Case-insensitive substring over feedback content/title and the
    /// effective draft's title/description.
    pub search: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// Parses an enum filter value via its serde wire form. `all`, empty, and
/// unknown values mean no constraint.
fn parse_dimension<T: DeserializeOwned>(raw: &Option<String>) -> Option<T> {
    raw.as_deref()
        .filter(|v| !v.is_empty() && *v != "all")
        .and_then(|v| serde_json::from_value(serde_json::Value::String(v.to_string())).ok())
}

/// Applies status, category, priority, source, free-text search, and
/// date-range filters, in that order, all ANDed.
pub fn apply_filters(drafts: &[DraftedTicket], filters: &DraftFilters) -> Vec<DraftedTicket> {
    let status: Option<TicketStatus> = parse_dimension(&filters.status);
    let category: Option<Category> = parse_dimension(&filters.category);
    let priority: Option<Priority> = parse_dimension(&filters.priority);
    let source: Option<FeedbackSource> = parse_dimension(&filters.source);
    let search = filters
        .search
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_lowercase);

    drafts
        .iter()
        .filter(|d| status.map_or(true, |s| d.status == s))
        .filter(|d| category.map_or(true, |c| d.classification.category == c))
        .filter(|d| priority.map_or(true, |p| d.classification.priority == p))
        .filter(|d| source.map_or(true, |s| d.feedback_item.source == s))
        .filter(|d| search.as_deref().map_or(true, |needle| matches_search(d, needle)))
        .filter(|d| filters.date_from.map_or(true, |from| d.created_at >= from))
        .filter(|d| filters.date_to.map_or(true, |to| d.created_at <= to))
        .cloned()
        .collect()
}

fn matches_search(draft: &DraftedTicket, needle: &str) -> bool {
    let effective = draft.effective_draft();
    let haystacks = [
        Some(draft.feedback_item.content.as_str()),
        draft.feedback_item.title.as_deref(),
        Some(effective.title.as_str()),
        Some(effective.description.as_str()),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|h| h.to_lowercase().contains(needle))
}
