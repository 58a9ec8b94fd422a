//! Derived statistics over the draft collection. One O(n) pass; category and
//! priority buckets are always present (zeroed), source buckets are lazy.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::feedback::{Category, Priority};
use crate::models::ticket::{DraftedTicket, TicketStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ReviewStats {
    pub total: usize,
    /// Awaiting a decision: status pending or edited.
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
}

/// Single pass over all drafts.
pub fn compute_stats(drafts: &[DraftedTicket]) -> ReviewStats {
    let mut by_category: BTreeMap<String, usize> = Category::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), 0))
        .collect();
    let mut by_priority: BTreeMap<String, usize> = Priority::ALL
        .iter()
        .map(|p| (p.as_str().to_string(), 0))
        .collect();
    let mut by_source: BTreeMap<String, usize> = BTreeMap::new();

    let mut pending = 0;
    let mut approved = 0;
    let mut rejected = 0;

    for draft in drafts {
        match draft.status {
            TicketStatus::Pending | TicketStatus::Edited => pending += 1,
            TicketStatus::Approved => approved += 1,
            TicketStatus::Rejected => rejected += 1,
        }
        *by_category
            .entry(draft.classification.category.as_str().to_string())
            .or_insert(0) += 1;
        *by_priority
            .entry(draft.classification.priority.as_str().to_string())
            .or_insert(0) += 1;
        *by_source
            .entry(draft.feedback_item.source.as_str().to_string())
            .or_insert(0) += 1;
    }

    ReviewStats {
        total: drafts.len(),
        pending,
        approved,
        rejected,
        by_category,
        by_priority,
        by_source,
    }
}

/// Drafts still awaiting a decision.
pub fn pending_count(drafts: &[DraftedTicket]) -> usize {
    drafts.iter().filter(|d| d.is_actionable()).count()
}

/// Actionable drafts classified urgent.
pub fn urgent_count(drafts: &[DraftedTicket]) -> usize {
    drafts
        .iter()
        .filter(|d| d.is_actionable() && d.classification.priority == Priority::Urgent)
        .count()
}
