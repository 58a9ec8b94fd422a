//! Ingest orchestration: raw records in, reviewed-queue drafts out.
//!
//! Order of operations is fixed: normalize, drop records whose source item
//! already has a draft, dedupe by content, sort by engagement, classify,
//! draft, enqueue. Classification and drafting never abort the run; their
//! fallbacks are total.

use std::collections::HashSet;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::{FeedbackItem, RawRecord};
use crate::models::ticket::{DraftedTicket, Notification, NotificationKind};
use crate::pipeline::classifier::{heuristic_classify, FeedbackClassifier};
use crate::pipeline::drafter::{template_draft, TicketDrafter};
use crate::pipeline::normalizer;
use crate::review::store::ReviewQueue;

/// What one ingest run did, returned to the caller verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub received: usize,
    /// Dropped because a draft for the same source item already exists.
    pub skipped_existing: usize,
    /// Dropped as near-duplicate content within this run or the queue.
    pub deduplicated: usize,
    pub drafted: usize,
    pub draft_ids: Vec<Uuid>,
}

pub async fn run_ingest(
    records: Vec<RawRecord>,
    classifier: &FeedbackClassifier,
    drafter: &TicketDrafter,
    queue: &ReviewQueue,
) -> Result<IngestReport, AppError> {
    let received = records.len();
    let items: Vec<FeedbackItem> = records.iter().map(normalizer::normalize).collect();

    let existing = queue.existing_items().await?;
    let existing_sources: HashSet<(String, String)> = existing
        .iter()
        .map(|i| (i.source.as_str().to_string(), i.source_id.clone()))
        .collect();

    let fresh: Vec<FeedbackItem> = items
        .into_iter()
        .filter(|i| {
            !existing_sources.contains(&(i.source.as_str().to_string(), i.source_id.clone()))
        })
        .collect();
    let skipped_existing = received - fresh.len();

    let deduped = normalizer::dedupe(fresh, &existing);
    let deduplicated = received - skipped_existing - deduped.len();

    let ordered = normalizer::sort_by_priority(deduped);

    let mut classifications = classifier.classify_batch(&ordered).await;
    let pairs: Vec<_> = ordered
        .into_iter()
        .map(|item| {
            let classification = classifications
                .remove(&item.id)
                .unwrap_or_else(|| heuristic_classify(&item));
            (item, classification)
        })
        .collect();

    let mut drafts = drafter.draft_batch(&pairs).await;
    let drafted: Vec<DraftedTicket> = pairs
        .into_iter()
        .map(|(item, classification)| {
            let draft = drafts
                .remove(&item.id)
                .unwrap_or_else(|| template_draft(&item, &classification));
            DraftedTicket::new(item, classification, draft)
        })
        .collect();

    let draft_ids: Vec<Uuid> = drafted.iter().map(|d| d.id).collect();
    let drafted_count = drafted.len();
    queue.add_drafts(drafted).await?;

    if drafted_count > 0 {
        queue
            .push_notification(Notification::new(
                NotificationKind::Ingest,
                format!("Drafted {drafted_count} ticket(s) from {received} feedback record(s)"),
            ))
            .await?;
    }

    info!(
        received,
        skipped_existing, deduplicated, drafted_count, "Ingest run complete"
    );

    Ok(IngestReport {
        received,
        skipped_existing,
        deduplicated,
        drafted: drafted_count,
        draft_ids,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
