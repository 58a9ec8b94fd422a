//! Review queue — the single authoritative collection of drafted tickets,
//! plus session state (selection). A state machine over each ticket's
//! status: `pending → edited → approved | rejected`, with `pending` also
//! allowed to jump straight to a terminal state.
//!
//! Mutations are serialized behind the repository and a selection mutex;
//! the queue assumes one logical reviewing actor per deployment.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::FeedbackItem;
use crate::models::ticket::{
    CreatedTicket, DraftedTicket, Notification, NotificationKind, TicketCreationResult,
    TicketDraft, TicketStatus,
};
use crate::review::repository::DraftRepository;

pub struct ReviewQueue {
    repo: Arc<dyn DraftRepository>,
    selection: Mutex<HashSet<Uuid>>,
    /// When set, approval without a successful creation result is rejected.
    require_ticket_creation: bool,
}

impl ReviewQueue {
    pub fn new(repo: Arc<dyn DraftRepository>, require_ticket_creation: bool) -> Self {
        ReviewQueue {
            repo,
            selection: Mutex::new(HashSet::new()),
            require_ticket_creation,
        }
    }

    // ── Collection access ───────────────────────────────────────────────

    /// All drafts, most-recent-first.
    pub async fn drafts(&self) -> Result<Vec<DraftedTicket>, AppError> {
        self.repo.get_all().await
    }

    pub async fn get(&self, id: Uuid) -> Result<DraftedTicket, AppError> {
        self.repo
            .get_all()
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Draft {id} not found")))
    }

    /// Feedback items backing the current drafts — the dedup corpus for
    /// the next ingest run.
    pub async fn existing_items(&self) -> Result<Vec<FeedbackItem>, AppError> {
        Ok(self
            .repo
            .get_all()
            .await?
            .into_iter()
            .map(|d| d.feedback_item)
            .collect())
    }

    pub async fn add_drafts(&self, drafts: Vec<DraftedTicket>) -> Result<(), AppError> {
        for draft in &drafts {
            self.repo.upsert(draft).await?;
        }
        Ok(())
    }

    /// Removes every draft and clears the selection. Drafts are otherwise
    /// never deleted — terminal tickets stay visible.
    pub async fn clear(&self) -> Result<(), AppError> {
        self.repo.clear().await?;
        self.selection.lock().await.clear();
        info!("Review queue cleared");
        Ok(())
    }

    // ── Status transitions ──────────────────────────────────────────────

    /// Approves a draft. Proceeds even without a confirmed external ticket
    /// unless `require_ticket_creation` is set; a supplied successful result
    /// is attached as `created_ticket`.
    pub async fn approve(
        &self,
        id: Uuid,
        platform: &str,
        result: Option<&TicketCreationResult>,
    ) -> Result<DraftedTicket, AppError> {
        let mut ticket = self.get(id).await?;
        ensure_actionable(&ticket)?;

        let creation_succeeded = result.map_or(false, |r| r.success);
        if self.require_ticket_creation && !creation_succeeded {
            return Err(AppError::Validation(
                "Approval requires a successful ticket-creation result \
                 (REQUIRE_TICKET_CREATION is enabled)"
                    .to_string(),
            ));
        }

        let now = Utc::now();
        ticket.status = TicketStatus::Approved;
        ticket.reviewed_at = Some(now);
        ticket.updated_at = now;
        if let Some(r) = result.filter(|r| r.success) {
            ticket.created_ticket = Some(CreatedTicket {
                platform: platform.to_string(),
                ticket_id: r.ticket_id.clone().unwrap_or_default(),
                ticket_url: r.ticket_url.clone().unwrap_or_default(),
            });
        }

        self.repo.upsert(&ticket).await?;
        self.selection.lock().await.remove(&id);
        self.repo
            .push_notification(&Notification::new(
                NotificationKind::Approved,
                format!("Approved \"{}\"", ticket.effective_draft().title),
            ))
            .await?;
        Ok(ticket)
    }

    pub async fn reject(
        &self,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<DraftedTicket, AppError> {
        let mut ticket = self.get(id).await?;
        ensure_actionable(&ticket)?;

        let now = Utc::now();
        ticket.status = TicketStatus::Rejected;
        ticket.rejection_reason = reason;
        ticket.reviewed_at = Some(now);
        ticket.updated_at = now;

        self.repo.upsert(&ticket).await?;
        self.selection.lock().await.remove(&id);
        self.repo
            .push_notification(&Notification::new(
                NotificationKind::Rejected,
                format!("Rejected \"{}\"", ticket.effective_draft().title),
            ))
            .await?;
        Ok(ticket)
    }

    /// Stores a human override of the draft text. Does not touch
    /// `reviewed_at` — editing is not a review decision.
    pub async fn edit(&self, id: Uuid, edited: TicketDraft) -> Result<DraftedTicket, AppError> {
        let mut ticket = self.get(id).await?;
        ensure_actionable(&ticket)?;

        ticket.status = TicketStatus::Edited;
        ticket.edited_draft = Some(edited);
        ticket.updated_at = Utc::now();

        self.repo.upsert(&ticket).await?;
        Ok(ticket)
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// Replaces the selection. Every id must reference an existing draft —
    /// the selection is always a subset of the collection.
    pub async fn set_selection(&self, ids: Vec<Uuid>) -> Result<(), AppError> {
        let known: HashSet<Uuid> = self.repo.get_all().await?.iter().map(|d| d.id).collect();
        if let Some(unknown) = ids.iter().find(|id| !known.contains(id)) {
            return Err(AppError::Validation(format!(
                "Selection references unknown draft {unknown}"
            )));
        }
        *self.selection.lock().await = ids.into_iter().collect();
        Ok(())
    }

    pub async fn selected_ids(&self) -> Vec<Uuid> {
        self.selection.lock().await.iter().copied().collect()
    }

    /// Approves every selected draft (no external creation results in bulk
    /// mode). One failing item never aborts its siblings.
    pub async fn bulk_approve(&self, platform: &str) -> Result<usize, AppError> {
        let ids = self.selected_ids().await;
        let mut approved = 0;
        for id in ids {
            match self.approve(id, platform, None).await {
                Ok(_) => approved += 1,
                Err(e) => warn!("Bulk approve skipped {id}: {e}"),
            }
        }
        Ok(approved)
    }

    pub async fn bulk_reject(&self, reason: Option<String>) -> Result<usize, AppError> {
        let ids = self.selected_ids().await;
        let mut rejected = 0;
        for id in ids {
            match self.reject(id, reason.clone()).await {
                Ok(_) => rejected += 1,
                Err(e) => warn!("Bulk reject skipped {id}: {e}"),
            }
        }
        Ok(rejected)
    }

    // ── Notifications ───────────────────────────────────────────────────

    pub async fn push_notification(&self, notification: Notification) -> Result<(), AppError> {
        self.repo.push_notification(&notification).await
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, AppError> {
        self.repo.recent_notifications().await
    }
}

/// Terminal tickets reject further transitions.
fn ensure_actionable(ticket: &DraftedTicket) -> Result<(), AppError> {
    if ticket.is_actionable() {
        Ok(())
    } else {
        Err(AppError::Conflict(format!(
            "Draft {} is already {}",
            ticket.id,
            ticket.status.as_str()
        )))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feedback::{
        Category, ClassificationResult, CustomerSegment, FeedbackSource, Priority, Sentiment,
    };
    use crate::review::repository::InMemoryDraftRepository;

    fn queue(require_creation: bool) -> ReviewQueue {
        ReviewQueue::new(Arc::new(InMemoryDraftRepository::new()), require_creation)
    }

    fn sample_draft(n: u32) -> DraftedTicket {
        let item = FeedbackItem {
            id: format!("reddit-{n}-0"),
            source: FeedbackSource::Reddit,
            source_id: n.to_string(),
            source_url: String::new(),
            title: None,
            content: format!("feedback number {n}"),
            author: "jdoe".to_string(),
            author_handle: None,
            created_at: Utc::now(),
            fetched_at: Utc::now(),
            engagement_score: 0,
            metadata: serde_json::json!({}),
        };
        let classification = ClassificationResult {
            category: Category::Bug,
            confidence: 60,
            priority: Priority::Medium,
            priority_reasons: vec![],
            sentiment: Sentiment::Neutral,
            keywords: vec![],
            customer_segment: CustomerSegment::Unknown,
        };
        DraftedTicket::new(
            item,
            classification,
            TicketDraft {
                title: format!("Fix: feedback number {n}"),
                description: String::new(),
                suggested_labels: vec![],
                suggested_priority: Priority::Medium,
            },
        )
    }

    #[tokio::test]
    async fn test_approve_stamps_and_deselects() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        q.set_selection(vec![id]).await.unwrap();

        let approved = q.approve(id, "linear", None).await.unwrap();
        assert_eq!(approved.status, TicketStatus::Approved);
        assert!(approved.reviewed_at.is_some());
        assert!(q.selected_ids().await.is_empty(), "approved id leaves selection");
    }

    #[tokio::test]
    async fn test_approve_without_result_proceeds_by_default() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        let approved = q.approve(id, "jira", None).await.unwrap();
        assert_eq!(approved.status, TicketStatus::Approved);
        assert!(approved.created_ticket.is_none());
    }

    #[tokio::test]
    async fn test_approve_attaches_created_ticket_on_success() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        let result = TicketCreationResult {
            success: true,
            ticket_id: Some("LIN-42".to_string()),
            ticket_url: Some("https://linear.app/LIN-42".to_string()),
            error: None,
        };
        let approved = q.approve(id, "linear", Some(&result)).await.unwrap();
        let created = approved.created_ticket.unwrap();
        assert_eq!(created.platform, "linear");
        assert_eq!(created.ticket_id, "LIN-42");
    }

    #[tokio::test]
    async fn test_failed_creation_still_approves_but_attaches_nothing() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        let result = TicketCreationResult {
            success: false,
            error: Some("upstream 500".to_string()),
            ..TicketCreationResult::default()
        };
        let approved = q.approve(id, "jira", Some(&result)).await.unwrap();
        assert_eq!(approved.status, TicketStatus::Approved);
        assert!(approved.created_ticket.is_none());
    }

    #[tokio::test]
    async fn test_require_creation_policy_blocks_unconfirmed_approval() {
        let q = queue(true);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        let err = q.approve(id, "linear", None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(q.get(id).await.unwrap().status, TicketStatus::Pending);
    }

    #[tokio::test]
    async fn test_reject_preserves_reason() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        let rejected = q
            .reject(id, Some("duplicate of LIN-7".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.status, TicketStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate of LIN-7"));
    }

    #[tokio::test]
    async fn test_approved_and_rejected_are_mutually_exclusive() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        q.approve(id, "linear", None).await.unwrap();
        let err = q.reject(id, None).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(q.get(id).await.unwrap().status, TicketStatus::Approved);
    }

    #[tokio::test]
    async fn test_edit_sets_status_without_touching_reviewed_at() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        let edited = q
            .edit(
                id,
                TicketDraft {
                    title: "Fix: sharper title".to_string(),
                    description: "body".to_string(),
                    suggested_labels: vec![],
                    suggested_priority: Priority::High,
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.status, TicketStatus::Edited);
        assert!(edited.reviewed_at.is_none());
        assert_eq!(edited.effective_draft().title, "Fix: sharper title");

        // edited → approved is a legal transition
        let approved = q.approve(id, "linear", None).await.unwrap();
        assert_eq!(approved.status, TicketStatus::Approved);
        // Original draft text survives the edit.
        assert_eq!(approved.draft.title, "Fix: feedback number 1");
    }

    #[tokio::test]
    async fn test_selection_must_reference_known_drafts() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        assert!(q.set_selection(vec![id]).await.is_ok());
        let err = q.set_selection(vec![id, Uuid::new_v4()]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_bulk_approve_covers_selection_only() {
        let q = queue(false);
        let a = sample_draft(1);
        let b = sample_draft(2);
        let c = sample_draft(3);
        let (id_a, id_b, id_c) = (a.id, b.id, c.id);
        q.add_drafts(vec![a, b, c]).await.unwrap();
        q.set_selection(vec![id_a, id_b]).await.unwrap();

        let approved = q.bulk_approve("linear").await.unwrap();
        assert_eq!(approved, 2);
        assert_eq!(q.get(id_a).await.unwrap().status, TicketStatus::Approved);
        assert_eq!(q.get(id_b).await.unwrap().status, TicketStatus::Approved);
        assert_eq!(q.get(id_c).await.unwrap().status, TicketStatus::Pending);
        assert!(q.selected_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_reject_isolates_failures() {
        let q = queue(false);
        let a = sample_draft(1);
        let b = sample_draft(2);
        let (id_a, id_b) = (a.id, b.id);
        q.add_drafts(vec![a, b]).await.unwrap();
        q.set_selection(vec![id_a, id_b]).await.unwrap();
        // Make one item terminal behind the selection's back.
        q.approve(id_a, "linear", None).await.unwrap();
        q.set_selection(vec![id_b]).await.unwrap();

        let rejected = q.bulk_reject(Some("not planned".to_string())).await.unwrap();
        assert_eq!(rejected, 1);
        assert_eq!(q.get(id_b).await.unwrap().status, TicketStatus::Rejected);
    }

    #[tokio::test]
    async fn test_clear_empties_drafts_and_selection() {
        let q = queue(false);
        let draft = sample_draft(1);
        let id = draft.id;
        q.add_drafts(vec![draft]).await.unwrap();
        q.set_selection(vec![id]).await.unwrap();
        q.clear().await.unwrap();
        assert!(q.drafts().await.unwrap().is_empty());
        assert!(q.selected_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_transitions_record_notifications() {
        let q = queue(false);
        let a = sample_draft(1);
        let b = sample_draft(2);
        let (id_a, id_b) = (a.id, b.id);
        q.add_drafts(vec![a, b]).await.unwrap();
        q.approve(id_a, "linear", None).await.unwrap();
        q.reject(id_b, None).await.unwrap();
        let log = q.notifications().await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].kind, NotificationKind::Rejected);
        assert_eq!(log[1].kind, NotificationKind::Approved);
    }
}
