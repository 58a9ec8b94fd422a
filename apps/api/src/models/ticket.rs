//! Drafted-ticket model — the unit the review queue stores and transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::feedback::{ClassificationResult, FeedbackItem, Priority};

/// Ticket text produced by the drafter (LLM or template path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    pub suggested_labels: Vec<String>,
    pub suggested_priority: Priority,
}

/// Review state machine. `pending → edited → approved | rejected`;
/// `pending` may also go straight to a terminal state. No way back out of
/// `approved`/`rejected`, and no way back from `edited` to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Pending,
    Edited,
    Approved,
    Rejected,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Edited => "edited",
            TicketStatus::Approved => "approved",
            TicketStatus::Rejected => "rejected",
        }
    }
}

/// Reference to a ticket created on an external tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedTicket {
    pub platform: String,
    pub ticket_id: String,
    pub ticket_url: String,
}

/// Result contract of the external ticket-creation collaborator
/// (Linear/Jira/GitHub/Notion). The queue consumes it opportunistically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketCreationResult {
    pub success: bool,
    pub ticket_id: Option<String>,
    pub ticket_url: Option<String>,
    pub error: Option<String>,
}

/// A ticket awaiting human review. Mutated in place through status
/// transitions; deleted only by explicit queue-clear.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftedTicket {
    pub id: Uuid,
    pub feedback_item: FeedbackItem,
    pub classification: ClassificationResult,
    /// The original AI/heuristic output — kept even after edits.
    pub draft: TicketDraft,
    /// Human override; takes precedence over `draft` everywhere downstream.
    pub edited_draft: Option<TicketDraft>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation.
    pub updated_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Set only when status is `rejected`.
    pub rejection_reason: Option<String>,
    /// Set only when status is `approved` and external creation succeeded.
    pub created_ticket: Option<CreatedTicket>,
}

impl DraftedTicket {
    pub fn new(
        feedback_item: FeedbackItem,
        classification: ClassificationResult,
        draft: TicketDraft,
    ) -> Self {
        let now = Utc::now();
        DraftedTicket {
            id: Uuid::new_v4(),
            feedback_item,
            classification,
            draft,
            edited_draft: None,
            status: TicketStatus::Pending,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
            rejection_reason: None,
            created_ticket: None,
        }
    }

    /// The draft downstream consumers must use: edited override if present,
    /// else the original.
    pub fn effective_draft(&self) -> &TicketDraft {
        self.edited_draft.as_ref().unwrap_or(&self.draft)
    }

    /// Still awaiting a terminal decision.
    pub fn is_actionable(&self) -> bool {
        matches!(self.status, TicketStatus::Pending | TicketStatus::Edited)
    }
}

/// Kind tag for queue notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Ingest,
    Approved,
    Rejected,
}

/// One entry of the bounded recent-notifications log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Notification {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}
