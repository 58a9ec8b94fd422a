//! Draft persistence — a small repository trait so the review queue never
//! sees the storage technology. Backings: PostgreSQL (drafts as JSONB rows)
//! for deployments, in-memory for tests and credential-less local runs.
//!
//! Persisted state is exactly the drafts plus the bounded notifications log;
//! filters and selection are session state and live in the queue.

use std::collections::VecDeque;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ticket::{DraftedTicket, Notification};

/// Most-recent notifications kept. Older entries are dropped.
pub const MAX_NOTIFICATIONS: usize = 50;

/// Storage boundary for the review queue. Implementations return drafts
/// most-recent-first (the queue's prepend convention).
#[async_trait]
pub trait DraftRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<DraftedTicket>, AppError>;
    async fn upsert(&self, ticket: &DraftedTicket) -> Result<(), AppError>;
    async fn remove_by_id(&self, id: Uuid) -> Result<(), AppError>;
    async fn clear(&self) -> Result<(), AppError>;
    async fn push_notification(&self, notification: &Notification) -> Result<(), AppError>;
    async fn recent_notifications(&self) -> Result<Vec<Notification>, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory backing
// ────────────────────────────────────────────────────────────────────────────

/// Volatile repository for tests and heuristic-only local runs.
#[derive(Default)]
pub struct InMemoryDraftRepository {
    drafts: Mutex<Vec<DraftedTicket>>,
    notifications: Mutex<VecDeque<Notification>>,
}

impl InMemoryDraftRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DraftRepository for InMemoryDraftRepository {
    async fn get_all(&self) -> Result<Vec<DraftedTicket>, AppError> {
        Ok(self.drafts.lock().await.clone())
    }

    async fn upsert(&self, ticket: &DraftedTicket) -> Result<(), AppError> {
        let mut drafts = self.drafts.lock().await;
        match drafts.iter_mut().find(|d| d.id == ticket.id) {
            Some(existing) => *existing = ticket.clone(),
            // Prepend: most-recent-first.
            None => drafts.insert(0, ticket.clone()),
        }
        Ok(())
    }

    async fn remove_by_id(&self, id: Uuid) -> Result<(), AppError> {
        self.drafts.lock().await.retain(|d| d.id != id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.drafts.lock().await.clear();
        Ok(())
    }

    async fn push_notification(&self, notification: &Notification) -> Result<(), AppError> {
        let mut log = self.notifications.lock().await;
        log.push_front(notification.clone());
        log.truncate(MAX_NOTIFICATIONS);
        Ok(())
    }

    async fn recent_notifications(&self) -> Result<Vec<Notification>, AppError> {
        Ok(self.notifications.lock().await.iter().cloned().collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PostgreSQL backing
// ────────────────────────────────────────────────────────────────────────────

/// Drafts and notifications as JSONB rows; the full `DraftedTicket` document
/// is the source of truth, with status/created_at duplicated into columns
/// for ordering and ops queries.
pub struct PgDraftRepository {
    pool: PgPool,
}

impl PgDraftRepository {
    pub fn new(pool: PgPool) -> Self {
        PgDraftRepository { pool }
    }
}

#[async_trait]
impl DraftRepository for PgDraftRepository {
    async fn get_all(&self) -> Result<Vec<DraftedTicket>, AppError> {
        let rows = sqlx::query("SELECT data FROM review_drafts ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter()
            .map(|row| {
                let data: serde_json::Value = row.try_get("data")?;
                serde_json::from_value(data).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Corrupt draft row: {e}"))
                })
            })
            .collect()
    }

    async fn upsert(&self, ticket: &DraftedTicket) -> Result<(), AppError> {
        let data = serde_json::to_value(ticket)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize draft: {e}")))?;
        sqlx::query(
            r#"
            INSERT INTO review_drafts (id, status, source_id, data, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
                SET status = EXCLUDED.status,
                    data = EXCLUDED.data,
                    updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(ticket.id)
        .bind(ticket.status.as_str())
        .bind(&ticket.feedback_item.source_id)
        .bind(&data)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_by_id(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM review_drafts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), AppError> {
        sqlx::query("DELETE FROM review_drafts")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn push_notification(&self, notification: &Notification) -> Result<(), AppError> {
        let data = serde_json::to_value(notification).map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize notification: {e}"))
        })?;
        sqlx::query(
            "INSERT INTO review_notifications (id, data, created_at) VALUES ($1, $2, $3)",
        )
        .bind(notification.id)
        .bind(&data)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        // Keep the log bounded.
        sqlx::query(
            r#"
            DELETE FROM review_notifications
            WHERE id NOT IN (
                SELECT id FROM review_notifications ORDER BY created_at DESC LIMIT $1
            )
            "#,
        )
        .bind(MAX_NOTIFICATIONS as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recent_notifications(&self) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query(
            "SELECT data FROM review_notifications ORDER BY created_at DESC LIMIT $1",
        )
        .bind(MAX_NOTIFICATIONS as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|row| {
                let data: serde_json::Value = row.try_get("data")?;
                serde_json::from_value(data).map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Corrupt notification row: {e}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::NotificationKind;

    #[tokio::test]
    async fn test_in_memory_upsert_prepends_new_drafts() {
        use crate::models::feedback::*;
        use crate::models::ticket::TicketDraft;
        use chrono::Utc;

        let repo = InMemoryDraftRepository::new();
        for n in 0..3 {
            let item = FeedbackItem {
                id: format!("reddit-{n}-0"),
                source: FeedbackSource::Reddit,
                source_id: n.to_string(),
                source_url: String::new(),
                title: None,
                content: "text".to_string(),
                author: String::new(),
                author_handle: None,
                created_at: Utc::now(),
                fetched_at: Utc::now(),
                engagement_score: 0,
                metadata: serde_json::json!({}),
            };
            let classification = ClassificationResult {
                category: Category::Other,
                confidence: 60,
                priority: Priority::Medium,
                priority_reasons: vec![],
                sentiment: Sentiment::Neutral,
                keywords: vec![],
                customer_segment: CustomerSegment::Unknown,
            };
            let draft = TicketDraft {
                title: format!("Review: {n}"),
                description: String::new(),
                suggested_labels: vec![],
                suggested_priority: Priority::Medium,
            };
            repo.upsert(&DraftedTicket::new(item, classification, draft))
                .await
                .unwrap();
        }
        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].draft.title, "Review: 2", "newest first");
    }

    #[tokio::test]
    async fn test_in_memory_notifications_bounded() {
        let repo = InMemoryDraftRepository::new();
        for n in 0..(MAX_NOTIFICATIONS + 10) {
            repo.push_notification(&Notification::new(
                NotificationKind::Ingest,
                format!("batch {n}"),
            ))
            .await
            .unwrap();
        }
        let log = repo.recent_notifications().await.unwrap();
        assert_eq!(log.len(), MAX_NOTIFICATIONS);
        assert_eq!(log[0].message, format!("batch {}", MAX_NOTIFICATIONS + 9));
    }
}
