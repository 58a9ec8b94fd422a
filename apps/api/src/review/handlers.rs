use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ticket::{DraftedTicket, Notification, TicketCreationResult, TicketDraft};
use crate::review::filters::{apply_filters, DraftFilters};
use crate::review::stats::{compute_stats, pending_count, urgent_count, ReviewStats};
use crate::state::AppState;

#[derive(Serialize)]
pub struct DraftListResponse {
    pub drafts: Vec<DraftedTicket>,
    /// Size of the whole queue, ignoring filters.
    pub total: usize,
    pub pending: usize,
    pub urgent: usize,
}

/// GET /api/v1/review/drafts
pub async fn handle_list_drafts(
    State(state): State<AppState>,
    Query(filters): Query<DraftFilters>,
) -> Result<Json<DraftListResponse>, AppError> {
    let all = state.queue.drafts().await?;
    let filtered = apply_filters(&all, &filters);
    Ok(Json(DraftListResponse {
        total: all.len(),
        pending: pending_count(&all),
        urgent: urgent_count(&all),
        drafts: filtered,
    }))
}

/// GET /api/v1/review/stats
pub async fn handle_stats(
    State(state): State<AppState>,
) -> Result<Json<ReviewStats>, AppError> {
    let all = state.queue.drafts().await?;
    Ok(Json(compute_stats(&all)))
}

/// GET /api/v1/review/notifications
pub async fn handle_notifications(
    State(state): State<AppState>,
) -> Result<Json<Vec<Notification>>, AppError> {
    Ok(Json(state.queue.notifications().await?))
}

#[derive(Deserialize)]
pub struct ApproveRequest {
    /// Tracker the ticket was (or would be) created on.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Outcome of external ticket creation, when the caller attempted one.
    pub ticket_result: Option<TicketCreationResult>,
}

fn default_platform() -> String {
    "linear".to_string()
}

/// POST /api/v1/review/drafts/:id/approve
pub async fn handle_approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ApproveRequest>,
) -> Result<Json<DraftedTicket>, AppError> {
    let ticket = state
        .queue
        .approve(id, &req.platform, req.ticket_result.as_ref())
        .await?;
    Ok(Json(ticket))
}

#[derive(Deserialize, Default)]
pub struct RejectRequest {
    pub reason: Option<String>,
}

/// POST /api/v1/review/drafts/:id/reject
pub async fn handle_reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<DraftedTicket>, AppError> {
    let ticket = state.queue.reject(id, req.reason).await?;
    Ok(Json(ticket))
}

/// PATCH /api/v1/review/drafts/:id
pub async fn handle_edit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(edited): Json<TicketDraft>,
) -> Result<Json<DraftedTicket>, AppError> {
    let ticket = state.queue.edit(id, edited).await?;
    Ok(Json(ticket))
}

#[derive(Deserialize)]
pub struct SelectionRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Serialize)]
pub struct SelectionResponse {
    pub selected: usize,
}

/// PUT /api/v1/review/selection
pub async fn handle_set_selection(
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<SelectionResponse>, AppError> {
    let selected = req.ids.len();
    state.queue.set_selection(req.ids).await?;
    Ok(Json(SelectionResponse { selected }))
}

#[derive(Serialize)]
pub struct BulkResponse {
    pub processed: usize,
}

#[derive(Deserialize)]
pub struct BulkApproveRequest {
    #[serde(default = "default_platform")]
    pub platform: String,
}

/// POST /api/v1/review/selection/approve
pub async fn handle_bulk_approve(
    State(state): State<AppState>,
    Json(req): Json<BulkApproveRequest>,
) -> Result<Json<BulkResponse>, AppError> {
    let processed = state.queue.bulk_approve(&req.platform).await?;
    Ok(Json(BulkResponse { processed }))
}

/// POST /api/v1/review/selection/reject
pub async fn handle_bulk_reject(
    State(state): State<AppState>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<BulkResponse>, AppError> {
    let processed = state.queue.bulk_reject(req.reason).await?;
    Ok(Json(BulkResponse { processed }))
}

/// DELETE /api/v1/review/drafts
pub async fn handle_clear(State(state): State<AppState>) -> Result<Json<ReviewStats>, AppError> {
    state.queue.clear().await?;
    Ok(Json(compute_stats(&[])))
}
