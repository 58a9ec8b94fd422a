use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::feedback::RawRecord;
use crate::pipeline::clusterer::{ClassifiedItem, ClusteredFeedback};
use crate::pipeline::ingest::{run_ingest, IngestReport};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct IngestRequest {
    pub records: Vec<RawRecord>,
}

/// POST /api/v1/feedback/ingest
pub async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestReport>, AppError> {
    let report = run_ingest(req.records, &state.classifier, &state.drafter, &state.queue).await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub struct ClusterResponse {
    pub cluster_count: usize,
    pub clusters: Vec<ClusteredFeedback>,
}

/// POST /api/v1/feedback/cluster
///
/// Clusters the actionable drafts currently in the review queue. Terminal
/// drafts are already decided and stay out of the grouping.
pub async fn handle_cluster(
    State(state): State<AppState>,
) -> Result<Json<ClusterResponse>, AppError> {
    let pairs: Vec<ClassifiedItem> = state
        .queue
        .drafts()
        .await?
        .into_iter()
        .filter(|d| d.is_actionable())
        .map(|d| ClassifiedItem {
            item: d.feedback_item,
            classification: d.classification,
        })
        .collect();

    let clusters = state.clusterer.cluster(pairs).await;
    Ok(Json(ClusterResponse {
        cluster_count: clusters.len(),
        clusters,
    }))
}
