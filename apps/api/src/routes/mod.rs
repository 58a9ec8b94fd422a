pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::pipeline::handlers as pipeline_handlers;
use crate::review::handlers as review_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Feedback pipeline
        .route(
            "/api/v1/feedback/ingest",
            post(pipeline_handlers::handle_ingest),
        )
        .route(
            "/api/v1/feedback/cluster",
            post(pipeline_handlers::handle_cluster),
        )
        // Review queue
        .route(
            "/api/v1/review/drafts",
            get(review_handlers::handle_list_drafts).delete(review_handlers::handle_clear),
        )
        .route("/api/v1/review/stats", get(review_handlers::handle_stats))
        .route(
            "/api/v1/review/notifications",
            get(review_handlers::handle_notifications),
        )
        .route(
            "/api/v1/review/drafts/:id/approve",
            post(review_handlers::handle_approve),
        )
        .route(
            "/api/v1/review/drafts/:id/reject",
            post(review_handlers::handle_reject),
        )
        .route(
            "/api/v1/review/drafts/:id",
            patch(review_handlers::handle_edit),
        )
        .route(
            "/api/v1/review/selection",
            put(review_handlers::handle_set_selection),
        )
        .route(
            "/api/v1/review/selection/approve",
            post(review_handlers::handle_bulk_approve),
        )
        .route(
            "/api/v1/review/selection/reject",
            post(review_handlers::handle_bulk_reject),
        )
        .with_state(state)
}
