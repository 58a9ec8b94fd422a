use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a status object with the service version and pipeline mode.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let pipeline_mode = if state.config.anthropic_api_key.is_some() {
        "llm"
    } else {
        "heuristic-only"
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "feedback-triage-api",
        "pipeline_mode": pipeline_mode
    }))
}
