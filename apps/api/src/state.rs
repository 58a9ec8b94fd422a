use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::classifier::FeedbackClassifier;
use crate::pipeline::clusterer::FeedbackClusterer;
use crate::pipeline::drafter::TicketDrafter;
use crate::review::store::ReviewQueue;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<ReviewQueue>,
    pub classifier: Arc<FeedbackClassifier>,
    pub clusterer: Arc<FeedbackClusterer>,
    pub drafter: Arc<TicketDrafter>,
    pub config: Config,
}
