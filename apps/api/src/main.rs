mod config;
mod db;
mod errors;
mod llm_client;
mod models;
mod pipeline;
mod review;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::{create_pool, init_schema};
use crate::llm_client::LlmClient;
use crate::pipeline::classifier::FeedbackClassifier;
use crate::pipeline::clusterer::FeedbackClusterer;
use crate::pipeline::drafter::TicketDrafter;
use crate::review::repository::PgDraftRepository;
use crate::review::store::ReviewQueue;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting feedback triage API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    init_schema(&db).await?;

    // Optional LLM client; without a key every stage runs its deterministic path
    let llm = config.anthropic_api_key.clone().map(LlmClient::new);
    match &llm {
        Some(_) => info!("LLM client initialized (model: {})", llm_client::MODEL),
        None => info!("No ANTHROPIC_API_KEY set, running in heuristic-only mode"),
    }

    let classifier = Arc::new(FeedbackClassifier::new(
        llm.clone(),
        config.company_context.clone(),
    ));
    let clusterer = Arc::new(FeedbackClusterer::new(llm.clone()));
    let drafter = Arc::new(TicketDrafter::new(llm));

    let queue = Arc::new(ReviewQueue::new(
        Arc::new(PgDraftRepository::new(db)),
        config.require_ticket_creation,
    ));

    let state = AppState {
        queue,
        classifier,
        clusterer,
        drafter,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
