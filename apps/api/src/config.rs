use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// `ANTHROPIC_API_KEY` is optional on purpose: without it the pipeline runs
/// in heuristic-only mode (deterministic classification, template drafting,
/// keyword clustering) rather than refusing to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: Option<String>,
    /// Free-text company description injected into classification prompts.
    pub company_context: Option<String>,
    /// When true, `approve` without a successful ticket-creation result is a
    /// validation error instead of proceeding opportunistically.
    pub require_ticket_creation: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            company_context: optional_env("COMPANY_CONTEXT"),
            require_ticket_creation: std::env::var("REQUIRE_TICKET_CREATION")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
