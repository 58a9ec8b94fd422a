//! The feedback pipeline: normalize → classify → cluster → draft.
//! All LLM calls go through llm_client; every stage has a deterministic
//! fallback so the pipeline always produces a usable result.

pub mod classifier;
pub mod clusterer;
pub mod drafter;
pub mod handlers;
pub mod ingest;
pub mod normalizer;
pub mod prompts;
pub mod text;

use std::time::Duration;

/// Time limit per pipeline LLM request. Elapsing is treated the same as
/// "LLM unavailable" and triggers the deterministic fallback.
pub const LLM_CALL_TIMEOUT: Duration = Duration::from_secs(30);
