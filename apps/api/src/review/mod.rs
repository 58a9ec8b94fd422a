//! Human review of drafted tickets: the queue state machine, its persistence,
//! filtering, derived stats, and the HTTP handlers on top.

pub mod filters;
pub mod handlers;
pub mod repository;
pub mod stats;
pub mod store;
