//! parlay-core - request routing and fan-out
//!
//! This crate provides:
//! - The provider capability trait and its Gemini / Azure OpenAI adapters
//! - A fail-closed registry mapping provider tags to capabilities
//! - The chat orchestrator: validate, route, reply, then persist the
//!   interaction and its audit event on detached background tasks

pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod types;

// Re-export main types for convenience
pub use error::ChatError;
pub use orchestrator::{ChatOrchestrator, OrchestratorConfig};
pub use providers::{Provider, ProviderGateway, ProviderKind, Reply};
pub use types::{ChatRequest, ChatResponse};
