//! Finance Chat Orchestrator
//!
//! Multi-agent chat pipeline for a personal-finance assistant:
//! - Detects the user's language (Arabic / English / mixed) and unifies it
//! - Routes the message to a set of capability agents via keyword intents
//! - Fans out to the activated agents concurrently and joins all results
//! - Combines the findings into one answer and restores the user's language
//! - Appends the exchange to the chat transcript
//!
//! PIPELINE:
//! INPUT → UNIFY → ROUTE → DISPATCH → COMBINE → FINALIZE → PERSIST

pub mod agents;
pub mod api;
pub mod combiner;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gemini;
pub mod language;
pub mod models;
pub mod pipeline;
pub mod router;
pub mod transcript;
pub mod translator;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use pipeline::ChatPipeline;
