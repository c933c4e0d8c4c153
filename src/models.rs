//! Core data models for the chat orchestration pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Language =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ar,
    En,
    Mixed,
}

/// Result of character-class language detection.
/// Derived per request, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DetectionResult {
    pub language: Language,
    pub arabic_ratio: f64,
}

//
// ================= Capabilities =================
//

/// Closed set of capability agents the router can activate.
/// Adding a capability = adding a variant plus a registry entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTag {
    Finance,
    Portfolio,
    DataAnalyst,
    Scam,
    Summarizer,
    Creative,
}

impl CapabilityTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityTag::Finance => "finance",
            CapabilityTag::Portfolio => "portfolio",
            CapabilityTag::DataAnalyst => "data_analyst",
            CapabilityTag::Scam => "scam",
            CapabilityTag::Summarizer => "summarizer",
            CapabilityTag::Creative => "creative",
        }
    }

    /// Agents whose prompts are enriched with the user's financial snapshot.
    pub fn needs_context(&self) -> bool {
        matches!(
            self,
            CapabilityTag::Finance
                | CapabilityTag::Portfolio
                | CapabilityTag::DataAnalyst
                | CapabilityTag::Summarizer
        )
    }
}

impl fmt::Display for CapabilityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

//
// ================= Routing =================
//

/// Output of the intent classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Ordered, deduplicated, never empty.
    pub intents: Vec<CapabilityTag>,
    /// Natural-language merge instruction for the combiner.
    pub plan: String,
    /// Advisory only: set when more than 3 capabilities matched.
    /// The coordinator does not gate dispatch on it.
    pub needs_clarification: bool,
}

//
// ================= Agent Results =================
//

/// One finding per activated agent. Ephemeral, exists only
/// within a single pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: CapabilityTag,
    pub output: String,
    pub error: bool,
}

impl AgentResult {
    pub fn ok(agent: CapabilityTag, output: String) -> Self {
        Self {
            agent,
            output,
            error: false,
        }
    }

    pub fn failed(agent: CapabilityTag, fallback: String) -> Self {
        Self {
            agent,
            output: fallback,
            error: true,
        }
    }
}

//
// ================= Chat Transcript =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

/// Immutable once created, append-only within a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: String) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub original_language: Language,
    pub agents_used: Vec<CapabilityTag>,
    pub plan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub response: String,
    pub metadata: ResponseMetadata,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Language::Ar => "ar",
            Language::En => "en",
            Language::Mixed => "mixed",
        };
        write!(f, "{}", s)
    }
}
