//! REST API server for the chat orchestration pipeline
//!
//! Exposes the inbound trigger over HTTP and owns the pipeline's single
//! outer failure boundary: any hard error becomes a generic apologetic
//! reply with a non-2xx status.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::models::ResponseMetadata;
use crate::pipeline::ChatPipeline;

const GENERIC_ERROR_REPLY: &str =
    "Sorry, something went wrong while processing your message. Please try again.";

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(alias = "userId")]
    pub user_id: Option<String>,
    #[serde(alias = "chatId")]
    pub chat_id: Option<String>,
    #[serde(default, alias = "conversationHistory")]
    pub conversation_history: Vec<HistoryEntry>,
}

/// =============================
/// Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub metadata: ResponseMetadata,
    pub chat_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub response: String,
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub pipeline: Arc<ChatPipeline>,
}

/// =============================
/// Helpers — String → UUID Parsing
/// =============================

fn stable_uuid_from_string(input: &str) -> uuid::Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    uuid::Uuid::from_bytes(bytes)
}

fn parse_or_stable_uuid(value: Option<&str>, fallback_seed: &str) -> uuid::Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            uuid::Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => stable_uuid_from_string(fallback_seed),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

pub async fn chat_handler(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    // Conversational memory is keyed by (user_id, chat_id); only the current
    // turn travels through the pipeline. When the client sends a bare
    // transcript instead of a message, take its last user turn.
    let message = if !req.message.trim().is_empty() {
        req.message.clone()
    } else {
        req.conversation_history
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default()
    };

    let user_id = parse_or_stable_uuid(req.user_id.as_deref(), "anonymous-user");
    // A missing chat id means a fresh chat, not a stable fallback bucket
    let chat_id = match req.chat_id.as_deref() {
        Some(v) if !v.trim().is_empty() => parse_or_stable_uuid(Some(v), "chat-fallback"),
        _ => uuid::Uuid::new_v4(),
    };

    info!(%chat_id, %user_id, "Received chat request");

    match state.pipeline.run(chat_id, user_id, &message).await {
        Ok(outcome) => Ok(Json(ChatResponse {
            response: outcome.response,
            metadata: outcome.metadata,
            chat_id: chat_id.to_string(),
        })),
        Err(e) => {
            error!(%chat_id, "Pipeline run failed: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                    response: GENERIC_ERROR_REPLY.to_string(),
                }),
            ))
        }
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(pipeline: Arc<ChatPipeline>) -> Router {
    let state = ApiState { pipeline };

    Router::new()
        .route("/health", axum::routing::get(health))
        .route("/api/chat", post(chat_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    pipeline: Arc<ChatPipeline>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(pipeline);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::create_default_registry;
    use crate::context::InMemoryContextProvider;
    use crate::gemini::{GenerationParams, TextGenerator};
    use crate::transcript::InMemoryTranscriptStore;
    use async_trait::async_trait;

    struct StaticGenerator;

    #[async_trait]
    impl TextGenerator for StaticGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> crate::Result<String> {
            Ok("a reply".to_string())
        }
    }

    fn test_state() -> ApiState {
        let generator = Arc::new(StaticGenerator);
        let registry = create_default_registry(generator.clone());
        let pipeline = Arc::new(ChatPipeline::new(
            generator,
            registry,
            Arc::new(InMemoryTranscriptStore::new()),
            Arc::new(InMemoryContextProvider::new()),
        ));
        ApiState { pipeline }
    }

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = stable_uuid_from_string("user-42");
        let b = stable_uuid_from_string("user-42");
        let c = stable_uuid_from_string("user-43");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_parse_or_stable_uuid_accepts_real_uuids() {
        let id = uuid::Uuid::new_v4();
        let parsed = parse_or_stable_uuid(Some(&id.to_string()), "fallback");
        assert_eq!(parsed, id);
    }

    #[tokio::test]
    async fn test_chat_handler_success() {
        let req = ChatRequest {
            message: "how should I budget my salary?".to_string(),
            user_id: Some("web-user-1".to_string()),
            chat_id: None,
            conversation_history: vec![],
        };

        let result = chat_handler(State(test_state()), Json(req)).await;
        let Json(response) = result.expect("handler should succeed");
        assert_eq!(response.response, "a reply");
        assert!(!response.metadata.agents_used.is_empty());
        assert!(!response.chat_id.is_empty());
    }

    #[tokio::test]
    async fn test_chat_handler_falls_back_to_history() {
        let req = ChatRequest {
            message: String::new(),
            user_id: None,
            chat_id: None,
            conversation_history: vec![
                HistoryEntry {
                    role: "assistant".to_string(),
                    content: "hello".to_string(),
                },
                HistoryEntry {
                    role: "user".to_string(),
                    content: "what is a bond?".to_string(),
                },
            ],
        };

        let result = chat_handler(State(test_state()), Json(req)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_chat_handler_rejects_empty_request() {
        let req = ChatRequest {
            message: String::new(),
            user_id: None,
            chat_id: None,
            conversation_history: vec![],
        };

        let result = chat_handler(State(test_state()), Json(req)).await;
        let (status, Json(body)) = result.expect_err("handler should fail");
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.response, GENERIC_ERROR_REPLY);
        assert!(!body.error.is_empty());
    }
}
