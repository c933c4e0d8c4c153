//! Chat transcript persistence
//!
//! Pure append: each pipeline run adds the user message and the assistant
//! message, nothing is read-modified-rewritten. A chat comes into existence
//! with its first message; its title is derived from that message.
//!
//! Backend is chosen at startup: Postgres when POSTGRES_URL / DATABASE_URL
//! is set and connectable, in-memory otherwise.

use chrono::Utc;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::{Chat, ChatMessage, MessageRole};
use crate::Result;

const TITLE_MAX_CHARS: usize = 60;

fn derive_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.chars().count() <= TITLE_MAX_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

/// Trait for the append-only transcript boundary
#[async_trait::async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<()>;

    async fn load_chat(&self, chat_id: Uuid) -> Result<Option<Chat>>;
}

//
// ================= In-memory backend =================
//

pub struct InMemoryTranscriptStore {
    chats: Arc<RwLock<HashMap<Uuid, Chat>>>,
}

impl InMemoryTranscriptStore {
    pub fn new() -> Self {
        Self {
            chats: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTranscriptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn append_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<()> {
        let mut chats = self.chats.write().await;

        let chat = chats.entry(chat_id).or_insert_with(|| Chat {
            chat_id,
            user_id,
            title: derive_title(content),
            messages: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });

        chat.messages
            .push(ChatMessage::new(role, content.to_string()));
        chat.updated_at = Utc::now();

        Ok(())
    }

    async fn load_chat(&self, chat_id: Uuid) -> Result<Option<Chat>> {
        let chats = self.chats.read().await;
        Ok(chats.get(&chat_id).cloned())
    }
}

//
// ================= Postgres backend =================
//

pub struct PostgresTranscriptStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresTranscriptStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS chat_messages (
                      message_id UUID PRIMARY KEY,
                      chat_id UUID NOT NULL,
                      user_id UUID NOT NULL,
                      role TEXT NOT NULL,
                      content TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_chat_messages_chat_time
                    ON chat_messages (chat_id, created_at);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| {
                PipelineError::DatabaseError(format!(
                    "Failed to initialize transcript schema: {}",
                    e
                ))
            })?;

        Ok(())
    }

    fn role_to_db(role: MessageRole) -> &'static str {
        match role {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }

    fn role_from_db(role: &str) -> MessageRole {
        match role.to_lowercase().as_str() {
            "assistant" => MessageRole::Assistant,
            "system" => MessageRole::System,
            _ => MessageRole::User,
        }
    }
}

#[async_trait::async_trait]
impl TranscriptStore for PostgresTranscriptStore {
    async fn append_message(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<()> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (message_id, chat_id, user_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(user_id)
        .bind(Self::role_to_db(role))
        .bind(content)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            PipelineError::DatabaseError(format!("Failed to append chat message: {}", e))
        })?;

        Ok(())
    }

    async fn load_chat(&self, chat_id: Uuid) -> Result<Option<Chat>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT user_id, role, content, created_at
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PipelineError::DatabaseError(format!("Failed to load chat: {}", e)))?;

        if rows.is_empty() {
            return Ok(None);
        }

        let user_id: Uuid = rows[0].try_get("user_id").unwrap_or_else(|_| Uuid::nil());
        let mut messages = Vec::with_capacity(rows.len());

        for row in &rows {
            let db_role: String = row.try_get("role").unwrap_or_else(|_| "user".to_string());
            messages.push(ChatMessage {
                role: Self::role_from_db(&db_role),
                content: row.try_get("content").unwrap_or_default(),
                timestamp: row.try_get("created_at").unwrap_or_else(|_| Utc::now()),
            });
        }

        let title = derive_title(&messages[0].content);
        let created_at = messages[0].timestamp;
        let updated_at = messages.last().map(|m| m.timestamp).unwrap_or(created_at);

        Ok(Some(Chat {
            chat_id,
            user_id,
            title,
            messages,
            created_at,
            updated_at,
        }))
    }
}

/// Pick the transcript backend from the environment.
pub fn build_transcript_store() -> Arc<dyn TranscriptStore> {
    let database_url = env::var("POSTGRES_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .ok();

    if let Some(url) = database_url {
        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&url)
        {
            Ok(pool) => {
                info!("Transcript backend: postgres");
                return Arc::new(PostgresTranscriptStore::new(pool));
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres transcript backend, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Transcript backend: in-memory");
    Arc::new(InMemoryTranscriptStore::new())
}
