//! User financial context provider
//!
//! A read-only aggregation of the user's records, fetched once per pipeline
//! run and passed by reference to context-consuming agents. The pipeline
//! never reads or writes the underlying records directly.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Snapshot of a user's financial records. Not mutated by the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserFinancialContext {
    #[serde(default)]
    pub personal_finances: Value,
    #[serde(default)]
    pub debts: Value,
    #[serde(default)]
    pub assets: Value,
    #[serde(default)]
    pub goals: Value,
    #[serde(default)]
    pub income_streams: Value,
    #[serde(default)]
    pub expense_streams: Value,
    #[serde(default)]
    pub deposits: Value,
    #[serde(default)]
    pub portfolios: Value,
    #[serde(default)]
    pub recent_news: Vec<String>,
}

/// Trait for assembling the per-user snapshot from external records
#[async_trait::async_trait]
pub trait FinancialContextProvider: Send + Sync {
    async fn snapshot(&self, user_id: Uuid) -> Result<UserFinancialContext>;
}

/// In-memory provider for development and tests
pub struct InMemoryContextProvider {
    snapshots: Arc<RwLock<HashMap<Uuid, UserFinancialContext>>>,
}

impl InMemoryContextProvider {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn set(&self, user_id: Uuid, context: UserFinancialContext) {
        let mut snapshots = self.snapshots.write().await;
        snapshots.insert(user_id, context);
    }
}

impl Default for InMemoryContextProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl FinancialContextProvider for InMemoryContextProvider {
    async fn snapshot(&self, user_id: Uuid) -> Result<UserFinancialContext> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots.get(&user_id).cloned().unwrap_or_default())
    }
}
