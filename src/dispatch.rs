//! Fan-out dispatcher
//!
//! Issues one concurrent agent call per activated capability and joins on
//! all of them. A slow or failing agent never blocks or poisons the batch:
//! every invocation yields a result value, so the output always has exactly
//! one entry per requested intent, in intent order.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::agents::AgentRegistry;
use crate::context::UserFinancialContext;
use crate::models::{AgentResult, CapabilityTag};

pub struct AgentDispatcher {
    registry: AgentRegistry,
}

impl AgentDispatcher {
    pub fn new(registry: AgentRegistry) -> Self {
        Self { registry }
    }

    /// Scatter-gather over the activated capabilities.
    ///
    /// The user's financial context is attached only for the intents that
    /// declare they consume it. No retries, no timeouts, no cancellation;
    /// the transport and the agents own those concerns.
    pub async fn dispatch(
        &self,
        intents: &[CapabilityTag],
        query: &str,
        context: &UserFinancialContext,
    ) -> Vec<AgentResult> {
        debug!(count = intents.len(), "Fanning out to agents");

        let calls = intents.iter().map(|&tag| {
            let agent = self.registry.get(tag);
            async move {
                match agent {
                    Some(agent) => {
                        let ctx = if tag.needs_context() {
                            Some(context)
                        } else {
                            None
                        };
                        agent.respond(query, ctx).await
                    }
                    None => {
                        // Unreachable with the default registry; kept so a
                        // partial registry still upholds the one-result-per-
                        // intent invariant.
                        warn!(agent = %tag, "No agent registered for capability");
                        AgentResult::failed(
                            tag,
                            format!("The {} assistant is not available.", tag),
                        )
                    }
                }
            }
        });

        // join_all preserves input order regardless of completion order
        join_all(calls).await
    }
}
