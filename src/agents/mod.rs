//! Capability agents and their registry
//!
//! Each agent is a stateless, single-purpose responder: a domain instruction
//! prefix, an optional serialized slice of the user's financial context, and
//! the user's query, sent through the shared text-generation capability.
//!
//! Agents never raise to the caller. Every failure mode is caught here and
//! converted into a fixed fallback string with the `error` flag set, so the
//! fan-out dispatcher always receives one result per activated capability.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::context::UserFinancialContext;
use crate::gemini::{GenerationParams, TextGenerator};
use crate::models::{AgentResult, CapabilityTag};
use crate::router;

/// Trait for a single capability agent
#[async_trait::async_trait]
pub trait CapabilityAgent: Send + Sync {
    fn tag(&self) -> CapabilityTag;

    /// Infallible by contract: failures become fallback results.
    async fn respond(&self, query: &str, context: Option<&UserFinancialContext>) -> AgentResult;
}

/// Registry for looking up agents by capability tag
pub struct AgentRegistry {
    agents: HashMap<CapabilityTag, Arc<dyn CapabilityAgent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    pub fn register(&mut self, agent: Arc<dyn CapabilityAgent>) {
        self.agents.insert(agent.tag(), agent);
    }

    pub fn get(&self, tag: CapabilityTag) -> Option<Arc<dyn CapabilityAgent>> {
        self.agents.get(&tag).cloned()
    }

    pub fn tags(&self) -> Vec<CapabilityTag> {
        self.agents.keys().copied().collect()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializer for the context slice an agent is allowed to see
type ContextSlice = fn(&UserFinancialContext) -> Option<String>;

fn finance_slice(ctx: &UserFinancialContext) -> Option<String> {
    serde_json::to_string(&serde_json::json!({
        "personal_finances": ctx.personal_finances,
        "debts": ctx.debts,
    }))
    .ok()
}

fn portfolio_slice(ctx: &UserFinancialContext) -> Option<String> {
    serde_json::to_string(&serde_json::json!({
        "assets": ctx.assets,
        "goals": ctx.goals,
        "portfolios": ctx.portfolios,
    }))
    .ok()
}

fn analyst_slice(ctx: &UserFinancialContext) -> Option<String> {
    serde_json::to_string(&serde_json::json!({
        "income_streams": ctx.income_streams,
        "expense_streams": ctx.expense_streams,
        "debts": ctx.debts,
    }))
    .ok()
}

fn news_slice(ctx: &UserFinancialContext) -> Option<String> {
    if ctx.recent_news.is_empty() {
        return None;
    }
    Some(ctx.recent_news.join("\n- "))
}

fn no_slice(_ctx: &UserFinancialContext) -> Option<String> {
    None
}

/// Generic finding-producing agent: one instruction prefix, one context
/// slice, one generation call.
pub struct DomainAgent {
    tag: CapabilityTag,
    instruction: &'static str,
    fallback: &'static str,
    params: GenerationParams,
    context_slice: ContextSlice,
    generator: Arc<dyn TextGenerator>,
}

impl DomainAgent {
    pub fn new(
        tag: CapabilityTag,
        instruction: &'static str,
        fallback: &'static str,
        params: GenerationParams,
        context_slice: ContextSlice,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            tag,
            instruction,
            fallback,
            params,
            context_slice,
            generator,
        }
    }

    fn build_prompt(&self, query: &str, context: Option<&UserFinancialContext>) -> String {
        let mut prompt = String::from(self.instruction);

        if let Some(slice) = context.and_then(|ctx| (self.context_slice)(ctx)) {
            prompt.push_str("\n\nUser financial context:\n");
            prompt.push_str(&slice);
        }

        prompt.push_str("\n\nUser query: ");
        prompt.push_str(query);
        prompt
    }
}

#[async_trait::async_trait]
impl CapabilityAgent for DomainAgent {
    fn tag(&self) -> CapabilityTag {
        self.tag
    }

    async fn respond(&self, query: &str, context: Option<&UserFinancialContext>) -> AgentResult {
        let prompt = self.build_prompt(query, context);

        debug!(agent = %self.tag, "Dispatching agent call");

        match self.generator.generate(&prompt, &self.params).await {
            Ok(output) if !output.trim().is_empty() => {
                AgentResult::ok(self.tag, output.trim().to_string())
            }
            Ok(_) => {
                warn!(agent = %self.tag, "Agent returned empty output");
                AgentResult::failed(self.tag, self.fallback.to_string())
            }
            Err(e) => {
                warn!(agent = %self.tag, error = %e, "Agent call failed");
                AgentResult::failed(self.tag, self.fallback.to_string())
            }
        }
    }
}

/// Creative agent: the catch-all conversational responder.
///
/// Bare greetings get a canned reply without a model round-trip, purely for
/// latency and cost.
pub struct CreativeAgent {
    inner: DomainAgent,
}

const GREETING_REPLY_EN: &str = "Hello! How can I help you with your finances today?";
const GREETING_REPLY_AR: &str = "مرحبا! كيف يمكنني مساعدتك في أمورك المالية اليوم؟";

impl CreativeAgent {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            inner: DomainAgent::new(
                CapabilityTag::Creative,
                "You are a friendly personal-finance companion. Answer the user \
                 conversationally. If the question is not about finance, still be \
                 helpful and concise.",
                "I could not come up with an answer right now. Please try again.",
                GenerationParams::new(1024, 0.9),
                no_slice,
                generator,
            ),
        }
    }
}

#[async_trait::async_trait]
impl CapabilityAgent for CreativeAgent {
    fn tag(&self) -> CapabilityTag {
        CapabilityTag::Creative
    }

    async fn respond(&self, query: &str, context: Option<&UserFinancialContext>) -> AgentResult {
        if router::is_greeting(query) {
            let reply = if query.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c)) {
                GREETING_REPLY_AR
            } else {
                GREETING_REPLY_EN
            };
            return AgentResult::ok(CapabilityTag::Creative, reply.to_string());
        }

        self.inner.respond(query, context).await
    }
}

/// Create the default registry covering every capability variant.
pub fn create_default_registry(generator: Arc<dyn TextGenerator>) -> AgentRegistry {
    let mut registry = AgentRegistry::new();

    registry.register(Arc::new(DomainAgent::new(
        CapabilityTag::Finance,
        "You are a personal-finance advisor. Give practical guidance on \
         budgeting, debt, saving, and day-to-day money decisions. Keep the \
         finding short and actionable.",
        "The finance assistant is temporarily unavailable. Please try again shortly.",
        GenerationParams::new(1024, 0.4),
        finance_slice,
        generator.clone(),
    )));

    registry.register(Arc::new(DomainAgent::new(
        CapabilityTag::Portfolio,
        "You are an investment and portfolio advisor. Assess allocations, \
         diversification, and how investments line up with the user's goals. \
         Keep the finding short and concrete.",
        "The portfolio assistant is temporarily unavailable. Please try again shortly.",
        GenerationParams::new(1024, 0.4),
        portfolio_slice,
        generator.clone(),
    )));

    registry.register(Arc::new(DomainAgent::new(
        CapabilityTag::DataAnalyst,
        "You are a financial data analyst. Work from the numbers provided: \
         trends in income, expenses, and debt. Report figures, not opinions.",
        "The data analyst is temporarily unavailable. Please try again shortly.",
        GenerationParams::new(1024, 0.3),
        analyst_slice,
        generator.clone(),
    )));

    // Classification-style task: keep the output deterministic
    registry.register(Arc::new(DomainAgent::new(
        CapabilityTag::Scam,
        "You are a scam and fraud detector for financial offers and messages. \
         Give a clear verdict (likely scam / likely legitimate / unclear) with \
         one or two reasons.",
        "The scam detector is temporarily unavailable. Please try again shortly.",
        GenerationParams::new(512, 0.1),
        no_slice,
        generator.clone(),
    )));

    registry.register(Arc::new(DomainAgent::new(
        CapabilityTag::Summarizer,
        "You summarize recent financial news for the user. Produce a short, \
         neutral digest of the items provided.",
        "The summarizer is temporarily unavailable. Please try again shortly.",
        GenerationParams::new(768, 0.3),
        news_slice,
        generator.clone(),
    )));

    registry.register(Arc::new(CreativeAgent::new(generator)));

    registry
}
