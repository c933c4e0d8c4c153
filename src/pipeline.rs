//! Pipeline coordinator
//!
//! The top-level sequencer for one chat turn:
//! normalize → route → dispatch → combine → finalize → persist.
//!
//! No state is revisited and no stage branches back. Agents, the translator,
//! and the combiner swallow their own failures into degraded output; only
//! hard failures (malformed input, persistence down) propagate out of `run`,
//! where the API layer turns them into a single generic error reply.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agents::AgentRegistry;
use crate::combiner::ResponseCombiner;
use crate::context::FinancialContextProvider;
use crate::dispatch::AgentDispatcher;
use crate::error::PipelineError;
use crate::gemini::TextGenerator;
use crate::language;
use crate::models::{MessageRole, PipelineOutcome, ResponseMetadata};
use crate::router;
use crate::transcript::TranscriptStore;
use crate::translator::Translator;
use crate::Result;

pub struct ChatPipeline {
    translator: Translator,
    dispatcher: AgentDispatcher,
    combiner: ResponseCombiner,
    transcript: Arc<dyn TranscriptStore>,
    context_provider: Arc<dyn FinancialContextProvider>,
}

impl ChatPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        registry: AgentRegistry,
        transcript: Arc<dyn TranscriptStore>,
        context_provider: Arc<dyn FinancialContextProvider>,
    ) -> Self {
        Self {
            translator: Translator::new(generator.clone()),
            dispatcher: AgentDispatcher::new(registry),
            combiner: ResponseCombiner::new(generator),
            transcript,
            context_provider,
        }
    }

    /// Run one chat turn through the full pipeline.
    pub async fn run(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
        message: &str,
    ) -> Result<PipelineOutcome> {
        if message.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "Message must not be empty".to_string(),
            ));
        }

        info!(%chat_id, %user_id, "Pipeline: starting run");

        // === LanguageUnify ===
        let normalized = self.translator.normalize(message).await;
        info!(
            language = %normalized.original_language,
            "Pipeline: input normalized"
        );

        // === IntentRoute ===
        let route = router::classify(&normalized.processed_text, normalized.original_language);
        info!(
            intents = ?route.intents,
            needs_clarification = route.needs_clarification,
            "Pipeline: intents classified"
        );
        if route.needs_clarification {
            // Advisory only; the fan-out proceeds regardless
            warn!(count = route.intents.len(), "Broad match, consider clarifying");
        }

        // === Dispatch ===
        // Snapshot is fetched once and shared by reference across the fan-out.
        // A provider failure is not worth aborting the turn over.
        let context = match self.context_provider.snapshot(user_id).await {
            Ok(context) => context,
            Err(e) => {
                warn!("Financial context unavailable, agents run without it: {}", e);
                Default::default()
            }
        };

        let results = self
            .dispatcher
            .dispatch(&route.intents, &normalized.processed_text, &context)
            .await;
        info!(results = results.len(), "Pipeline: agents joined");

        // === CombineOrBypass ===
        let combined = self.combiner.combine(&results, &route.plan).await;

        // === Finalize ===
        // The answer's own detected language decides whether a translation is
        // needed; when the agents already honored the plan's language
        // directive this is a no-op.
        let answer_language = language::detect(&combined).language;
        let response = self
            .translator
            .finalize(&combined, normalized.original_language, answer_language)
            .await;

        // === Persist ===
        self.transcript
            .append_message(chat_id, user_id, MessageRole::User, message)
            .await?;
        self.transcript
            .append_message(chat_id, user_id, MessageRole::Assistant, &response)
            .await?;

        info!(%chat_id, "Pipeline: run complete");

        Ok(PipelineOutcome {
            response,
            metadata: ResponseMetadata {
                original_language: normalized.original_language,
                agents_used: route.intents,
                plan: route.plan,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::create_default_registry;
    use crate::context::InMemoryContextProvider;
    use crate::gemini::GenerationParams;
    use crate::models::{CapabilityTag, Language};
    use crate::transcript::InMemoryTranscriptStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted generator: findings for agent prompts, a synthesized
    /// paragraph for the merge prompt.
    struct ScriptedGenerator {
        calls: AtomicUsize,
    }

    impl ScriptedGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> crate::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if prompt.starts_with("Combine the following findings") {
                Ok("Pay the high-interest card first, then start investing monthly.".to_string())
            } else {
                Ok("a specialist finding".to_string())
            }
        }
    }

    fn build_pipeline(
        generator: Arc<ScriptedGenerator>,
    ) -> (ChatPipeline, Arc<InMemoryTranscriptStore>) {
        let transcript = Arc::new(InMemoryTranscriptStore::new());
        let registry = create_default_registry(generator.clone());
        let pipeline = ChatPipeline::new(
            generator,
            registry,
            transcript.clone(),
            Arc::new(InMemoryContextProvider::new()),
        );
        (pipeline, transcript)
    }

    #[tokio::test]
    async fn test_english_debt_and_invest_scenario() {
        let generator = Arc::new(ScriptedGenerator::new());
        let (pipeline, transcript) = build_pipeline(generator.clone());

        let chat_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        let outcome = pipeline
            .run(
                chat_id,
                user_id,
                "Should I pay off my credit card debt or invest?",
            )
            .await
            .unwrap();

        assert_eq!(outcome.metadata.original_language, Language::En);
        assert!(outcome
            .metadata
            .agents_used
            .contains(&CapabilityTag::Finance));
        assert!(outcome
            .metadata
            .agents_used
            .contains(&CapabilityTag::Portfolio));
        assert!(outcome.metadata.plan.contains("English"));
        assert_eq!(
            outcome.response,
            "Pay the high-interest card first, then start investing monthly."
        );

        // Two agent calls plus one merge call, no translation
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);

        let chat = transcript.load_chat(chat_id).await.unwrap().unwrap();
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, MessageRole::User);
        assert_eq!(chat.messages[1].role, MessageRole::Assistant);
        assert_eq!(chat.messages[1].content, outcome.response);
    }

    #[tokio::test]
    async fn test_arabic_greeting_scenario() {
        let generator = Arc::new(ScriptedGenerator::new());
        let (pipeline, transcript) = build_pipeline(generator.clone());

        let chat_id = Uuid::new_v4();
        let outcome = pipeline
            .run(chat_id, Uuid::new_v4(), "مرحبا")
            .await
            .unwrap();

        assert_eq!(outcome.metadata.original_language, Language::Ar);
        assert_eq!(outcome.metadata.agents_used, vec![CapabilityTag::Creative]);
        // Canned greeting, single-agent bypass, no translation: zero model calls
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert!(!outcome.response.is_empty());

        let chat = transcript.load_chat(chat_id).await.unwrap().unwrap();
        assert_eq!(chat.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_is_a_hard_failure() {
        let generator = Arc::new(ScriptedGenerator::new());
        let (pipeline, transcript) = build_pipeline(generator);

        let chat_id = Uuid::new_v4();
        let result = pipeline.run(chat_id, Uuid::new_v4(), "   ").await;

        assert!(matches!(result, Err(PipelineError::InvalidRequest(_))));
        // Nothing persisted on hard failure
        assert!(transcript.load_chat(chat_id).await.unwrap().is_none());
    }
}
