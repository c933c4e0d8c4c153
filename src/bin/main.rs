use finance_chat_orchestrator::{
    agents::create_default_registry,
    context::InMemoryContextProvider,
    gemini::GeminiClient,
    pipeline::ChatPipeline,
    transcript::InMemoryTranscriptStore,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    dotenv::dotenv().ok();

    info!("Finance Chat Orchestrator starting");

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();

    // Create components
    let generator = Arc::new(GeminiClient::new(gemini_api_key));
    let registry = create_default_registry(generator.clone());
    let transcript = Arc::new(InMemoryTranscriptStore::new());
    let context_provider = Arc::new(InMemoryContextProvider::new());

    let pipeline = ChatPipeline::new(generator, registry, transcript, context_provider);

    // One local run through the full pipeline
    let message = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Should I pay off my credit card debt or invest?".to_string());

    let outcome = pipeline
        .run(Uuid::new_v4(), Uuid::new_v4(), &message)
        .await?;

    info!(
        language = %outcome.metadata.original_language,
        agents = ?outcome.metadata.agents_used,
        "Pipeline complete"
    );

    println!("{}", outcome.response);

    Ok(())
}
