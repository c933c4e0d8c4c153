//! Response combiner
//!
//! Merges the activated agents' findings into one coherent answer following
//! the router's plan. A single finding bypasses the merge entirely; a failed
//! merge degrades to the plain concatenation of findings.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::gemini::{GenerationParams, TextGenerator};
use crate::models::AgentResult;

pub struct ResponseCombiner {
    generator: Arc<dyn TextGenerator>,
}

impl ResponseCombiner {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn params() -> GenerationParams {
        GenerationParams::new(1536, 0.4)
    }

    /// Combine findings into a single user-facing answer.
    ///
    /// One result: return it verbatim, saving a model round-trip.
    /// Several results: newline-join them without agent labels (the combined
    /// answer should read as one voice, not a labeled report) and ask the
    /// generator to synthesize them per the plan. If that call fails or
    /// returns nothing usable, return the joined findings as-is.
    pub async fn combine(&self, results: &[AgentResult], plan: &str) -> String {
        if results.len() == 1 {
            return results[0].output.clone();
        }

        let joined = results
            .iter()
            .map(|r| r.output.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = format!(
            "Combine the following findings into one coherent answer for the \
             user. Follow this plan: {}\n\
             Do not mention agents, sources, or where each part came from.\n\n\
             Findings:\n{}",
            plan, joined
        );

        debug!(findings = results.len(), "Merging agent findings");

        match self.generator.generate(&prompt, &Self::params()).await {
            Ok(merged) if !merged.trim().is_empty() => merged.trim().to_string(),
            Ok(_) => {
                warn!("Merge returned empty text, falling back to concatenation");
                joined
            }
            Err(e) => {
                warn!("Merge failed, falling back to concatenation: {}", e);
                joined
            }
        }
    }
}
