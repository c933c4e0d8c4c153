//! Translation stage — unifies the working language and restores the
//! user's language at the end of the pipeline.
//!
//! Policy: mixed Arabic/English input is always unified toward Arabic, not
//! English. Translation is best-effort: every failure falls back to the
//! untranslated text (availability over fidelity).

use std::sync::Arc;
use tracing::{info, warn};

use crate::gemini::{GenerationParams, TextGenerator};
use crate::language;
use crate::models::Language;

/// Output of the normalize stage.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    pub processed_text: String,
    /// Detected language after the mixed→Arabic promotion. This is both the
    /// internal working language and the target for the finalize stage.
    pub original_language: Language,
}

pub struct Translator {
    generator: Arc<dyn TextGenerator>,
}

impl Translator {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn params() -> GenerationParams {
        // Translation wants fidelity, not variety
        GenerationParams::new(2048, 0.2)
    }

    async fn translate(&self, text: &str, source: Language, target: Language) -> String {
        let prompt = format!(
            "Translate the following text from {} to {}. \
             Return only the translated text, nothing else.\n\n{}",
            language_name(source),
            language_name(target),
            text
        );

        match self.generator.generate(&prompt, &Self::params()).await {
            Ok(translated) if !translated.trim().is_empty() => translated.trim().to_string(),
            Ok(_) => {
                warn!("Translation returned empty text, passing original through");
                text.to_string()
            }
            Err(e) => {
                warn!("Translation failed, passing original through: {}", e);
                text.to_string()
            }
        }
    }

    /// Unify the raw user message into a single working language.
    ///
    /// English and pure Arabic pass through unchanged. Mixed input is
    /// translated into Arabic and promoted to Arabic for downstream routing.
    pub async fn normalize(&self, text: &str) -> NormalizedInput {
        let detection = language::detect(text);

        match detection.language {
            Language::En => NormalizedInput {
                processed_text: text.to_string(),
                original_language: Language::En,
            },
            Language::Ar => NormalizedInput {
                processed_text: text.to_string(),
                original_language: Language::Ar,
            },
            Language::Mixed => {
                info!(
                    arabic_ratio = detection.arabic_ratio,
                    "Mixed-language input, unifying toward Arabic"
                );
                let unified = self.translate(text, Language::Mixed, Language::Ar).await;
                NormalizedInput {
                    processed_text: unified,
                    original_language: Language::Ar,
                }
            }
        }
    }

    /// Convert the internal-language answer back to the user's language.
    /// No-op when no language change is required.
    pub async fn finalize(
        &self,
        internal_text: &str,
        target_language: Language,
        detected_language: Language,
    ) -> String {
        match (target_language, detected_language) {
            (Language::Ar, Language::En) => {
                self.translate(internal_text, Language::En, Language::Ar).await
            }
            (Language::En, Language::Ar) => {
                self.translate(internal_text, Language::Ar, Language::En).await
            }
            _ => internal_text.to_string(),
        }
    }
}

fn language_name(language: Language) -> &'static str {
    match language {
        Language::Ar => "Arabic",
        Language::En => "English",
        Language::Mixed => "mixed Arabic and English",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use async_trait::async_trait;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> crate::Result<String> {
            Ok("translated".to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> crate::Result<String> {
            Err(PipelineError::LlmError("unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_english_passes_through() {
        let translator = Translator::new(Arc::new(EchoGenerator));
        let normalized = translator.normalize("should I invest in bonds?").await;
        assert_eq!(normalized.processed_text, "should I invest in bonds?");
        assert_eq!(normalized.original_language, Language::En);
    }

    #[tokio::test]
    async fn test_arabic_passes_through() {
        let translator = Translator::new(Arc::new(EchoGenerator));
        let normalized = translator.normalize("مرحبا").await;
        assert_eq!(normalized.processed_text, "مرحبا");
        assert_eq!(normalized.original_language, Language::Ar);
    }

    #[tokio::test]
    async fn test_mixed_promoted_to_arabic() {
        let translator = Translator::new(Arc::new(EchoGenerator));
        let normalized = translator.normalize("hello مرحبا").await;
        assert_eq!(normalized.original_language, Language::Ar);
        assert_eq!(normalized.processed_text, "translated");
    }

    #[tokio::test]
    async fn test_finalize_identity_when_no_change_needed() {
        let translator = Translator::new(Arc::new(EchoGenerator));
        let out = translator
            .finalize("the answer", Language::En, Language::En)
            .await;
        assert_eq!(out, "the answer");
    }

    #[tokio::test]
    async fn test_finalize_translates_across_languages() {
        let translator = Translator::new(Arc::new(EchoGenerator));
        let out = translator
            .finalize("الجواب", Language::En, Language::Ar)
            .await;
        assert_eq!(out, "translated");
    }

    #[tokio::test]
    async fn test_translation_failure_falls_back_to_original() {
        let translator = Translator::new(Arc::new(FailingGenerator));

        let normalized = translator.normalize("hello مرحبا").await;
        assert_eq!(normalized.processed_text, "hello مرحبا");
        assert_eq!(normalized.original_language, Language::Ar);

        let out = translator
            .finalize("the answer", Language::Ar, Language::En)
            .await;
        assert_eq!(out, "the answer");
    }
}
