

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::models::CandidateSet;
use super::parser::parse_candidates;
use super::prompt::{build_expansion_prompt, SYSTEM_PROMPT};
use crate::core::error::{ExpansionError, Result, Stage};
use crate::index::ScoredChunk;
use crate::llm::providers::base::{LlmMetadata, LlmProvider};


/// Parsed candidates together with what the provider reported about the call.
#[derive(Debug, Clone)]
pub struct Generation {
    pub candidates: CandidateSet,
    pub metadata: LlmMetadata,
}


/// Asks the language model for paraphrases of a seed query.
///
/// One model call per invocation, no caching and no retry: a reply that does
/// not parse is returned as [`ExpansionError::MalformedGeneration`].
pub struct QueryGenerator {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
}

impl QueryGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration) -> Self {
        info!(
            "QueryGenerator initialized: provider={}, model={}, temperature={}",
            llm.provider_name(),
            llm.model_name(),
            llm.temperature()
        );
        Self { llm, timeout }
    }


    pub async fn generate(&self, seed: &str, context: Option<&[ScoredChunk]>) -> Result<CandidateSet> {
        self.generate_with_metadata(seed, context)
            .await
            .map(|generation| generation.candidates)
    }


    pub async fn generate_with_metadata(
        &self,
        seed: &str,
        context: Option<&[ScoredChunk]>,
    ) -> Result<Generation> {
        if seed.trim().is_empty() {
            return Err(ExpansionError::Validation("seed query is empty".to_string()));
        }

        let context = match context {
            Some([]) => {
                warn!("Empty context supplied for '{}', generating without grounding", crate::safe_truncate(seed, 50));
                None
            }
            other => other,
        };

        let prompt = build_expansion_prompt(seed, context);
        debug!(
            "Requesting expansions for '{}' (context_chunks={})",
            crate::safe_truncate(seed, 50),
            context.map_or(0, <[ScoredChunk]>::len)
        );

        let (reply, metadata) = timeout(self.timeout, self.llm.generate(SYSTEM_PROMPT, &prompt, None))
            .await
            .map_err(|_| ExpansionError::timeout(Stage::Generation, self.timeout))??;

        let candidates = parse_candidates(&reply, seed).inspect_err(|e| {
            warn!("Rejected model reply: {}", e);
            warn!("Reply was: {}", crate::safe_truncate(&reply, 200));
        })?;

        debug!("Generated {} expansions: {:?}", candidates.expansions().len(), candidates.expansions());
        Ok(Generation { candidates, metadata })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Chunk;
    use crate::testing::{FailingLlm, ScriptedLlm, SEED};

    const REPLY: &str = r#"["How to catch fish USA", "Fishing techniques in the United States", "Where can I go fishing in the USA?", "Beginner fishing guide America", "Best bait for US lakes"]"#;

    #[tokio::test]
    async fn test_generates_five_candidates_with_seed_first() {
        let llm = Arc::new(ScriptedLlm::constant(REPLY));
        let generator = QueryGenerator::new(llm.clone(), Duration::from_secs(1));

        let candidates = generator.generate(SEED, None).await.unwrap();
        assert_eq!(candidates.len(), 5);
        assert_eq!(candidates.seed(), SEED);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_context_reaches_prompt() {
        let llm = Arc::new(ScriptedLlm::constant(REPLY));
        let generator = QueryGenerator::new(llm.clone(), Duration::from_secs(1));
        let context = vec![ScoredChunk {
            chunk: Chunk::new("Anglers need a license in every state."),
            score: 0.91,
        }];

        generator.generate(SEED, Some(&context)).await.unwrap();
        let prompt = llm.last_prompt().unwrap();
        assert!(prompt.contains("Anglers need a license in every state."));
    }

    #[tokio::test]
    async fn test_malformed_reply_is_an_error() {
        let llm = Arc::new(ScriptedLlm::constant(r#"["How to catch fish USA", "only one"]"#));
        let generator = QueryGenerator::new(llm, Duration::from_secs(1));

        let err = generator.generate(SEED, None).await.unwrap_err();
        assert!(matches!(err, ExpansionError::MalformedGeneration(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_seed_mismatch_is_an_error() {
        let llm = Arc::new(ScriptedLlm::constant(
            r#"["Catch fish in the USA", "a", "b", "c", "d"]"#,
        ));
        let generator = QueryGenerator::new(llm, Duration::from_secs(1));
        let err = generator.generate(SEED, None).await.unwrap_err();
        assert!(matches!(err, ExpansionError::MalformedGeneration(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_is_model_unavailable() {
        let generator = QueryGenerator::new(Arc::new(FailingLlm), Duration::from_secs(1));
        let err = generator.generate(SEED, None).await.unwrap_err();
        assert!(matches!(err, ExpansionError::ModelUnavailable(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let llm = Arc::new(ScriptedLlm::constant(REPLY).with_delay(Duration::from_secs(5)));
        let generator = QueryGenerator::new(llm, Duration::from_millis(20));

        let err = generator.generate(SEED, None).await.unwrap_err();
        assert!(matches!(err, ExpansionError::Timeout { stage: Stage::Generation, .. }));
    }

    #[tokio::test]
    async fn test_empty_seed_never_reaches_model() {
        let llm = Arc::new(ScriptedLlm::constant(REPLY));
        let generator = QueryGenerator::new(llm.clone(), Duration::from_secs(1));

        let err = generator.generate("  ", None).await.unwrap_err();
        assert!(matches!(err, ExpansionError::Validation(_)));
        assert_eq!(llm.calls(), 0);
    }
}
