

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::config::PipelineSettings;
use super::generator::{Generation, QueryGenerator};
use super::models::{ExpansionMode, ExpansionReport, PipelineState, ScoreTable};
use super::ranking::RankingAssembler;
use super::scorer::RelevanceScorer;
use crate::core::error::{Result, Stage};
use crate::index::{CorpusIndex, ScoredChunk};
use crate::llm::providers::base::LlmProvider;


/// Expand a seed query and rank the expansions by retrieval relevance.
///
/// The model client and the index are injected and shared; the pipeline holds
/// no per-call state, so one instance can serve any number of runs in either
/// mode.
pub struct QueryExpansionPipeline {
    generator: QueryGenerator,
    scorer: RelevanceScorer,
    ranking: RankingAssembler,
    settings: PipelineSettings,
}

impl QueryExpansionPipeline {
    pub fn new(llm: Arc<dyn LlmProvider>, index: Arc<dyn CorpusIndex>, settings: PipelineSettings) -> Self {
        info!(
            "QueryExpansionPipeline initialized: index={}, score_k={}, context_k={}, concurrent={}",
            index.name(),
            settings.score_k,
            settings.context_k,
            settings.concurrent_scoring
        );

        Self {
            generator: QueryGenerator::new(llm, settings.generation_timeout),
            scorer: RelevanceScorer::new(index, settings.index_timeout),
            ranking: RankingAssembler::new(settings.concurrent_scoring),
            settings,
        }
    }


    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }


    pub async fn expand_and_rank(&self, seed: &str, mode: ExpansionMode) -> Result<ScoreTable> {
        self.run(seed, mode).await.map(|report| report.table)
    }


    /// Run one expansion. Surrounding whitespace is stripped from `seed` before
    /// retrieval, generation and scoring, and the report carries the stripped form.
    pub async fn run(&self, seed: &str, mode: ExpansionMode) -> Result<ExpansionReport> {
        let seed = seed.trim();
        let run_id = Uuid::new_v4();
        let span = info_span!("expansion", %run_id, %mode);

        async {
            let started_at = Utc::now();
            info!(state = %PipelineState::Pending, "Expanding '{}'", crate::safe_truncate(seed, 80));

            match self.execute(seed, mode).await {
                Ok((context, generation, table)) => {
                    info!(
                        state = %PipelineState::Complete,
                        "Ranked {} queries, top={:?}",
                        table.len(),
                        table.top().map(|e| (&e.query, e.score))
                    );
                    Ok(ExpansionReport {
                        run_id,
                        mode,
                        state: PipelineState::Complete,
                        seed: seed.to_string(),
                        candidates: generation.candidates,
                        context,
                        table,
                        llm: generation.metadata,
                        started_at,
                        finished_at: Utc::now(),
                    })
                }
                Err(e) => {
                    warn!(state = %PipelineState::Failed, kind = e.kind(), "Expansion failed: {}", e);
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }


    async fn execute(
        &self,
        seed: &str,
        mode: ExpansionMode,
    ) -> Result<(Vec<ScoredChunk>, Generation, ScoreTable)> {
        let context = match mode {
            ExpansionMode::Plain => Vec::new(),
            ExpansionMode::ContextGrounded => {
                let chunks = self
                    .scorer
                    .search(seed, self.settings.context_k, Stage::ContextRetrieval)
                    .await?;
                info!("Retrieved {} context chunks", chunks.len());
                chunks
            }
        };

        let grounding = match mode {
            ExpansionMode::Plain => None,
            ExpansionMode::ContextGrounded => Some(context.as_slice()),
        };
        let generation = self.generator.generate_with_metadata(seed, grounding).await?;

        let table = self
            .ranking
            .rank(&generation.candidates, &self.scorer, self.settings.score_k)
            .await?;

        Ok((context, generation, table))
    }
}
