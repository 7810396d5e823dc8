//! The answer pipeline: embed → retrieve → assemble → prompt → generate.
//!
//! Each call to [`RagPipeline::answer`] is an independent run with its own
//! stage tracker. The pipeline itself holds only shared, thread-safe clients
//! and immutable settings, so one instance serves concurrent requests.
//! Dropping the returned future cancels whatever outbound call is in flight.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use super::retry::{with_timeout, Attempted, RetryPolicy};
use super::stage::PipelineStage;
use crate::core::config::defaults::DEFAULT_CONTEXT_BUDGET;
use crate::core::config::{AppConfig, RagSettings};
use crate::core::errors::{PipelineError, PipelineFailure, ProviderError, ValidationError};
use crate::llm::{EmbeddingProvider, GenerationProvider, OpenAiClient, ResponseGenerator};
use crate::rag::{
    Answer, ContextAssembler, CouchbaseVectorStore, PromptBuilder, RecordFilter, VectorRetriever,
    VectorStore,
};

/// A validated user request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    top_k: usize,
}

impl Query {
    pub fn new(text: impl Into<String>, top_k: usize) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if top_k == 0 {
            return Err(ValidationError::InvalidTopK(top_k));
        }
        Ok(Self { text, top_k })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    fn ensure_max_chars(&self, max: usize) -> Result<(), ValidationError> {
        let len = self.text.chars().count();
        if len > max {
            return Err(ValidationError::QueryTooLong { len, max });
        }
        Ok(())
    }
}

/// Tracks the current and last completed stage of one run.
struct RunTracker {
    stage: PipelineStage,
    last_completed: PipelineStage,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            stage: PipelineStage::Init,
            last_completed: PipelineStage::Init,
        }
    }

    fn advance(&mut self) {
        self.last_completed = self.stage;
        self.stage = self.stage.next();
        tracing::debug!("{} -> {}", self.last_completed, self.stage);
    }

    fn fail(&self, error: PipelineError) -> PipelineFailure {
        tracing::error!("Pipeline failed in {}: {}", self.stage, error);
        PipelineFailure {
            error,
            failed_stage: self.stage,
            last_completed: self.last_completed,
        }
    }
}

#[derive(Clone)]
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    retriever: VectorRetriever,
    assembler: ContextAssembler,
    prompts: PromptBuilder,
    generator: ResponseGenerator,
    settings: RagSettings,
    expected_dimension: Option<usize>,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generation: Arc<dyn GenerationProvider>,
        mut settings: RagSettings,
    ) -> Self {
        // A zero budget would turn every request into a no-match answer.
        if settings.context_budget == 0 {
            tracing::warn!(
                "Context budget of 0 replaced by the default of {} chars",
                DEFAULT_CONTEXT_BUDGET
            );
            settings.context_budget = DEFAULT_CONTEXT_BUDGET;
        }
        Self {
            embedder,
            retriever: VectorRetriever::new(store).with_min_score(settings.min_score),
            assembler: ContextAssembler::new(),
            prompts: PromptBuilder::new(),
            generator: ResponseGenerator::new(generation),
            settings,
            expected_dimension: None,
        }
    }

    /// Wire the Couchbase store and OpenAI providers described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let rag = &config.rag;
        let openai = Arc::new(OpenAiClient::new(
            &config.openai,
            rag.embed_timeout.max(rag.generate_timeout),
        )?);
        let store = Arc::new(CouchbaseVectorStore::new(&config.couchbase, rag.search_timeout)?);

        Ok(Self::new(openai.clone(), store, openai, rag.clone())
            .with_expected_dimension(config.openai.embedding_dimension))
    }

    /// Reject query vectors whose length differs from `dimension`.
    pub fn with_expected_dimension(mut self, dimension: Option<usize>) -> Self {
        self.expected_dimension = dimension;
        self
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn settings(&self) -> &RagSettings {
        &self.settings
    }

    /// Answer `query_text` from at most `top_k` retrieved records.
    pub async fn answer(&self, query_text: &str, top_k: usize) -> Result<Answer, PipelineFailure> {
        self.answer_filtered(query_text, top_k, None).await
    }

    /// Like [`answer`](Self::answer), keeping only records accepted by `filter`.
    pub async fn answer_filtered(
        &self,
        query_text: &str,
        top_k: usize,
        filter: Option<&RecordFilter>,
    ) -> Result<Answer, PipelineFailure> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("answer", %request_id, top_k);
        self.run(query_text, top_k, filter).instrument(span).await
    }

    async fn run(
        &self,
        query_text: &str,
        top_k: usize,
        filter: Option<&RecordFilter>,
    ) -> Result<Answer, PipelineFailure> {
        let started = Instant::now();
        let mut tracker = RunTracker::new();

        // INIT
        let query = Query::new(query_text, top_k)
            .and_then(|q| q.ensure_max_chars(self.settings.max_query_chars).map(|_| q))
            .map_err(|e| tracker.fail(e.into()))?;
        tracker.advance();

        // EMBEDDING
        let embed_policy = if self.settings.retry_embedding {
            self.settings.retry.clone()
        } else {
            RetryPolicy::single_attempt()
        };
        let embedder = &self.embedder;
        let text = query.text();
        let timeout = self.settings.embed_timeout;
        let Attempted { result, attempts } = embed_policy
            .run(embedder.name(), move || {
                with_timeout(embedder.name(), timeout, embedder.embed(text))
            })
            .await;
        let query_vector = result
            .and_then(|v| self.check_dimension(v))
            .map_err(|source| tracker.fail(PipelineError::Embedding { source, attempts }))?;
        tracker.advance();

        // RETRIEVING
        let retriever = &self.retriever;
        let vector = query_vector.as_slice();
        let timeout = self.settings.search_timeout;
        let k = query.top_k();
        let Attempted { result, attempts } = self
            .settings
            .retry
            .run(retriever.store_name(), move || {
                with_timeout(retriever.store_name(), timeout, retriever.retrieve(vector, k, filter))
            })
            .await;
        let records = result.map_err(|source| tracker.fail(PipelineError::Retrieval { source, attempts }))?;
        tracker.advance();

        // ASSEMBLING
        let context = self.assembler.assemble(&records, self.settings.context_budget);
        tracing::debug!(
            "Assembled {} fragment(s), {}/{} chars from {} record(s)",
            context.len(),
            context.size(),
            context.budget(),
            records.len()
        );
        tracker.advance();

        // GENERATING
        if context.is_empty() {
            tracker.advance();
            tracing::info!(
                "No matching records; answered without generation in {}ms",
                started.elapsed().as_millis()
            );
            return Ok(Answer::no_grounded_match());
        }

        let prompt = self.prompts.build(&context, query.text());
        let generator = &self.generator;
        let prompt_ref = &prompt;
        let timeout: Duration = self.settings.generate_timeout;
        let Attempted { result, attempts } = self
            .settings
            .retry
            .run(generator.provider_name(), move || generator.generate(prompt_ref, timeout))
            .await;
        let answer = result.map_err(|source| tracker.fail(PipelineError::Generation { source, attempts }))?;
        tracker.advance();

        tracing::info!(
            "Answered with {} record(s) in context, {} supporting id(s), {} generation attempt(s), {}ms",
            context.len(),
            answer.supporting_ids.len(),
            attempts,
            started.elapsed().as_millis()
        );
        Ok(answer)
    }

    fn check_dimension(&self, vector: Vec<f32>) -> Result<Vec<f32>, ProviderError> {
        match self.expected_dimension {
            Some(expected) if vector.len() != expected => Err(ProviderError::malformed(
                self.embedder.name(),
                format!(
                    "embedding has {} dimensions, index expects {}",
                    vector.len(),
                    expected
                ),
            )),
            _ => Ok(vector),
        }
    }
}
