// Handbook assistant
// Ties a loaded knowledge base, the embedding provider and the prompt log together


use tracing::{info, warn};

use crate::Result;
use crate::config::Config;
use crate::embeddings::{EmbeddingProvider, OllamaClient};
use crate::interaction_log::{InteractionLog, PromptLog};
use crate::retrieval::{RetrievalConfig, RetrievalOutcome, Retriever};
use crate::storage::{IndexStore, KnowledgeBase};

pub struct HandbookAssistant {
    provider: Box<dyn EmbeddingProvider>,
    knowledge: KnowledgeBase,
    config: RetrievalConfig,
    log: Option<Box<dyn InteractionLog>>,
}

impl HandbookAssistant {
    #[inline]
    pub fn new(
        provider: Box<dyn EmbeddingProvider>,
        knowledge: KnowledgeBase,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            provider,
            knowledge,
            config,
            log: None,
        }
    }

    /// Record every query to `log`
    #[inline]
    pub fn with_log(mut self, log: Box<dyn InteractionLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Load the persisted index for the configured Ollama model.
    ///
    /// Fails with a configuration error when no index exists or when it was
    /// built with a different model or dimension.
    #[inline]
    pub fn load(config: &Config) -> Result<Self> {
        let provider = OllamaClient::new(&config.ollama)?;
        let store = IndexStore::new(config.index_dir());
        let knowledge = store.load(provider.model_id(), provider.dimension())?;

        info!(
            "Loaded {} chunks ({} dimensions) from {}",
            knowledge.len(),
            knowledge.dimension(),
            store.dir().display()
        );

        Ok(
            Self::new(Box::new(provider), knowledge, config.retrieval.clone())
                .with_log(Box::new(PromptLog::new(config.prompt_log_path()))),
        )
    }

    #[inline]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    #[inline]
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Answer with the configured top-k and threshold
    #[inline]
    pub fn ask(&self, question: &str) -> Result<RetrievalOutcome> {
        self.ask_with(question, self.config.top_k, self.config.similarity_threshold)
    }

    #[inline]
    pub fn ask_with(&self, question: &str, top_k: usize, threshold: f32) -> Result<RetrievalOutcome> {
        let retriever = Retriever::new(self.provider.as_ref(), &self.knowledge, self.config.clone());
        let outcome = retriever.retrieve_with(question, top_k, threshold)?;

        if let Some(log) = &self.log {
            if let Err(e) = log.record(question, &outcome) {
                warn!("Failed to write prompt log: {}", e);
            }
        }

        Ok(outcome)
    }
}
