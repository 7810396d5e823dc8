use async_trait::async_trait;

use crate::core::errors::ProviderError;

/// Maps text to a fixed-length vector.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Single-turn text completion.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// return the provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// complete a rendered prompt (non-streaming)
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}
