//! Response generation: one bounded completion call plus id attribution.

use std::sync::Arc;
use std::time::Duration;

use super::provider::GenerationProvider;
use crate::core::errors::ProviderError;
use crate::pipeline::with_timeout;
use crate::rag::attribution::supporting_ids;
use crate::rag::{Answer, Prompt};

#[derive(Clone)]
pub struct ResponseGenerator {
    provider: Arc<dyn GenerationProvider>,
}

impl ResponseGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Render `prompt`, complete it within `timeout` and attribute the result.
    ///
    /// `supporting_ids` only ever contains ids present in `prompt.context`.
    pub async fn generate(&self, prompt: &Prompt, timeout: Duration) -> Result<Answer, ProviderError> {
        let rendered = prompt.render();
        let raw = with_timeout(self.provider.name(), timeout, self.provider.complete(&rendered)).await?;

        let text = raw.trim();
        if text.is_empty() {
            return Err(ProviderError::malformed(
                self.provider.name(),
                "model returned an empty completion",
            ));
        }

        Ok(Answer {
            supporting_ids: supporting_ids(text, &prompt.context),
            text: text.to_string(),
            grounded: !prompt.context.is_empty(),
        })
    }
}
