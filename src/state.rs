use std::sync::Arc;
use std::time::Instant;

use crate::core::config::AppConfig;
use crate::core::errors::ProviderError;
use crate::pipeline::RagPipeline;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: RagPipeline,
    pub default_top_k: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: RagPipeline) -> Arc<Self> {
        let default_top_k = pipeline.settings().default_top_k;
        Arc::new(AppState {
            pipeline,
            default_top_k,
            started_at: Instant::now(),
        })
    }

    pub fn initialize(config: &AppConfig) -> Result<Arc<Self>, ProviderError> {
        Ok(Self::new(RagPipeline::from_config(config)?))
    }
}
