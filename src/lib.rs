//! Hotel recommendation answers grounded in a Couchbase vector index.
//!
//! A request flows through [`pipeline::RagPipeline`]: the query is embedded,
//! the nearest hotel records are retrieved, packed into a bounded context,
//! and handed to a chat model whose reply is attributed back to record ids.

pub mod core;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod rag;
pub mod server;
pub mod state;

pub use crate::core::config::{AppConfig, ConfigService};
pub use crate::core::errors::{ConfigError, PipelineFailure, ProviderError};
pub use crate::pipeline::{PipelineStage, Query, RagPipeline};
pub use crate::rag::Answer;
