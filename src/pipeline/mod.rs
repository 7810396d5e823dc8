//! Request orchestration for the answer pipeline.

pub mod orchestrator;
pub mod retry;
pub mod stage;

pub use orchestrator::{Query, RagPipeline};
pub use retry::{with_timeout, Attempted, RetryPolicy};
pub use stage::PipelineStage;
