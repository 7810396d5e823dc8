use std::fmt;

use serde::Serialize;

/// Per-request state of the answer pipeline.
///
/// `Init → Embedding → Retrieving → Assembling → Generating → Done`, with
/// `Failed` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Init,
    Embedding,
    Retrieving,
    Assembling,
    Generating,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    /// The state a successful step moves to. Terminal states stay put.
    pub fn next(self) -> PipelineStage {
        match self {
            PipelineStage::Init => PipelineStage::Embedding,
            PipelineStage::Embedding => PipelineStage::Retrieving,
            PipelineStage::Retrieving => PipelineStage::Assembling,
            PipelineStage::Assembling => PipelineStage::Generating,
            PipelineStage::Generating => PipelineStage::Done,
            PipelineStage::Done => PipelineStage::Done,
            PipelineStage::Failed => PipelineStage::Failed,
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineStage::Init => "INIT",
            PipelineStage::Embedding => "EMBEDDING",
            PipelineStage::Retrieving => "RETRIEVING",
            PipelineStage::Assembling => "ASSEMBLING",
            PipelineStage::Generating => "GENERATING",
            PipelineStage::Done => "DONE",
            PipelineStage::Failed => "FAILED",
        };
        f.write_str(label)
    }
}
