//! Pipeline orchestration and run statistics.

mod orchestrator;
mod stats;

pub use orchestrator::{
    BatchReport, BatchRun, Pipeline, PipelineResult, ResultStatus, Stage, StageError,
};
pub use stats::{BatchStats, BatchSummary};
