use crate::error::PipelineError;
use crate::models::tile::Mode;

/// Final outcome of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skipped,
    Failed,
}

/// Per-tile execution record, preserved in tile order by the dispatcher.
#[derive(Debug)]
pub struct WorkflowStatus {
    pub tile_index: usize,
    pub mode: Mode,
    pub outcome: Outcome,
    pub error: Option<PipelineError>,
}

impl WorkflowStatus {
    pub fn success(tile_index: usize, mode: Mode) -> Self {
        Self {
            tile_index,
            mode,
            outcome: Outcome::Success,
            error: None,
        }
    }

    pub fn skipped(tile_index: usize, mode: Mode) -> Self {
        Self {
            tile_index,
            mode,
            outcome: Outcome::Skipped,
            error: None,
        }
    }

    pub fn failed(tile_index: usize, mode: Mode, error: PipelineError) -> Self {
        Self {
            tile_index,
            mode,
            outcome: Outcome::Failed,
            error: Some(error),
        }
    }
}

/// Ordered collection of tile statuses for one run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub statuses: Vec<WorkflowStatus>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, status: WorkflowStatus) {
        self.statuses.push(status);
    }

    pub fn overall_outcome(&self) -> Outcome {
        if self
            .statuses
            .iter()
            .any(|s| s.outcome == Outcome::Failed)
        {
            Outcome::Failed
        } else {
            Outcome::Success
        }
    }

    pub fn failed_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|s| s.outcome == Outcome::Failed)
            .count()
    }

    pub fn exit_code(&self) -> i32 {
        match self.overall_outcome() {
            Outcome::Failed => 1,
            _ => 0,
        }
    }
}
