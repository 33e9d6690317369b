use tracing::{debug, error, info_span};

use crate::error::{PipelineError, ProcessorError};
use crate::models::status::WorkflowStatus;
use crate::processing::context::ProcessingContext;

/// One step of the per-tile chain.
pub trait Processor: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError>;
}

/// Ordered processor chain executed once per tile.
pub struct Pipeline {
    processors: Vec<Box<dyn Processor>>,
}

impl Pipeline {
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        Self { processors }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    pub fn processor_names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Runs the chain to completion, early exit, or first failure.
    ///
    /// `SkipRemaining` terminates the tile successfully without running the
    /// later processors; any other error fails this tile only.
    pub fn execute(&self, ctx: &mut ProcessingContext) -> WorkflowStatus {
        let tile_index = ctx.tile_index();
        let mode = ctx.mode;
        let _tile_span = info_span!("tile", index = tile_index, mode = %mode).entered();

        for processor in &self.processors {
            let _step = info_span!("processor", name = processor.name()).entered();
            match processor.process(ctx) {
                Ok(()) => debug!(processor = processor.name(), "completed"),
                Err(ProcessorError::SkipRemaining) => {
                    debug!(
                        processor = processor.name(),
                        "requested skip of remaining processors"
                    );
                    return WorkflowStatus::success(tile_index, mode);
                }
                Err(source) => {
                    error!(processor = processor.name(), error = %source, "tile failed");
                    return WorkflowStatus::failed(
                        tile_index,
                        mode,
                        PipelineError {
                            tile_index,
                            processor: processor.name(),
                            source,
                        },
                    );
                }
            }
        }

        WorkflowStatus::success(tile_index, mode)
    }
}
