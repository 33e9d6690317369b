pub mod context;
pub mod factories;
pub mod pipeline;
pub mod processors;

pub use context::{DatasetCallback, ProcessingContext};
pub use factories::PipelineFactory;
pub use pipeline::{Pipeline, Processor};
