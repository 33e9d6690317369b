pub mod archive;
pub mod config;
pub mod error;
pub mod fileops;
pub mod input;
pub mod invoice;
pub mod logging;
pub mod models;
pub mod processing;
pub mod schema;
pub mod workflow;

pub use config::{load_config, Config};
pub use error::{
    ConfigError, IssueKind, PipelineError, ProcessorError, RdekitError, Result, TemplateError,
    ValidationIssue, ValidationReport,
};
pub use models::{
    InputPaths, InvoiceDocument, MetadataDocument, Mode, Outcome, OutputPaths, RunSummary,
    TileUnit, WorkflowStatus,
};
pub use processing::{DatasetCallback, Pipeline, PipelineFactory, ProcessingContext, Processor};
pub use schema::{InvoiceSchema, MetadataDefinition};
pub use workflow::{exit_code, run, run_with_options, WorkflowOptions};
