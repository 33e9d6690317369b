//! Top-level run loop: configuration, classification, per-tile dispatch
//! and status aggregation.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info};

use crate::archive::ScratchGuard;
use crate::config::loader::load_config;
use crate::error::{RdekitError, Result};
use crate::input::classifier::classify;
use crate::logging::{render_traceback, RunLogger};
use crate::models::paths::InputPaths;
use crate::models::status::{Outcome, RunSummary, WorkflowStatus};
use crate::processing::context::{DatasetCallback, ProcessingContext};
use crate::processing::factories::PipelineFactory;
use crate::schema::invoice_schema::InvoiceSchema;
use crate::schema::metadata_def::MetadataDefinition;

#[derive(Default)]
pub struct WorkflowOptions {
    /// User dataset hook, invoked once per tile.
    pub callback: Option<Arc<DatasetCallback>>,
    /// Cooperative cancellation flag, checked between tiles. Remaining
    /// tiles are marked skipped once it is raised.
    pub cancel: Option<Arc<AtomicBool>>,
}

/// Runs the structuring workflow over the standard layout rooted at `root`.
pub fn run(root: &Path) -> Result<RunSummary> {
    run_with_options(root, WorkflowOptions::default())
}

pub fn run_with_options(root: &Path, options: WorkflowOptions) -> Result<RunSummary> {
    let input = Arc::new(InputPaths::under(root));
    input.verify()?;

    let config = Arc::new(load_config(&input.tasksupport)?);
    config.validate().map_err(RdekitError::Config)?;

    let logger = RunLogger::new(&root.join("logs"));
    logger.install();

    let schema = Arc::new(
        InvoiceSchema::load(&input.invoice_schema_json()).map_err(RdekitError::Config)?,
    );
    let metadata_def = Arc::new(load_metadata_def(&input)?);

    backup_invoice_org(root, &input)?;

    let classified = classify(&input, &config, root)?;
    let mode = classified.mode;
    let pipeline = PipelineFactory::create(mode);
    let excel = classified.excel.map(Arc::new);
    let tile_count = classified.tiles.len();

    info!(mode = %mode, tiles = tile_count, "starting workflow");

    let run_temp = root.join("temp");
    let mut summary = RunSummary::new();
    let mut abort = false;

    for tile in classified.tiles {
        let tile_index = tile.index;

        if abort || is_cancelled(&options) {
            summary.push(WorkflowStatus::skipped(tile_index, mode));
            continue;
        }

        // The tile owns its logs directory from the start; everything else
        // is created by the processor that writes into it.
        std::fs::create_dir_all(&tile.output_paths.logs)
            .map_err(|e| RdekitError::io(tile.output_paths.logs.clone(), e))?;

        // Tile-local scratch is released on every exit path. The run-level
        // temp directory is shared (invoice backup, expanded archives) and
        // survives the run.
        let _scratch = (tile.output_paths.temp != run_temp)
            .then(|| ScratchGuard::new(tile.output_paths.temp.clone()));

        let mut ctx = ProcessingContext {
            mode,
            config: Arc::clone(&config),
            input: Arc::clone(&input),
            schema: Arc::clone(&schema),
            metadata_def: Arc::clone(&metadata_def),
            excel: excel.clone(),
            smarttable_path: classified.smarttable_path.clone(),
            tile,
            invoice_cache: None,
            callback: options.callback.clone(),
        };

        let status = pipeline.execute(&mut ctx);

        if let Some(err) = &status.error {
            let rendered = render_traceback(err, config.traceback.format);
            let _ = logger.write_line(&rendered);
            error!(tile = tile_index, "{err}");

            if err.source.is_fatal() && !config.multidata_tile.ignore_errors {
                abort = true;
            }
        }

        summary.push(status);
    }

    info!(
        tiles = summary.statuses.len(),
        failed = summary.failed_count(),
        outcome = ?summary.overall_outcome(),
        "workflow finished"
    );
    Ok(summary)
}

/// Maps a finished (or aborted) run to the process exit code: 0 success,
/// 1 validation/processing failure, 2 usage or configuration error.
pub fn exit_code(result: &Result<RunSummary>) -> i32 {
    match result {
        Ok(summary) => summary.exit_code(),
        Err(error) => error.exit_code(),
    }
}

fn is_cancelled(options: &WorkflowOptions) -> bool {
    options
        .cancel
        .as_ref()
        .is_some_and(|flag| flag.load(Ordering::SeqCst))
}

fn load_metadata_def(input: &InputPaths) -> Result<MetadataDefinition> {
    let path = input.metadata_def_json();
    if path.exists() {
        MetadataDefinition::load(&path).map_err(RdekitError::Config)
    } else {
        Ok(MetadataDefinition::default())
    }
}

/// Copies the caller-provided invoice to `temp/invoice_org.json` before any
/// tile runs, so every tile initializes from the pristine base.
fn backup_invoice_org(root: &Path, input: &InputPaths) -> Result<()> {
    let source = input.invoice_json();
    if !source.exists() {
        return Ok(());
    }

    let destination = root.join("temp").join("invoice_org.json");
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RdekitError::io(parent.to_path_buf(), e))?;
    }
    std::fs::copy(&source, &destination).map_err(|e| RdekitError::io(source, e))?;
    Ok(())
}

/// Outcome check helper used by hosts that only need pass/fail.
pub fn succeeded(summary: &RunSummary) -> bool {
    summary.overall_outcome() == Outcome::Success
}
