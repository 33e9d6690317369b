//! Structured-directory invoice export.

use tracing::debug;

use crate::error::ProcessorError;
use crate::processing::context::ProcessingContext;
use crate::processing::pipeline::Processor;

/// Copies the finalized tile invoice into `structured/`, gated by
/// `system.save_invoice_to_structured`.
pub struct StructuredInvoiceSaver;

impl Processor for StructuredInvoiceSaver {
    fn name(&self) -> &'static str {
        "structured_invoice_saver"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        if !ctx.config.system.save_invoice_to_structured {
            return Ok(());
        }

        let source = ctx.invoice_dst_filepath();
        if !source.exists() {
            return Err(ProcessorError::InvalidState(
                "tile invoice missing for structured export".to_string(),
            ));
        }

        let structured = &ctx.tile.output_paths.structured;
        std::fs::create_dir_all(structured).map_err(|e| ProcessorError::io(structured.clone(), e))?;

        let destination = structured.join("invoice.json");
        std::fs::copy(&source, &destination).map_err(|e| ProcessorError::io(source, e))?;
        debug!(destination = %destination.display(), "stored structured invoice");
        Ok(())
    }
}
