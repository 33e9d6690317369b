//! Contract validation steps.

use crate::error::ProcessorError;
use crate::models::metadata::MetadataDocument;
use crate::processing::context::ProcessingContext;
use crate::processing::pipeline::Processor;
use crate::schema::validate::{validate_invoice, validate_metadata, ValidateOptions};

/// Validates the tile invoice against `invoice.schema.json`.
pub struct InvoiceValidator;

impl Processor for InvoiceValidator {
    fn name(&self) -> &'static str {
        "invoice_validator"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        // RDEFormat tiles ship their invoice inside the archive; there may
        // be nothing materialized at the tile path yet.
        if ctx.invoice_cache.is_none() && !ctx.invoice_dst_filepath().exists() {
            if ctx.mode == crate::models::tile::Mode::RdeFormat {
                return Ok(());
            }
            return Err(ProcessorError::InvalidState(
                "tile invoice was never initialized".to_string(),
            ));
        }

        let doc = ctx.tile_invoice()?;
        validate_invoice(&doc, &ctx.schema, ValidateOptions::default())?;
        Ok(())
    }
}

/// Validates `metadata.json` against `metadata-def.json` when present.
pub struct MetadataValidator;

impl Processor for MetadataValidator {
    fn name(&self) -> &'static str {
        "metadata_validator"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        let path = ctx.tile.output_paths.metadata_json();
        if !path.exists() {
            return Ok(());
        }

        let metadata = MetadataDocument::load(&path)?;
        validate_metadata(&metadata, &ctx.metadata_def)?;
        Ok(())
    }
}
