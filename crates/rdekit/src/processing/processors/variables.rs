//! Magic-variable substitution step.

use tracing::debug;

use crate::error::ProcessorError;
use crate::invoice::magic::{self, MagicVariableResolver};
use crate::models::invoice::InvoiceDocument;
use crate::models::metadata::MetadataDocument;
use crate::processing::context::ProcessingContext;
use crate::processing::pipeline::Processor;

/// Resolves `${…}` tokens in the tile invoice's string fields, gated by
/// `system.magic_variable`.
pub struct MagicVariableApplier;

impl Processor for MagicVariableApplier {
    fn name(&self) -> &'static str {
        "magic_variable_applier"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        if !ctx.config.system.magic_variable {
            return Ok(());
        }

        let mut doc = ctx.tile_invoice()?;

        // Resolution reads from the pristine backup, never from the tile's
        // own (possibly already rewritten) invoice.
        let source_path = &ctx.tile.output_paths.invoice_org;
        let invoice_source = if source_path.exists() {
            InvoiceDocument::load(source_path)?
        } else {
            doc.clone()
        };

        let metadata_path = ctx.tile.output_paths.metadata_json();
        let metadata_source = if metadata_path.exists() {
            Some(MetadataDocument::load(&metadata_path)?)
        } else {
            None
        };

        let default_rawfile = std::path::PathBuf::new();
        let rawfile = ctx.tile.first_input().unwrap_or(&default_rawfile);

        let resolver = MagicVariableResolver::new(rawfile, &invoice_source, metadata_source.as_ref());
        let changed = magic::apply_to_invoice(&mut doc, &resolver)?;

        if changed {
            debug!(tile = ctx.tile_index(), "expanded magic variables");
            ctx.store_tile_invoice(doc)?;
        }
        Ok(())
    }
}
