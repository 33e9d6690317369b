//! Tile invoice initializers, one per processing mode.

use serde_json::Value;
use tracing::debug;

use crate::error::ProcessorError;
use crate::invoice::overwrite::{
    overwrite_invoice, InvoicePatch, OverwriteOptions,
};
use crate::models::invoice::InvoiceDocument;
use crate::models::metadata::{MetaValue, MetadataDocument};
use crate::processing::context::ProcessingContext;
use crate::processing::pipeline::Processor;
use crate::schema::invoice_schema::ScalarType;

/// Copies the run-level `invoice_org` backup into the tile's invoice
/// directory. Used by the Invoice and MultiDataTile modes.
pub struct StandardInvoiceInitializer;

impl Processor for StandardInvoiceInitializer {
    fn name(&self) -> &'static str {
        "standard_invoice_initializer"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        let source = ctx.tile.output_paths.invoice_org.clone();
        if !source.exists() {
            return Err(ProcessorError::io(
                source,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "original invoice backup not found",
                ),
            ));
        }

        let mut doc = InvoiceDocument::load(&source)?;
        ensure_data_name(ctx, &mut doc);
        ctx.store_tile_invoice(doc)?;

        debug!(path = %ctx.invoice_dst_filepath().display(), "initialized tile invoice");
        Ok(())
    }
}

/// Materializes the tile invoice from one Excel-invoice row.
pub struct ExcelRowInvoiceInitializer;

impl Processor for ExcelRowInvoiceInitializer {
    fn name(&self) -> &'static str {
        "excel_row_invoice_initializer"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        let excel = ctx
            .excel
            .clone()
            .ok_or_else(|| ProcessorError::InvalidState("excel invoice not loaded".to_string()))?;

        let base = InvoiceDocument::load(&ctx.tile.output_paths.invoice_org)?;
        let patch = excel.patch_for_row(ctx.tile_index())?;

        // The base's row-mutable fields are nulled first so empty cells
        // never inherit values from the original invoice.
        let outcome = overwrite_invoice(
            &base,
            &patch,
            &ctx.schema,
            OverwriteOptions {
                reset_base: true,
                preserve_owner_id: false,
            },
        )?;

        let mut doc = outcome.invoice;
        ensure_data_name(ctx, &mut doc);
        ctx.store_tile_invoice(doc)?;
        Ok(())
    }
}

/// Materializes the tile invoice from the tile's SmartTable row and routes
/// `meta/` columns into `metadata.json`.
pub struct SmartTableInvoiceInitializer;

impl Processor for SmartTableInvoiceInitializer {
    fn name(&self) -> &'static str {
        "smarttable_invoice_initializer"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        let row = ctx
            .tile
            .smarttable_row
            .clone()
            .ok_or_else(|| ProcessorError::InvalidState("tile has no smarttable row".to_string()))?;

        let base = InvoiceDocument::load(&ctx.tile.output_paths.invoice_org)?;
        let patch = InvoicePatch::from_smarttable_row(&row);
        let outcome = overwrite_invoice(&base, &patch, &ctx.schema, OverwriteOptions::default())?;

        if !outcome.meta_entries.is_empty() {
            write_meta_constants(ctx, &outcome.meta_entries)?;
        }

        let mut doc = outcome.invoice;
        ensure_data_name(ctx, &mut doc);
        ctx.store_tile_invoice(doc)?;
        Ok(())
    }
}

/// RDEFormat archives carry their own invoice; nothing to initialize.
pub struct NoOpInvoiceInitializer;

impl Processor for NoOpInvoiceInitializer {
    fn name(&self) -> &'static str {
        "noop_invoice_initializer"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        debug!(tile = ctx.tile_index(), "invoice provided by dataset archive");
        Ok(())
    }
}

/// Terminates a SmartTable tile early when its row binds no data payload.
/// Placed after the validators so a payload-less row is still checked.
pub struct SmartTableEarlyExit;

impl Processor for SmartTableEarlyExit {
    fn name(&self) -> &'static str {
        "smarttable_early_exit"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        if ctx.tile.input_files.is_empty() {
            debug!(tile = ctx.tile_index(), "row carries no data payload");
            return Err(ProcessorError::SkipRemaining);
        }
        Ok(())
    }
}

/// Fills `basic.dataName` from the first input file name when the invoice
/// leaves it absent or empty.
fn ensure_data_name(ctx: &ProcessingContext, doc: &mut InvoiceDocument) {
    let missing = match doc.field("basic", "dataName") {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    };
    if !missing {
        return;
    }

    if let Some(name) = ctx
        .tile
        .first_input()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
    {
        doc.set_data_name(name);
    }
}

/// Casts `meta/` cells via the metadata definition and persists them as
/// `metadata.json` constants.
fn write_meta_constants(
    ctx: &ProcessingContext,
    entries: &[(String, String)],
) -> Result<(), ProcessorError> {
    let path = ctx.tile.output_paths.metadata_json();
    let mut metadata = if path.exists() {
        MetadataDocument::load(&path)?
    } else {
        MetadataDocument::new()
    };

    for (key, cell) in entries {
        let (value, unit) = match ctx.metadata_def.get(key) {
            Some(entry) => {
                let ty = ScalarType::from_keyword(&entry.schema_field.ty);
                let value = cast_meta_cell(cell, ty);
                (value, entry.unit.clone())
            }
            None => (Value::String(cell.clone()), None),
        };

        let meta = match unit {
            Some(unit) => MetaValue::with_unit(value, unit),
            None => MetaValue::new(value),
        };
        metadata.insert_constant(key.clone(), meta);
    }

    metadata.save(&path)?;
    Ok(())
}

fn cast_meta_cell(cell: &str, ty: Option<ScalarType>) -> Value {
    match ty {
        Some(ScalarType::Integer) => cell
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(cell.to_string())),
        Some(ScalarType::Number) => cell
            .parse::<f64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(cell.to_string())),
        Some(ScalarType::Boolean) if cell.eq_ignore_ascii_case("true") => Value::Bool(true),
        Some(ScalarType::Boolean) if cell.eq_ignore_ascii_case("false") => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}
