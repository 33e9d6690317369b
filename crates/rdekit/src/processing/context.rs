use std::path::PathBuf;
use std::sync::Arc;

use crate::config::schema::Config;
use crate::error::ProcessorError;
use crate::input::excel::ExcelInvoiceFile;
use crate::models::invoice::InvoiceDocument;
use crate::models::paths::{DatasetPaths, InputPaths};
use crate::models::tile::{Mode, TileUnit};
use crate::schema::invoice_schema::InvoiceSchema;
use crate::schema::metadata_def::MetadataDefinition;

/// User-supplied dataset hook, invoked once per tile with the tile's
/// bundled paths.
pub type DatasetCallback = dyn Fn(&DatasetPaths<'_>) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>
    + Send
    + Sync;

/// Per-tile mutable state threaded through the processor chain.
///
/// Shared run-level inputs (config, schema, metadata definition) are held
/// behind `Arc` and never mutated; everything tile-local lives in `tile`
/// and `invoice_cache`.
pub struct ProcessingContext {
    pub mode: Mode,
    pub config: Arc<Config>,
    pub input: Arc<InputPaths>,
    pub schema: Arc<InvoiceSchema>,
    pub metadata_def: Arc<MetadataDefinition>,
    pub excel: Option<Arc<ExcelInvoiceFile>>,
    pub smarttable_path: Option<PathBuf>,
    pub tile: TileUnit,
    /// The tile invoice as last written, so later processors avoid
    /// re-reading the file they just produced.
    pub invoice_cache: Option<InvoiceDocument>,
    pub callback: Option<Arc<DatasetCallback>>,
}

impl ProcessingContext {
    pub fn tile_index(&self) -> usize {
        self.tile.index
    }

    pub fn invoice_dst_filepath(&self) -> PathBuf {
        self.tile.output_paths.invoice_json()
    }

    /// The tile invoice, from cache or disk.
    pub fn tile_invoice(&mut self) -> Result<InvoiceDocument, ProcessorError> {
        if let Some(cached) = &self.invoice_cache {
            return Ok(cached.clone());
        }
        let path = self.invoice_dst_filepath();
        let doc = InvoiceDocument::load(&path)?;
        self.invoice_cache = Some(doc.clone());
        Ok(doc)
    }

    /// Persists the tile invoice and refreshes the cache.
    pub fn store_tile_invoice(&mut self, doc: InvoiceDocument) -> Result<(), ProcessorError> {
        doc.save(&self.invoice_dst_filepath())?;
        self.invoice_cache = Some(doc);
        Ok(())
    }

    pub fn dataset_paths(&self) -> Option<DatasetPaths<'_>> {
        self.invoice_cache.as_ref().map(|invoice| DatasetPaths {
            input: &self.input,
            output: &self.tile.output_paths,
            rawfiles: &self.tile.input_files,
            smarttable_row: self.tile.smarttable_row.as_ref(),
            invoice,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::paths::OutputPaths;
    use serde_json::json;
    use tempfile::TempDir;

    fn context(tmp: &TempDir) -> ProcessingContext {
        let root = tmp.path();
        let input = InputPaths::under(root);
        let output = OutputPaths::build(root, None, &input);
        ProcessingContext {
            mode: Mode::Invoice,
            config: Arc::new(Config::default()),
            input: Arc::new(input),
            schema: Arc::new(
                InvoiceSchema::from_value(&json!({"type": "object", "properties": {}})).unwrap(),
            ),
            metadata_def: Arc::new(MetadataDefinition::default()),
            excel: None,
            smarttable_path: None,
            tile: TileUnit::new(0, vec![], output),
            invoice_cache: None,
            callback: None,
        }
    }

    #[test]
    fn test_invoice_cache_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp);

        let doc = InvoiceDocument::from_value(json!({"basic": {"dataName": "x"}})).unwrap();
        ctx.store_tile_invoice(doc.clone()).unwrap();

        assert!(ctx.invoice_dst_filepath().exists());
        assert_eq!(ctx.tile_invoice().unwrap(), doc);
    }

    #[test]
    fn test_tile_invoice_missing_file_errors() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp);
        assert!(ctx.tile_invoice().is_err());
    }

    #[test]
    fn test_dataset_paths_requires_cached_invoice() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp);
        assert!(ctx.dataset_paths().is_none());

        ctx.store_tile_invoice(InvoiceDocument::new()).unwrap();
        assert!(ctx.dataset_paths().is_some());
    }
}
