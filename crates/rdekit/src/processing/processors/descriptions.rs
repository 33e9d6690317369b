//! Feature transcription into the invoice description.

use tracing::warn;

use crate::error::ProcessorError;
use crate::invoice::description::update_description_with_features;
use crate::models::metadata::MetadataDocument;
use crate::processing::context::ProcessingContext;
use crate::processing::pipeline::Processor;

/// Transcribes feature-flagged metadata items into `basic.description`.
///
/// Description updates never fail a tile: a problem here is logged and the
/// chain continues.
pub struct DescriptionUpdater;

impl Processor for DescriptionUpdater {
    fn name(&self) -> &'static str {
        "description_updater"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        if !ctx.config.system.feature_description {
            return Ok(());
        }

        let metadata_path = ctx.tile.output_paths.metadata_json();
        if !metadata_path.exists() {
            return Ok(());
        }

        if let Err(e) = self.update(ctx, &metadata_path) {
            warn!(tile = ctx.tile_index(), error = %e, "description update skipped");
        }
        Ok(())
    }
}

impl DescriptionUpdater {
    fn update(
        &self,
        ctx: &mut ProcessingContext,
        metadata_path: &std::path::Path,
    ) -> Result<(), ProcessorError> {
        let metadata = MetadataDocument::load(metadata_path)?;
        let mut doc = ctx.tile_invoice()?;
        let metadata_def = ctx.metadata_def.clone();
        update_description_with_features(&mut doc, &metadata_def, &metadata);
        ctx.store_tile_invoice(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Config;
    use crate::models::invoice::InvoiceDocument;
    use crate::models::paths::{InputPaths, OutputPaths};
    use crate::models::tile::{Mode, TileUnit};
    use crate::schema::invoice_schema::InvoiceSchema;
    use crate::schema::metadata_def::MetadataDefinition;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(tmp: &TempDir, feature_description: bool) -> ProcessingContext {
        let input = InputPaths::under(tmp.path());
        let output = OutputPaths::build(tmp.path(), None, &input);
        let mut config = Config::default();
        config.system.feature_description = feature_description;
        ProcessingContext {
            mode: Mode::Invoice,
            config: Arc::new(config),
            input: Arc::new(input),
            schema: Arc::new(
                InvoiceSchema::from_value(&json!({"type": "object", "properties": {}})).unwrap(),
            ),
            metadata_def: Arc::new(
                MetadataDefinition::from_value(&json!({
                    "length": {
                        "name": {"ja": "長さ", "en": "Length"},
                        "schema": {"type": "number"},
                        "unit": "nm",
                        "_feature": true
                    }
                }))
                .unwrap(),
            ),
            excel: None,
            smarttable_path: None,
            tile: TileUnit::new(0, vec![], output),
            invoice_cache: None,
            callback: None,
        }
    }

    #[test]
    fn test_transcribes_feature_values() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp, true);

        ctx.store_tile_invoice(
            InvoiceDocument::from_value(json!({"basic": {"description": null}})).unwrap(),
        )
        .unwrap();
        crate::fileops::write_json(
            &ctx.tile.output_paths.metadata_json(),
            &json!({"constant": {"length": {"value": 120, "unit": "nm"}}, "variable": []}),
        )
        .unwrap();

        DescriptionUpdater.process(&mut ctx).unwrap();
        assert_eq!(
            ctx.tile_invoice().unwrap().description(),
            Some("長さ(nm):120")
        );
    }

    #[test]
    fn test_skips_without_metadata_file() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp, true);
        assert!(DescriptionUpdater.process(&mut ctx).is_ok());
    }

    #[test]
    fn test_disabled_by_config() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp, false);

        ctx.store_tile_invoice(
            InvoiceDocument::from_value(json!({"basic": {"description": "untouched"}})).unwrap(),
        )
        .unwrap();
        crate::fileops::write_json(
            &ctx.tile.output_paths.metadata_json(),
            &json!({"constant": {"length": {"value": 1}}, "variable": []}),
        )
        .unwrap();

        DescriptionUpdater.process(&mut ctx).unwrap();
        assert_eq!(
            ctx.tile_invoice().unwrap().description(),
            Some("untouched")
        );
    }

    #[test]
    fn test_broken_metadata_never_fails_tile() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp, true);

        ctx.store_tile_invoice(InvoiceDocument::new()).unwrap();
        let path = ctx.tile.output_paths.metadata_json();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        assert!(DescriptionUpdater.process(&mut ctx).is_ok());
    }
}
