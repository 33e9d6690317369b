//! User dataset-function invocation.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::debug;

use crate::error::ProcessorError;
use crate::processing::context::ProcessingContext;
use crate::processing::pipeline::Processor;

/// Invokes the user-supplied dataset function with the tile's bundled
/// paths. Errors and panics from the callback fail this tile only.
pub struct DatasetCallbackRunner;

impl Processor for DatasetCallbackRunner {
    fn name(&self) -> &'static str {
        "dataset_callback_runner"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        let Some(callback) = ctx.callback.clone() else {
            return Ok(());
        };

        // Make sure the facade exposes the tile invoice even when the
        // initializer was a no-op.
        if ctx.invoice_cache.is_none() && ctx.invoice_dst_filepath().exists() {
            let _ = ctx.tile_invoice()?;
        }
        let Some(paths) = ctx.dataset_paths() else {
            debug!(tile = ctx.tile_index(), "no invoice available; callback skipped");
            return Ok(());
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| callback(&paths)));
        match outcome {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProcessorError::UserCallback(e.to_string())),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "callback panicked".to_string());
                Err(ProcessorError::UserCallback(message))
            }
        }
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
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(tmp: &TempDir) -> ProcessingContext {
        let input = InputPaths::under(tmp.path());
        let output = OutputPaths::build(tmp.path(), None, &input);
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
    fn test_no_callback_is_noop() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp);
        assert!(DatasetCallbackRunner.process(&mut ctx).is_ok());
    }

    #[test]
    fn test_callback_receives_tile_paths() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp);
        ctx.store_tile_invoice(
            InvoiceDocument::from_value(json!({"basic": {"dataName": "x"}})).unwrap(),
        )
        .unwrap();

        let called = Arc::new(AtomicBool::new(false));
        let seen = Arc::clone(&called);
        ctx.callback = Some(Arc::new(move |paths| {
            assert_eq!(paths.invoice.data_name(), Some("x"));
            assert!(paths.output.raw.ends_with("raw"));
            seen.store(true, Ordering::SeqCst);
            Ok(())
        }));

        DatasetCallbackRunner.process(&mut ctx).unwrap();
        assert!(called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_callback_error_fails_tile() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp);
        ctx.store_tile_invoice(InvoiceDocument::new()).unwrap();
        ctx.callback = Some(Arc::new(|_| Err("user boom".into())));

        match DatasetCallbackRunner.process(&mut ctx).unwrap_err() {
            ProcessorError::UserCallback(message) => assert!(message.contains("user boom")),
            other => panic!("expected user callback error, got {other:?}"),
        }
    }

    #[test]
    fn test_callback_panic_is_caught() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp);
        ctx.store_tile_invoice(InvoiceDocument::new()).unwrap();
        ctx.callback = Some(Arc::new(|_| panic!("exploded")));

        match DatasetCallbackRunner.process(&mut ctx).unwrap_err() {
            ProcessorError::UserCallback(message) => assert!(message.contains("exploded")),
            other => panic!("expected user callback error, got {other:?}"),
        }
    }
}
