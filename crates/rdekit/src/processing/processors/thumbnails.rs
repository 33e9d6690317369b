//! Thumbnail generation from the tile's main image.

use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::ProcessorError;
use crate::processing::context::ProcessingContext;
use crate::processing::pipeline::Processor;

const THUMBNAIL_MAX_WIDTH: u32 = 640;
const THUMBNAIL_MAX_HEIGHT: u32 = 480;

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff"];

/// Renders a thumbnail from the first image in `main_image`, gated by
/// `system.save_thumbnail_image`. A rendering problem is logged, not
/// escalated; thumbnails are never worth failing a tile over.
pub struct ThumbnailGenerator;

impl Processor for ThumbnailGenerator {
    fn name(&self) -> &'static str {
        "thumbnail_generator"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        if !ctx.config.system.save_thumbnail_image {
            return Ok(());
        }

        let Some(source) = first_image(&ctx.tile.output_paths.main_image) else {
            debug!(tile = ctx.tile_index(), "no main image; skipping thumbnail");
            return Ok(());
        };

        let thumbnail_dir = &ctx.tile.output_paths.thumbnail;
        if let Err(e) = std::fs::create_dir_all(thumbnail_dir) {
            return Err(ProcessorError::io(thumbnail_dir.clone(), e));
        }

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("thumbnail");
        let destination = thumbnail_dir.join(format!("{stem}.png"));

        match image::open(&source) {
            Ok(img) => {
                let thumb = img.thumbnail(THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT);
                if let Err(e) = thumb.save(&destination) {
                    warn!(source = %source.display(), error = %e, "failed to save thumbnail");
                } else {
                    debug!(thumbnail = %destination.display(), "generated thumbnail");
                }
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "failed to decode main image");
            }
        }
        Ok(())
    }
}

/// First image in the directory, lexicographic by file name.
fn first_image(dir: &std::path::Path) -> Option<PathBuf> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
        })
        .collect();
    images.sort();
    images.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Config;
    use crate::models::paths::{InputPaths, OutputPaths};
    use crate::models::tile::{Mode, TileUnit};
    use crate::schema::invoice_schema::InvoiceSchema;
    use crate::schema::metadata_def::MetadataDefinition;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn context(tmp: &TempDir, enabled: bool) -> ProcessingContext {
        let input = InputPaths::under(tmp.path());
        let output = OutputPaths::build(tmp.path(), None, &input);
        let mut config = Config::default();
        config.system.save_thumbnail_image = enabled;
        ProcessingContext {
            mode: Mode::Invoice,
            config: Arc::new(config),
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

    fn write_png(path: &std::path::Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = image::RgbImage::from_pixel(32, 16, image::Rgb([200, 10, 10]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_generates_thumbnail_from_first_image() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp, true);
        write_png(&ctx.tile.output_paths.main_image.join("b_shot.png"));
        write_png(&ctx.tile.output_paths.main_image.join("a_shot.png"));

        ThumbnailGenerator.process(&mut ctx).unwrap();

        assert!(ctx.tile.output_paths.thumbnail.join("a_shot.png").exists());
        assert!(!ctx.tile.output_paths.thumbnail.join("b_shot.png").exists());
    }

    #[test]
    fn test_disabled_by_config() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp, false);
        write_png(&ctx.tile.output_paths.main_image.join("shot.png"));

        ThumbnailGenerator.process(&mut ctx).unwrap();
        assert!(!ctx.tile.output_paths.thumbnail.exists());
    }

    #[test]
    fn test_no_images_is_fine() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp, true);
        assert!(ThumbnailGenerator.process(&mut ctx).is_ok());
    }

    #[test]
    fn test_undecodable_image_never_fails_tile() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = context(&tmp, true);
        let fake = ctx.tile.output_paths.main_image.join("broken.png");
        std::fs::create_dir_all(fake.parent().unwrap()).unwrap();
        std::fs::write(&fake, "not an image").unwrap();

        assert!(ThumbnailGenerator.process(&mut ctx).is_ok());
    }
}
