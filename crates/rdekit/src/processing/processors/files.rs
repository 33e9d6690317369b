//! Raw-file placement steps.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::ProcessorError;
use crate::processing::context::ProcessingContext;
use crate::processing::pipeline::Processor;

/// Copies the tile's input files into `raw/` and/or `nonshared_raw/` per
/// the `save_raw` / `save_nonshared_raw` toggles.
pub struct RawFileCopier;

impl Processor for RawFileCopier {
    fn name(&self) -> &'static str {
        "raw_file_copier"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        let mut sources: Vec<std::path::PathBuf> = ctx.tile.input_files.clone();

        // Optionally retain the SmartTable descriptor alongside the data.
        if ctx.config.smarttable.save_table_file {
            if let Some(descriptor) = &ctx.smarttable_path {
                sources.push(descriptor.clone());
            }
        }

        if ctx.config.system.save_raw {
            copy_files(&ctx.tile.output_paths.raw, &sources)?;
        }
        if ctx.config.system.save_nonshared_raw {
            copy_files(&ctx.tile.output_paths.nonshared_raw, &sources)?;
        }
        Ok(())
    }
}

fn copy_files(dest_dir: &Path, sources: &[std::path::PathBuf]) -> Result<(), ProcessorError> {
    if sources.is_empty() {
        return Ok(());
    }

    std::fs::create_dir_all(dest_dir).map_err(|e| ProcessorError::io(dest_dir, e))?;

    for source in sources {
        let Some(name) = source.file_name() else {
            warn!(source = %source.display(), "skipping path without a file name");
            continue;
        };
        let dest = dest_dir.join(name);
        std::fs::copy(source, &dest).map_err(|e| ProcessorError::io(source.clone(), e))?;
        debug!(from = %source.display(), to = %dest.display(), "copied raw file");
    }
    Ok(())
}

/// Directory names an RDEFormat archive may address directly.
const STRUCTURE_DIRS: [&str; 7] = [
    "raw",
    "main_image",
    "other_image",
    "meta",
    "structured",
    "logs",
    "nonshared_raw",
];

/// Copy-only placement for RDEFormat tiles: each extracted file lands in
/// the output directory matching the structure directory in its path.
pub struct RdeFormatStructureCopier;

impl Processor for RdeFormatStructureCopier {
    fn name(&self) -> &'static str {
        "rdeformat_structure_copier"
    }

    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), ProcessorError> {
        let out = &ctx.tile.output_paths;
        for file in &ctx.tile.input_files {
            let Some(dir_name) = file.components().find_map(|c| {
                let name = c.as_os_str().to_str()?;
                STRUCTURE_DIRS.contains(&name).then_some(name)
            }) else {
                debug!(file = %file.display(), "no structure directory in path; skipping");
                continue;
            };

            let dest_dir = match dir_name {
                "raw" => &out.raw,
                "main_image" => &out.main_image,
                "other_image" => &out.other_image,
                "meta" => &out.meta,
                "structured" => &out.structured,
                "logs" => &out.logs,
                "nonshared_raw" => &out.nonshared_raw,
                _ => unreachable!("matched against STRUCTURE_DIRS"),
            };

            std::fs::create_dir_all(dest_dir).map_err(|e| ProcessorError::io(dest_dir, e))?;
            let Some(name) = file.file_name() else {
                continue;
            };
            std::fs::copy(file, dest_dir.join(name))
                .map_err(|e| ProcessorError::io(file.clone(), e))?;
        }
        Ok(())
    }
}
