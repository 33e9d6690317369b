//! Input-bundle classification: mode selection and tile construction.

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::archive;
use crate::config::schema::{Config, ExtendedMode};
use crate::error::{
    InputError, IssueKind, RdekitError, Result, ValidationIssue, ValidationReport,
};
use crate::input::excel::ExcelInvoiceFile;
use crate::input::smarttable::SmartTableFile;
use crate::models::file_group::FileGroup;
use crate::models::paths::{InputPaths, OutputPaths};
use crate::models::tile::{Mode, TileUnit};

/// The classifier's output: the selected mode and the tiles to process, in
/// order, plus the mode-specific source descriptors.
#[derive(Debug)]
pub struct ClassifiedInput {
    pub mode: Mode,
    pub tiles: Vec<TileUnit>,
    pub excel: Option<ExcelInvoiceFile>,
    pub smarttable_path: Option<PathBuf>,
}

/// Produces `(mode, tiles)` from the input bundle.
///
/// Mode priority is fixed: an `_excel_invoice` workbook wins over
/// `extended_mode`, which wins over a SmartTable descriptor; plain Invoice
/// is the fallback.
pub fn classify(input: &InputPaths, config: &Config, run_root: &Path) -> Result<ClassifiedInput> {
    let entries = enumerate_inputs(&input.inputdata);
    let group = FileGroup::classify(entries);

    let extended_mode = config.extended_mode().map_err(RdekitError::Config)?;

    let mode = if group.has_excel_invoices() {
        Mode::ExcelInvoice
    } else if extended_mode == Some(ExtendedMode::MultiDataTile) {
        Mode::MultiDataTile
    } else if extended_mode == Some(ExtendedMode::RdeFormat) {
        Mode::RdeFormat
    } else if group.smarttable_descriptor().is_some() {
        Mode::SmartTable
    } else {
        Mode::Invoice
    };

    info!(mode = %mode, files = group.file_count(), "classified input bundle");

    let scratch = run_root.join("temp");
    let digit = config.multidata_tile.divided_dir_digit;

    let classified = match mode {
        Mode::Invoice => classify_invoice(input, run_root, &group, &scratch)?,
        Mode::ExcelInvoice => classify_excel(input, run_root, &group, &scratch, digit)?,
        Mode::MultiDataTile => classify_multidata(input, run_root, config, &group, &scratch)?,
        Mode::RdeFormat => classify_rdeformat(input, run_root, &group, &scratch, digit)?,
        Mode::SmartTable => classify_smarttable(input, run_root, &group, &scratch, digit)?,
    };

    Ok(classified)
}

/// Top-level files of `inputdata`, lexicographic, system noise excluded.
fn enumerate_inputs(inputdata: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(inputdata)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| !archive::is_system_noise(p))
        .collect();
    files.sort();
    files
}

fn expand_archives(group: &FileGroup, scratch: &Path) -> Result<Vec<PathBuf>> {
    let mut extracted = Vec::new();
    for zip_path in &group.zip_files {
        let stem = zip_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("archive");
        let dest = scratch.join(stem);
        extracted.extend(archive::expand(zip_path, &dest)?);
    }
    Ok(extracted)
}

fn classify_invoice(
    input: &InputPaths,
    run_root: &Path,
    group: &FileGroup,
    scratch: &Path,
) -> Result<ClassifiedInput> {
    let mut files = group.raw_files.clone();
    files.extend(group.other_files.clone());
    files.extend(expand_archives(group, scratch)?);

    if group.has_zip_files() && files.is_empty() {
        return Err(missing_input("archives expanded to zero files"));
    }

    let tile = TileUnit::new(0, files, OutputPaths::build(run_root, None, input));
    Ok(ClassifiedInput {
        mode: Mode::Invoice,
        tiles: vec![tile],
        excel: None,
        smarttable_path: None,
    })
}

fn classify_excel(
    input: &InputPaths,
    run_root: &Path,
    group: &FileGroup,
    scratch: &Path,
    digit: usize,
) -> Result<ClassifiedInput> {
    let excel_path = group
        .excel_invoices
        .first()
        .expect("mode selected because an excel invoice is present");
    let excel = ExcelInvoiceFile::read(excel_path).map_err(RdekitError::Input)?;

    let mut pool = group.raw_files.clone();
    pool.extend(expand_archives(group, scratch)?);

    let mut tiles = Vec::new();
    for (index, name) in excel.referenced_file_names().into_iter().enumerate() {
        let bound = pool
            .iter()
            .find(|candidate| {
                candidate
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n == name)
            })
            .cloned()
            .ok_or_else(|| RdekitError::Input(InputError::RawFileMissing { name: name.clone() }))?;

        let tile_dir = divided_dir(index, digit);
        let output = OutputPaths::build(run_root, tile_dir.as_deref(), input);
        tiles.push(TileUnit::new(index, vec![bound], output));
    }

    if tiles.is_empty() {
        return Err(missing_input("excel invoice carries no data rows"));
    }

    Ok(ClassifiedInput {
        mode: Mode::ExcelInvoice,
        tiles,
        excel: Some(excel),
        smarttable_path: None,
    })
}

fn classify_multidata(
    input: &InputPaths,
    run_root: &Path,
    config: &Config,
    group: &FileGroup,
    scratch: &Path,
) -> Result<ClassifiedInput> {
    let digit = config.multidata_tile.divided_dir_digit;
    let start = config.multidata_tile.divided_dir_start_number;

    // One tile per top-level entry; an archive batches its contents into a
    // single tile.
    let mut batches: Vec<Vec<PathBuf>> = Vec::new();
    for file in &group.raw_files {
        batches.push(vec![file.clone()]);
    }
    for file in &group.other_files {
        batches.push(vec![file.clone()]);
    }
    for zip_path in &group.zip_files {
        let stem = zip_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("archive");
        let contents = archive::expand(zip_path, &scratch.join(stem))?;
        batches.push(contents);
    }

    // An empty input directory still yields one empty tile so the
    // validators run and report the absence.
    if batches.is_empty() {
        batches.push(Vec::new());
    }

    let tiles = batches
        .into_iter()
        .enumerate()
        .map(|(index, files)| {
            let dir = OutputPaths::divided_dir_name(start + index, digit);
            let output = OutputPaths::build(run_root, Some(&dir), input);
            TileUnit::new(index, files, output)
        })
        .collect();

    Ok(ClassifiedInput {
        mode: Mode::MultiDataTile,
        tiles,
        excel: None,
        smarttable_path: None,
    })
}

fn classify_rdeformat(
    input: &InputPaths,
    run_root: &Path,
    group: &FileGroup,
    scratch: &Path,
    digit: usize,
) -> Result<ClassifiedInput> {
    let dataset_archives: Vec<&PathBuf> = group
        .zip_files
        .iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("rdeformat_"))
        })
        .collect();

    let mut tiles = Vec::new();
    for (index, zip_path) in dataset_archives.iter().enumerate() {
        let stem = zip_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("rdeformat");
        let contents = archive::expand(zip_path, &scratch.join(stem))?;
        if contents.is_empty() {
            debug!(archive = %zip_path.display(), "dataset archive expanded to nothing");
            continue;
        }

        let tile_dir = divided_dir(index, digit);
        let output = OutputPaths::build(run_root, tile_dir.as_deref(), input);
        tiles.push(TileUnit::new(index, contents, output));
    }

    if tiles.is_empty() {
        return Err(missing_input("no rdeformat dataset archive produced any files"));
    }

    Ok(ClassifiedInput {
        mode: Mode::RdeFormat,
        tiles,
        excel: None,
        smarttable_path: None,
    })
}

fn classify_smarttable(
    input: &InputPaths,
    run_root: &Path,
    group: &FileGroup,
    scratch: &Path,
    digit: usize,
) -> Result<ClassifiedInput> {
    let descriptor_path = group
        .smarttable_descriptor()
        .expect("mode selected because a descriptor is present")
        .to_path_buf();
    let table = SmartTableFile::read(&descriptor_path).map_err(RdekitError::Input)?;

    let mut pool = group.raw_files.clone();
    pool.extend(expand_archives(group, scratch)?);

    let mappings = table
        .generate_row_files(&scratch.join("rows"), &pool)
        .map_err(RdekitError::Input)?;

    if mappings.is_empty() {
        return Err(missing_input("smarttable descriptor carries no data rows"));
    }

    let tiles = mappings
        .into_iter()
        .enumerate()
        .map(|(index, (rowfile, row, files))| {
            let tile_dir = divided_dir(index, digit);
            let mut output = OutputPaths::build(run_root, tile_dir.as_deref(), input);
            output.smarttable_rowfile = Some(rowfile);
            TileUnit::new(index, files, output).with_row(row)
        })
        .collect();

    Ok(ClassifiedInput {
        mode: Mode::SmartTable,
        tiles,
        excel: None,
        smarttable_path: Some(descriptor_path),
    })
}

/// Tile 0 writes top-level; later tiles write under `divided/`.
fn divided_dir(index: usize, digit: usize) -> Option<String> {
    if index == 0 {
        None
    } else {
        Some(OutputPaths::divided_dir_name(index, digit))
    }
}

fn missing_input(detail: &str) -> RdekitError {
    let mut report = ValidationReport::new();
    report.push(ValidationIssue::new("inputdata", IssueKind::Missing, detail));
    RdekitError::Validation(report)
}
