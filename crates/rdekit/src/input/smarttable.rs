//! SmartTable batch descriptors: tabular files whose rows each describe one
//! dataset tile.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::InputError;
use crate::models::tile::SmartTableRow;

/// Column-path prefixes a descriptor must use at least once.
const MAPPING_PREFIXES: [&str; 5] = ["basic/", "custom/", "sample/", "meta/", "inputdata"];

/// A parsed `smarttable_*` descriptor. The first row holds display names
/// and is skipped; the second row carries the mapping-key headers.
#[derive(Debug)]
pub struct SmartTableFile {
    pub path: PathBuf,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SmartTableFile {
    pub fn read(path: &Path) -> Result<Self, InputError> {
        if !path.exists() {
            return Err(InputError::DescriptorNaming {
                path: path.to_path_buf(),
                reason: "file does not exist".to_string(),
            });
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if !name.starts_with("smarttable_") {
            return Err(InputError::DescriptorNaming {
                path: path.to_path_buf(),
                reason: "file name must start with 'smarttable_'".to_string(),
            });
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let grid = match extension.as_str() {
            "csv" => read_delimited(path, b',')?,
            "tsv" => read_delimited(path, b'\t')?,
            "xlsx" => read_workbook(path)?,
            other => {
                return Err(InputError::DescriptorNaming {
                    path: path.to_path_buf(),
                    reason: format!("unsupported extension '.{other}' (expected .xlsx, .csv, .tsv)"),
                })
            }
        };

        if grid.len() < 2 {
            return Err(InputError::Table {
                path: path.to_path_buf(),
                message: "descriptor needs a display row and a mapping-key header row".to_string(),
            });
        }

        let columns: Vec<String> = grid[1].iter().map(|c| c.trim().to_string()).collect();
        let has_mapping = columns
            .iter()
            .any(|c| MAPPING_PREFIXES.iter().any(|p| c.starts_with(p)));
        if !has_mapping {
            return Err(InputError::NoMappingKeys(path.to_path_buf()));
        }

        let rows: Vec<Vec<String>> = grid
            .into_iter()
            .skip(2)
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
            .map(|mut row| {
                row.resize(columns.len(), String::new());
                row
            })
            .collect();

        debug!(path = %path.display(), rows = rows.len(), "read smarttable descriptor");

        Ok(Self {
            path: path.to_path_buf(),
            columns,
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, index: usize) -> Option<SmartTableRow> {
        self.rows.get(index).map(|values| {
            SmartTableRow::new(
                self.columns.clone(),
                values.iter().map(|v| v.trim().to_string()).collect(),
            )
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Materializes one CSV file per data row (header = mapping keys) and
    /// maps each row's `inputdata<N>` cells onto extracted archive files.
    ///
    /// Returns `(row_csv_path, row, bound_files)` triples in row order.
    pub fn generate_row_files(
        &self,
        output_dir: &Path,
        extracted_files: &[PathBuf],
    ) -> Result<Vec<(PathBuf, SmartTableRow, Vec<PathBuf>)>, InputError> {
        std::fs::create_dir_all(output_dir).map_err(|e| InputError::RowFile {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("smarttable");

        let inputdata_columns: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with("inputdata"))
            .map(|(i, _)| i)
            .collect();

        let mut mappings = Vec::with_capacity(self.rows.len());
        for (index, values) in self.rows.iter().enumerate() {
            let csv_path = output_dir.join(format!("f{stem}_{index:04}.csv"));
            write_row_csv(&csv_path, &self.columns, values)?;

            let mut bound = Vec::new();
            for &col in &inputdata_columns {
                let reference = values[col].trim();
                if reference.is_empty() {
                    continue;
                }
                if let Some(found) = find_by_relative_path(reference, extracted_files) {
                    bound.push(found);
                }
            }

            let row = SmartTableRow::new(
                self.columns.clone(),
                values.iter().map(|v| v.trim().to_string()).collect(),
            );
            mappings.push((csv_path, row, bound));
        }

        Ok(mappings)
    }
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| InputError::Table {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| InputError::Table {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        grid.push(record.iter().map(str::to_string).collect());
    }
    Ok(grid)
}

fn read_workbook(path: &Path) -> Result<Vec<Vec<String>>, InputError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| InputError::Spreadsheet {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| InputError::Spreadsheet {
            path: path.to_path_buf(),
            message: "workbook has no sheets".to_string(),
        })?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| InputError::Spreadsheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(range
        .rows()
        .map(|row| {
            row.iter()
                .map(|data| match data {
                    Data::Empty => String::new(),
                    Data::String(s) => s.to_string(),
                    Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
                    Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect())
}

fn write_row_csv(path: &Path, columns: &[String], values: &[String]) -> Result<(), InputError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| InputError::Table {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer
        .write_record(columns)
        .and_then(|_| writer.write_record(values))
        .and_then(|_| writer.flush().map_err(csv::Error::from))
        .map_err(|e| InputError::Table {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Matches an `inputdata<N>` reference against extracted files by relative
/// path suffix, tolerating either path-separator convention.
fn find_by_relative_path(reference: &str, extracted: &[PathBuf]) -> Option<PathBuf> {
    let normalized = reference.trim_matches(['/', '\\']).replace('\\', "/");
    extracted
        .iter()
        .find(|candidate| {
            let text = candidate.to_string_lossy().replace('\\', "/");
            text.ends_with(&normalized)
        })
        .cloned()
}
