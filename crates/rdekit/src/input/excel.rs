//! Excel-based batch invoice reading.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::debug;

use crate::error::InputError;
use crate::invoice::overwrite::{ColumnPath, InvoicePatch};

/// Marker in cell A1 identifying the invoice-list sheet.
const INVOICE_SHEET_MARKER: &str = "invoiceList_format_id";

/// File-mode column holding the raw file name each row binds to.
pub const DATA_FILE_COLUMN: &str = "data_file_names/name";

#[derive(Debug, Clone)]
pub struct GeneralTerm {
    pub term_id: String,
    pub key_name: String,
}

#[derive(Debug, Clone)]
pub struct SpecificTerm {
    pub class_id: String,
    pub term_id: String,
    pub key_name: String,
}

/// A parsed `*_excel_invoice.xlsx` workbook.
///
/// The invoice sheet fuses header rows 2 and 3 into `prefix/field` column
/// paths; data rows start at row 5. `generalTerm` / `specificTerm` sheets
/// resolve term keys for the `sample.general/…` column families.
#[derive(Debug)]
pub struct ExcelInvoiceFile {
    pub path: PathBuf,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    general_terms: Vec<GeneralTerm>,
    specific_terms: Vec<SpecificTerm>,
}

impl ExcelInvoiceFile {
    pub fn read(path: &Path) -> Result<Self, InputError> {
        if !path.exists() {
            return Err(InputError::ExcelInvoiceNotFound(path.to_path_buf()));
        }

        let mut workbook = open_workbook_auto(path).map_err(|e| InputError::Spreadsheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut invoice_grid: Option<Vec<Vec<String>>> = None;
        let mut general_terms = Vec::new();
        let mut specific_terms = Vec::new();

        for sheet_name in workbook.sheet_names().to_owned() {
            let range = workbook
                .worksheet_range(&sheet_name)
                .map_err(|e| InputError::Spreadsheet {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
            let grid = to_grid(&range);
            if grid.is_empty() {
                continue;
            }

            if cell(&grid, 0, 0) == INVOICE_SHEET_MARKER {
                if invoice_grid.is_some() {
                    return Err(InputError::MultipleInvoiceSheets(path.to_path_buf()));
                }
                invoice_grid = Some(grid);
            } else if sheet_name == "generalTerm" {
                general_terms = grid
                    .iter()
                    .skip(1)
                    .filter(|row| row.iter().any(|c| !c.is_empty()))
                    .map(|row| GeneralTerm {
                        term_id: row.first().cloned().unwrap_or_default(),
                        key_name: row.get(1).cloned().unwrap_or_default(),
                    })
                    .collect();
            } else if sheet_name == "specificTerm" {
                specific_terms = grid
                    .iter()
                    .skip(1)
                    .filter(|row| row.iter().any(|c| !c.is_empty()))
                    .map(|row| SpecificTerm {
                        class_id: row.first().cloned().unwrap_or_default(),
                        term_id: row.get(1).cloned().unwrap_or_default(),
                        key_name: row.get(2).cloned().unwrap_or_default(),
                    })
                    .collect();
            }
        }

        let grid = invoice_grid.ok_or_else(|| InputError::NoInvoiceSheet(path.to_path_buf()))?;
        check_intermittent_empty_rows(path, &grid)?;

        let columns = fuse_headers(&grid);
        let rows: Vec<Vec<String>> = grid
            .into_iter()
            .skip(4)
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .collect();

        debug!(
            path = %path.display(),
            rows = rows.len(),
            columns = columns.len(),
            "read excel invoice"
        );

        Ok(Self {
            path: path.to_path_buf(),
            columns,
            rows,
            general_terms,
            specific_terms,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Non-empty (column, cell) pairs of one data row.
    pub fn row(&self, index: usize) -> Vec<(String, String)> {
        let Some(row) = self.rows.get(index) else {
            return Vec::new();
        };
        self.columns
            .iter()
            .zip(row.iter())
            .filter(|(column, cell)| !column.is_empty() && !cell.trim().is_empty())
            .map(|(column, cell)| (column.clone(), cell.trim().to_string()))
            .collect()
    }

    /// The raw file name bound to each row via `data_file_names/name`.
    pub fn referenced_file_names(&self) -> Vec<String> {
        (0..self.row_count())
            .filter_map(|i| {
                self.row(i)
                    .into_iter()
                    .find(|(column, _)| column == DATA_FILE_COLUMN)
                    .map(|(_, cell)| cell)
            })
            .collect()
    }

    /// Converts a row into an invoice patch, translating the Excel column
    /// families (`sample.general/…`, `sample.specific/…`) into typed paths
    /// via the term sheets.
    pub fn patch_for_row(&self, index: usize) -> Result<InvoicePatch, InputError> {
        let mut patch = InvoicePatch::new();

        for (column, cell) in self.row(index) {
            if column == DATA_FILE_COLUMN || column == "data_folder" {
                continue;
            }

            if let Some(field) = column.strip_prefix("sample.general/") {
                let key_name = format!("sample.general.{field}");
                let term =
                    self.general_terms
                        .iter()
                        .find(|t| t.key_name == key_name)
                        .ok_or_else(|| InputError::UnknownTerm {
                            column: column.clone(),
                            key_name: key_name.clone(),
                        })?;
                patch.push(
                    column,
                    ColumnPath::GeneralAttribute {
                        term_id: term.term_id.clone(),
                    },
                    cell,
                );
                continue;
            }

            if let Some(field) = column.strip_prefix("sample.specific/") {
                let key_name = format!("sample.specific.{field}");
                let term =
                    self.specific_terms
                        .iter()
                        .find(|t| t.key_name == key_name)
                        .ok_or_else(|| InputError::UnknownTerm {
                            column: column.clone(),
                            key_name: key_name.clone(),
                        })?;
                patch.push(
                    column,
                    ColumnPath::SpecificAttribute {
                        class_id: term.class_id.clone(),
                        term_id: term.term_id.clone(),
                    },
                    cell,
                );
                continue;
            }

            if let Some(path) = ColumnPath::parse(&column) {
                patch.push(column, path, cell);
            }
        }

        Ok(patch)
    }
}

fn to_grid(range: &calamine::Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|data| match data {
                    Data::Empty => String::new(),
                    Data::String(s) => s.trim().to_string(),
                    Data::Float(f) => {
                        if f.fract() == 0.0 {
                            format!("{}", *f as i64)
                        } else {
                            f.to_string()
                        }
                    }
                    Data::Int(i) => i.to_string(),
                    Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
                    other => other.to_string().trim().to_string(),
                })
                .collect()
        })
        .collect()
}

fn cell(grid: &[Vec<String>], row: usize, col: usize) -> &str {
    grid.get(row)
        .and_then(|r| r.get(col))
        .map(String::as_str)
        .unwrap_or("")
}

/// Header rows 2 and 3 combine into `prefix/field`; a missing prefix keeps
/// the bare field name.
fn fuse_headers(grid: &[Vec<String>]) -> Vec<String> {
    let width = grid.iter().map(Vec::len).max().unwrap_or(0);
    (0..width)
        .map(|col| {
            let prefix = cell(grid, 1, col);
            let field = cell(grid, 2, col);
            if prefix.is_empty() {
                field.to_string()
            } else {
                format!("{prefix}/{field}")
            }
        })
        .collect()
}

/// A blank row inside the data region (rows 5+) with data following it is
/// an authoring error.
fn check_intermittent_empty_rows(path: &Path, grid: &[Vec<String>]) -> Result<(), InputError> {
    let data = &grid[grid.len().min(4)..];
    let mut seen_blank = false;
    for row in data {
        let blank = row.iter().all(|c| c.is_empty());
        if blank {
            seen_blank = true;
        } else if seen_blank {
            return Err(InputError::IntermittentBlankRows(path.to_path_buf()));
        }
    }
    Ok(())
}
