use std::fmt;
use std::path::PathBuf;

use crate::models::paths::OutputPaths;

/// Processing mode selected by the input classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Invoice,
    ExcelInvoice,
    MultiDataTile,
    RdeFormat,
    SmartTable,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::ExcelInvoice => "ExcelInvoice",
            Self::MultiDataTile => "MultiDataTile",
            Self::RdeFormat => "rdeformat",
            Self::SmartTable => "SmartTableInvoice",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One data row of a SmartTable descriptor: column paths paired with cell
/// strings, in descriptor order.
#[derive(Debug, Clone, Default)]
pub struct SmartTableRow {
    columns: Vec<String>,
    values: Vec<String>,
}

impl SmartTableRow {
    pub fn new(columns: Vec<String>, values: Vec<String>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i].as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Columns that carry a non-empty cell.
    pub fn non_empty(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(_, v)| !v.trim().is_empty())
    }
}

/// One dataset unit. Created by the classifier, mutated only by the tile
/// pipeline, and destroyed when the run completes.
#[derive(Debug)]
pub struct TileUnit {
    pub index: usize,
    pub input_files: Vec<PathBuf>,
    pub smarttable_row: Option<SmartTableRow>,
    pub output_paths: OutputPaths,
}

impl TileUnit {
    pub fn new(index: usize, input_files: Vec<PathBuf>, output_paths: OutputPaths) -> Self {
        Self {
            index,
            input_files,
            smarttable_row: None,
            output_paths,
        }
    }

    pub fn with_row(mut self, row: SmartTableRow) -> Self {
        self.smarttable_row = Some(row);
        self
    }

    /// First input file, used for `${filename}` resolution and data-name
    /// fallbacks.
    pub fn first_input(&self) -> Option<&PathBuf> {
        self.input_files.first()
    }
}
