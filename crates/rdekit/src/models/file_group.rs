use std::path::{Path, PathBuf};

/// Typed collection of classified input files.
///
/// Every input path lands in exactly one bucket; [`FileGroup::all_files`]
/// is the ordered concatenation of the four buckets.
#[derive(Debug, Clone, Default)]
pub struct FileGroup {
    pub raw_files: Vec<PathBuf>,
    pub zip_files: Vec<PathBuf>,
    pub excel_invoices: Vec<PathBuf>,
    pub other_files: Vec<PathBuf>,
}

impl FileGroup {
    /// Classifies paths by suffix rules:
    /// `.zip` → zip_files, `*_excel_invoice.xls[xm]` → excel_invoices,
    /// SmartTable descriptors → other_files, everything else → raw_files.
    pub fn classify(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut group = Self::default();
        for path in paths {
            if has_extension(&path, &["zip"]) {
                group.zip_files.push(path);
            } else if is_excel_invoice(&path) {
                group.excel_invoices.push(path);
            } else if is_smarttable_descriptor(&path) {
                group.other_files.push(path);
            } else {
                group.raw_files.push(path);
            }
        }
        group
    }

    pub fn all_files(&self) -> Vec<&Path> {
        self.raw_files
            .iter()
            .chain(&self.zip_files)
            .chain(&self.excel_invoices)
            .chain(&self.other_files)
            .map(PathBuf::as_path)
            .collect()
    }

    pub fn file_count(&self) -> usize {
        self.raw_files.len()
            + self.zip_files.len()
            + self.excel_invoices.len()
            + self.other_files.len()
    }

    pub fn has_excel_invoices(&self) -> bool {
        !self.excel_invoices.is_empty()
    }

    pub fn has_zip_files(&self) -> bool {
        !self.zip_files.is_empty()
    }

    pub fn smarttable_descriptor(&self) -> Option<&Path> {
        self.other_files
            .iter()
            .map(PathBuf::as_path)
            .find(|p| is_smarttable_descriptor(p))
    }
}

/// `*_excel_invoice.xls` / `.xlsx` / `.xlsm`, matched case-insensitively on
/// the extension and exactly on the stem suffix.
pub fn is_excel_invoice(path: &Path) -> bool {
    if !has_extension(path, &["xls", "xlsx", "xlsm"]) {
        return false;
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|stem| stem.ends_with("_excel_invoice"))
}

/// `smarttable_*.csv` / `.tsv` / `.xlsx` batch descriptors.
pub fn is_smarttable_descriptor(path: &Path) -> bool {
    if !has_extension(path, &["csv", "tsv", "xlsx"]) {
        return false;
    }
    path.file_name()
        .and_then(|s| s.to_str())
        .is_some_and(|name| name.starts_with("smarttable_"))
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| extensions.contains(&e.as_str()))
}
