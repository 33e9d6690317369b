use std::path::{Path, PathBuf};

use crate::error::{RdekitError, Result};
use crate::models::invoice::InvoiceDocument;
use crate::models::tile::SmartTableRow;

/// Immutable bundle of input directory roots. All three exist at the start
/// of a run; `tasksupport` is opened read-only by the core.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub inputdata: PathBuf,
    pub invoice: PathBuf,
    pub tasksupport: PathBuf,
}

impl InputPaths {
    pub fn new(
        inputdata: impl Into<PathBuf>,
        invoice: impl Into<PathBuf>,
        tasksupport: impl Into<PathBuf>,
    ) -> Self {
        Self {
            inputdata: inputdata.into(),
            invoice: invoice.into(),
            tasksupport: tasksupport.into(),
        }
    }

    /// Standard layout under a single data root.
    pub fn under(root: &Path) -> Self {
        Self::new(
            root.join("inputdata"),
            root.join("invoice"),
            root.join("tasksupport"),
        )
    }

    pub fn verify(&self) -> Result<()> {
        for dir in [&self.inputdata, &self.invoice, &self.tasksupport] {
            if !dir.is_dir() {
                return Err(RdekitError::io(
                    dir.clone(),
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "input directory does not exist",
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn invoice_json(&self) -> PathBuf {
        self.invoice.join("invoice.json")
    }

    pub fn invoice_schema_json(&self) -> PathBuf {
        self.tasksupport.join("invoice.schema.json")
    }

    pub fn metadata_def_json(&self) -> PathBuf {
        self.tasksupport.join("metadata-def.json")
    }
}

/// Per-tile output directory bundle.
///
/// The first tile writes to top-level directories under the run root;
/// divided tiles write under `divided/{NNNN}`. Directories are created
/// lazily by the processors that write into them, so a failed tile leaves
/// only its `logs` directory behind.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub raw: PathBuf,
    pub nonshared_raw: PathBuf,
    pub structured: PathBuf,
    pub main_image: PathBuf,
    pub other_image: PathBuf,
    pub meta: PathBuf,
    pub thumbnail: PathBuf,
    pub logs: PathBuf,
    pub invoice: PathBuf,
    /// Shared, read-only schema file under `tasksupport`.
    pub invoice_schema_json: PathBuf,
    /// Run-level backup of the caller-provided invoice.
    pub invoice_org: PathBuf,
    pub smarttable_rowfile: Option<PathBuf>,
    pub temp: PathBuf,
    pub invoice_patch: PathBuf,
    pub attachment: PathBuf,
}

impl OutputPaths {
    /// Builds the bundle for one tile. `tile_dir` is `None` for the
    /// top-level tile and `Some("0001")`-style for divided tiles.
    pub fn build(run_root: &Path, tile_dir: Option<&str>, input: &InputPaths) -> Self {
        let base = match tile_dir {
            None => run_root.to_path_buf(),
            Some(dir) => run_root.join("divided").join(dir),
        };

        Self {
            raw: base.join("raw"),
            nonshared_raw: base.join("nonshared_raw"),
            structured: base.join("structured"),
            main_image: base.join("main_image"),
            other_image: base.join("other_image"),
            meta: base.join("meta"),
            thumbnail: base.join("thumbnail"),
            logs: base.join("logs"),
            invoice: base.join("invoice"),
            invoice_schema_json: input.invoice_schema_json(),
            invoice_org: run_root.join("temp").join("invoice_org.json"),
            smarttable_rowfile: None,
            temp: base.join("temp"),
            invoice_patch: base.join("invoice_patch"),
            attachment: base.join("attachment"),
        }
    }

    pub fn invoice_json(&self) -> PathBuf {
        self.invoice.join("invoice.json")
    }

    pub fn metadata_json(&self) -> PathBuf {
        self.meta.join("metadata.json")
    }

    /// Formats the divided-directory suffix for a tile number, zero-padded
    /// to `digit` places.
    pub fn divided_dir_name(number: usize, digit: usize) -> String {
        format!("{number:0digit$}")
    }
}

/// Facade handed to the user dataset callback. Bundles the run inputs and
/// the tile's own outputs without exposing mutable pipeline state.
#[derive(Debug)]
pub struct DatasetPaths<'a> {
    pub input: &'a InputPaths,
    pub output: &'a OutputPaths,
    pub rawfiles: &'a [PathBuf],
    pub smarttable_row: Option<&'a SmartTableRow>,
    pub invoice: &'a InvoiceDocument,
}

impl<'a> DatasetPaths<'a> {
    pub fn inputdata(&self) -> &Path {
        &self.input.inputdata
    }

    pub fn tasksupport(&self) -> &Path {
        &self.input.tasksupport
    }
}
