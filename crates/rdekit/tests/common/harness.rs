//! Test harness: an isolated data root with the standard input layout and
//! helpers to run the workflow against it.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

use rdekit::models::DatasetPaths;
use rdekit::workflow::{run_with_options, WorkflowOptions};
use rdekit::{RdekitError, RunSummary};

use super::builders;

pub struct TestHarness {
    temp_dir: TempDir,
    pub root: PathBuf,
    pub inputdata: PathBuf,
    pub invoice_dir: PathBuf,
    pub tasksupport: PathBuf,
}

impl TestHarness {
    /// Creates the standard layout with the default schema and a base
    /// invoice already in place.
    pub fn new() -> Self {
        let harness = Self::empty();
        harness.write_schema(&builders::standard_schema());
        harness.write_base_invoice(&builders::base_invoice());
        harness
    }

    /// Creates only the directory skeleton.
    pub fn empty() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path().to_path_buf();

        let inputdata = root.join("inputdata");
        let invoice_dir = root.join("invoice");
        let tasksupport = root.join("tasksupport");
        for dir in [&inputdata, &invoice_dir, &tasksupport] {
            std::fs::create_dir_all(dir).expect("create input layout");
        }

        Self {
            temp_dir,
            root,
            inputdata,
            invoice_dir,
            tasksupport,
        }
    }

    pub fn write_input(&self, name: &str, content: &[u8]) -> PathBuf {
        let path = self.inputdata.join(name);
        std::fs::write(&path, content).expect("write input file");
        path
    }

    pub fn write_input_zip(&self, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let path = self.inputdata.join(name);
        let file = std::fs::File::create(&path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        for (entry, content) in entries {
            writer
                .start_file(*entry, SimpleFileOptions::default())
                .expect("zip entry");
            writer.write_all(content.as_bytes()).expect("zip write");
        }
        writer.finish().expect("finish zip");
        path
    }

    pub fn write_schema(&self, schema: &Value) {
        self.write_json(&self.tasksupport.join("invoice.schema.json"), schema);
    }

    pub fn write_metadata_def(&self, definition: &Value) {
        self.write_json(&self.tasksupport.join("metadata-def.json"), definition);
    }

    pub fn write_base_invoice(&self, invoice: &Value) {
        self.write_json(&self.invoice_dir.join("invoice.json"), invoice);
    }

    pub fn write_config_yaml(&self, content: &str) {
        std::fs::write(self.tasksupport.join("rdeconfig.yaml"), content)
            .expect("write rdeconfig.yaml");
    }

    pub fn write_pyproject(&self, content: &str) {
        std::fs::write(self.tasksupport.join("pyproject.toml"), content)
            .expect("write pyproject.toml");
    }

    fn write_json(&self, path: &Path, value: &Value) {
        let text = serde_json::to_string_pretty(value).expect("serialize fixture");
        std::fs::write(path, text).expect("write fixture");
    }

    pub fn run(&self) -> Result<RunSummary, RdekitError> {
        rdekit::run(&self.root)
    }

    pub fn run_with_callback<F>(&self, callback: F) -> Result<RunSummary, RdekitError>
    where
        F: Fn(&DatasetPaths<'_>) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    {
        run_with_options(
            &self.root,
            WorkflowOptions {
                callback: Some(Arc::new(callback)),
                cancel: None,
            },
        )
    }

    pub fn run_with_options(&self, options: WorkflowOptions) -> Result<RunSummary, RdekitError> {
        run_with_options(&self.root, options)
    }

    /// Reads a JSON file relative to the data root.
    pub fn read_json(&self, relative: &str) -> Value {
        let path = self.root.join(relative);
        let text = std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("read {}: {e}", path.display()));
        serde_json::from_str(&text).expect("parse output json")
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.root.join(relative).exists()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Entries of a directory relative to the root, sorted by name; empty
    /// when the directory does not exist.
    pub fn dir_entries(&self, relative: &str) -> Vec<String> {
        let dir = self.root.join(relative);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
