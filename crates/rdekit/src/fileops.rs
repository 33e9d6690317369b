//! JSON file helpers carrying path context on every failure.

use std::path::Path;

use serde_json::Value;

use crate::error::JsonFileError;

pub fn read_json(path: &Path) -> Result<Value, JsonFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| JsonFileError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&content).map_err(|e| JsonFileError::Parse {
        path: path.to_path_buf(),
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    })
}

/// Writes pretty-printed JSON, creating parent directories as needed.
pub fn write_json(path: &Path, value: &Value) -> Result<(), JsonFileError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| JsonFileError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let mut text = serde_json::to_string_pretty(value).map_err(|e| JsonFileError::Parse {
        path: path.to_path_buf(),
        line: 0,
        column: 0,
        message: e.to_string(),
    })?;
    text.push('\n');

    std::fs::write(path, text).map_err(|e| JsonFileError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
