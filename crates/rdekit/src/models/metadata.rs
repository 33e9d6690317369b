use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonFileError;
use crate::fileops;

/// Upper bound on the serialized length of any single metadata value, in
/// bytes of its string form.
pub const MAX_VALUE_SIZE: usize = 1024;

/// A metadata value with its optional unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaValue {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl MetaValue {
    pub fn new(value: Value) -> Self {
        Self { value, unit: None }
    }

    pub fn with_unit(value: Value, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: Some(unit.into()),
        }
    }

    /// String form of the value, as it would be transcribed into a
    /// description line.
    pub fn value_string(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// `metadata.json`: measurement-wide constants plus an array of per-
/// measurement variable sets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    #[serde(default)]
    pub constant: BTreeMap<String, MetaValue>,
    #[serde(default)]
    pub variable: Vec<BTreeMap<String, MetaValue>>,
}

impl MetadataDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, JsonFileError> {
        let value = fileops::read_json(path)?;
        serde_json::from_value(value).map_err(|e| JsonFileError::Parse {
            path: path.to_path_buf(),
            line: 0,
            column: 0,
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), JsonFileError> {
        let value = serde_json::to_value(self).map_err(|e| JsonFileError::Parse {
            path: path.to_path_buf(),
            line: 0,
            column: 0,
            message: e.to_string(),
        })?;
        fileops::write_json(path, &value)
    }

    pub fn insert_constant(&mut self, key: impl Into<String>, value: MetaValue) {
        self.constant.insert(key.into(), value);
    }

    pub fn constant_value(&self, key: &str) -> Option<&MetaValue> {
        self.constant.get(key)
    }

    /// All values recorded for `key` across the variable sets, in order.
    pub fn variable_values(&self, key: &str) -> Vec<&MetaValue> {
        self.variable.iter().filter_map(|set| set.get(key)).collect()
    }
}
