use std::path::Path;

use serde_json::{Map, Value};

use crate::error::JsonFileError;
use crate::fileops;

/// Nested invoice mapping with top-level `basic`, `custom`, `sample` and
/// `datasetId` entries.
///
/// Instances are deep-cloned before per-tile mutation so the base invoice
/// survives intact across tiles; `Clone` on the underlying tree is exactly
/// that deep copy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceDocument {
    root: Map<String, Value>,
}

impl InvoiceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(root) => Some(Self { root }),
            _ => None,
        }
    }

    pub fn load(path: &Path) -> Result<Self, JsonFileError> {
        let value = fileops::read_json(path)?;
        Self::from_value(value).ok_or_else(|| JsonFileError::Parse {
            path: path.to_path_buf(),
            line: 1,
            column: 1,
            message: "invoice root must be a JSON object".to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), JsonFileError> {
        fileops::write_json(path, &Value::Object(self.root.clone()))
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.root.get(name).and_then(Value::as_object)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Map<String, Value>> {
        self.root.get_mut(name).and_then(Value::as_object_mut)
    }

    /// Returns the named section, inserting an empty object when absent.
    pub fn ensure_section(&mut self, name: &str) -> &mut Map<String, Value> {
        if !self.root.get(name).is_some_and(Value::is_object) {
            self.root
                .insert(name.to_string(), Value::Object(Map::new()));
        }
        self.root
            .get_mut(name)
            .and_then(Value::as_object_mut)
            .expect("section inserted above")
    }

    pub fn field(&self, section: &str, name: &str) -> Option<&Value> {
        self.section(section)?.get(name)
    }

    pub fn set_field(&mut self, section: &str, name: &str, value: Value) {
        self.ensure_section(section).insert(name.to_string(), value);
    }

    pub fn remove_field(&mut self, section: &str, name: &str) -> Option<Value> {
        self.section_mut(section)?.remove(name)
    }

    pub fn dataset_id(&self) -> Option<&Value> {
        self.root.get("datasetId")
    }

    pub fn data_name(&self) -> Option<&str> {
        self.field("basic", "dataName").and_then(Value::as_str)
    }

    pub fn set_data_name(&mut self, name: &str) {
        self.set_field("basic", "dataName", Value::String(name.to_string()));
    }

    pub fn description(&self) -> Option<&str> {
        self.field("basic", "description").and_then(Value::as_str)
    }

    pub fn sample_owner_id(&self) -> Option<Value> {
        self.field("sample", "ownerId").cloned()
    }

    pub fn set_sample_owner_id(&mut self, value: Value) {
        self.set_field("sample", "ownerId", value);
    }

    /// Moves `sample.sampleId` to the front of the sample object, keeping
    /// the remaining keys in their current order.
    pub fn reorder_sample_id_first(&mut self) {
        let Some(sample) = self.section_mut("sample") else {
            return;
        };
        let Some(sample_id) = sample.remove("sampleId") else {
            return;
        };

        let mut reordered = Map::new();
        reordered.insert("sampleId".to_string(), sample_id);
        for (key, value) in std::mem::take(sample) {
            reordered.insert(key, value);
        }
        *sample = reordered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> InvoiceDocument {
        InvoiceDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(InvoiceDocument::from_value(json!([1, 2])).is_none());
        assert!(InvoiceDocument::from_value(json!({"basic": {}})).is_some());
    }

    #[test]
    fn test_field_access_and_mutation() {
        let mut invoice = doc(json!({"basic": {"dataName": "run-1"}}));

        assert_eq!(invoice.data_name(), Some("run-1"));
        invoice.set_data_name("run-2");
        assert_eq!(invoice.data_name(), Some("run-2"));

        invoice.set_field("custom", "temperature", json!(273));
        assert_eq!(invoice.field("custom", "temperature"), Some(&json!(273)));

        invoice.remove_field("basic", "dataName");
        assert!(invoice.data_name().is_none());
    }

    #[test]
    fn test_clone_is_deep() {
        let base = doc(json!({"sample": {"ownerId": "owner-7"}}));
        let mut tile_copy = base.clone();
        tile_copy.set_field("sample", "ownerId", json!("changed"));

        assert_eq!(base.sample_owner_id(), Some(json!("owner-7")));
        assert_eq!(tile_copy.sample_owner_id(), Some(json!("changed")));
    }

    #[test]
    fn test_reorder_sample_id_first() {
        let mut invoice = doc(json!({
            "sample": {"names": ["s1"], "composition": "x", "sampleId": "id-1"}
        }));
        invoice.reorder_sample_id_first();

        let keys: Vec<_> = invoice.section("sample").unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["sampleId", "names", "composition"]);
    }

    #[test]
    fn test_ensure_section_replaces_non_object() {
        let mut invoice = doc(json!({"basic": "oops"}));
        invoice.ensure_section("basic").insert("dataName".into(), json!("x"));
        assert_eq!(invoice.data_name(), Some("x"));
    }
}
