use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::fileops;

#[derive(Debug, Clone, Deserialize)]
pub struct NameField {
    pub ja: String,
    pub en: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaField {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub format: Option<String>,
}

/// One entry of `metadata-def.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct MetadataDefEntry {
    pub name: NameField,
    #[serde(rename = "schema")]
    pub schema_field: SchemaField,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Feature-flagged entries are transcribed into the invoice description.
    #[serde(default, rename = "_feature")]
    pub feature: bool,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

/// Parsed `metadata-def.json`, with entry order preserved for
/// deterministic description transcription.
#[derive(Debug, Clone, Default)]
pub struct MetadataDefinition {
    entries: Vec<(String, MetadataDefEntry)>,
}

impl MetadataDefinition {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let value = fileops::read_json(path)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let Some(map) = value.as_object() else {
            return Err(ConfigError::Validation {
                field: "$".to_string(),
                message: "metadata-def root must be a JSON object".to_string(),
            });
        };

        let mut entries = Vec::with_capacity(map.len());
        for (key, raw) in map {
            let entry: MetadataDefEntry =
                serde_json::from_value(raw.clone()).map_err(|e| ConfigError::Validation {
                    field: key.clone(),
                    message: e.to_string(),
                })?;
            entries.push((key.clone(), entry));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&MetadataDefEntry> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetadataDefEntry)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn feature_entries(&self) -> impl Iterator<Item = (&str, &MetadataDefEntry)> {
        self.iter().filter(|(_, entry)| entry.feature)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
