use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The configuration recognized by the structuring run, merged from
/// `rdeconfig.yaml` / `rdeconfig.yml` or `pyproject.toml [tool.rdetoolkit]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system: SystemSettings,
    #[serde(default)]
    pub multidata_tile: MultiDataTileSettings,
    #[serde(default)]
    pub smarttable: SmartTableSettings,
    #[serde(default)]
    pub traceback: TracebackSettings,
}

impl Config {
    /// Field-localized validation run after deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.extended_mode()?;

        if self.multidata_tile.divided_dir_digit == 0 {
            return Err(ConfigError::Validation {
                field: "multidata_tile.divided_dir_digit".to_string(),
                message: "zero-pad width must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Case-sensitive match on the documented literals; any other value is
    /// a configuration error naming the allowed values.
    pub fn extended_mode(&self) -> Result<Option<ExtendedMode>, ConfigError> {
        match self.system.extended_mode.as_deref() {
            None => Ok(None),
            Some("rdeformat") => Ok(Some(ExtendedMode::RdeFormat)),
            Some("MultiDataTile") => Ok(Some(ExtendedMode::MultiDataTile)),
            Some(other) => Err(ConfigError::Validation {
                field: "system.extended_mode".to_string(),
                message: format!(
                    "invalid value \"{other}\"; valid options are: [\"rdeformat\", \"MultiDataTile\"]"
                ),
            }),
        }
    }
}

/// Validated `system.extended_mode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedMode {
    RdeFormat,
    MultiDataTile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
    /// `"rdeformat"`, `"MultiDataTile"`, or absent.
    #[serde(default)]
    pub extended_mode: Option<String>,
    #[serde(default)]
    pub save_raw: bool,
    #[serde(default = "default_true")]
    pub save_nonshared_raw: bool,
    #[serde(default)]
    pub save_thumbnail_image: bool,
    #[serde(default)]
    pub magic_variable: bool,
    #[serde(default)]
    pub save_invoice_to_structured: bool,
    #[serde(default = "default_true")]
    pub feature_description: bool,
}

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            extended_mode: None,
            save_raw: false,
            save_nonshared_raw: true,
            save_thumbnail_image: false,
            magic_variable: false,
            save_invoice_to_structured: false,
            feature_description: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiDataTileSettings {
    #[serde(default)]
    pub ignore_errors: bool,
    #[serde(default = "default_divided_dir_digit")]
    pub divided_dir_digit: usize,
    #[serde(default)]
    pub divided_dir_start_number: usize,
}

impl Default for MultiDataTileSettings {
    fn default() -> Self {
        Self {
            ignore_errors: false,
            divided_dir_digit: default_divided_dir_digit(),
            divided_dir_start_number: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartTableSettings {
    /// Retain the original `smarttable_*` descriptor in `raw/`.
    #[serde(default)]
    pub save_table_file: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracebackSettings {
    #[serde(default)]
    pub format: TracebackFormat,
}

/// Rendering of failure chains in the per-run log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracebackFormat {
    Compact,
    Full,
    #[default]
    Duplex,
}

fn default_true() -> bool {
    true
}

fn default_divided_dir_digit() -> usize {
    4
}
