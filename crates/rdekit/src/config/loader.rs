use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

/// Recognized configuration file names, in search-priority order.
const CONFIG_FILES: [&str; 3] = ["rdeconfig.yaml", "rdeconfig.yml", "pyproject.toml"];

/// Loads the run configuration from the `tasksupport` directory.
///
/// The first recognized file found wins. A missing directory or the absence
/// of any config file yields the defaults; a file that exists but fails to
/// parse or validate is always an error.
pub fn load_config(tasksupport: &Path) -> Result<Config, ConfigError> {
    if !tasksupport.is_dir() {
        return Ok(Config::default());
    }

    for name in CONFIG_FILES {
        let candidate = tasksupport.join(name);
        if candidate.is_file() {
            return parse_config_file(&candidate);
        }
    }

    Ok(Config::default())
}

/// Parses a single configuration file, dispatching on its extension.
pub fn parse_config_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let config = match extension.as_str() {
        "yaml" | "yml" => parse_yaml(path, &content)?,
        "toml" => parse_pyproject(path, &content)?,
        _ => {
            return Err(ConfigError::Validation {
                field: "config file".to_string(),
                message: format!("unrecognized config file name: '{}'", path.display()),
            })
        }
    };

    config.validate()?;
    Ok(config)
}

fn parse_yaml(path: &Path, content: &str) -> Result<Config, ConfigError> {
    serde_yaml::from_str(content).map_err(|e| {
        let location = e.location();
        ConfigError::ParseYaml {
            path: path.to_path_buf(),
            line: location.as_ref().map(|l| l.line()),
            column: location.as_ref().map(|l| l.column()),
            message: e.to_string(),
        }
    })
}

/// Reads the `[tool.rdetoolkit]` table of a `pyproject.toml`. A pyproject
/// without that table is an empty configuration, not an error.
fn parse_pyproject(path: &Path, content: &str) -> Result<Config, ConfigError> {
    let document: toml::Value = toml::from_str(content).map_err(|e| ConfigError::ParseToml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let Some(table) = document.get("tool").and_then(|t| t.get("rdetoolkit")) else {
        return Ok(Config::default());
    };

    table
        .clone()
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::ParseToml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}
