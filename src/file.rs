//! Loading layer, project and adapter-shape files.
//!
//! The format is picked from the file extension: `.yml`/`.yaml` (the default
//! for anything else too, since YAML also reads JSON), `.toml` and `.json`.
//! Every file must hold a mapping at the top level; an empty file is an empty
//! mapping.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::NodefigError;
use crate::types::ConfigMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => Format::Toml,
            Some("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

/// Parse file content into a mapping. `path` is only used in errors.
pub fn parse_mapping(content: &str, format: Format, path: &Path) -> Result<ConfigMap, NodefigError> {
    let parse_error = |reason: String| NodefigError::ParseError {
        path: path.to_path_buf(),
        reason,
    };
    let value: Value = match format {
        Format::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?,
    };
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(ConfigMap::new()),
        _ => Err(NodefigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// Read and parse one file.
pub fn load_mapping(path: &Path) -> Result<ConfigMap, NodefigError> {
    let content = std::fs::read_to_string(path).map_err(|e| NodefigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mapping = parse_mapping(&content, Format::from_path(path), path)?;
    tracing::debug!(path = %path.display(), keys = mapping.len(), "loaded file");
    Ok(mapping)
}

/// Read several files, keeping their order.
pub fn load_mappings(paths: &[PathBuf]) -> Result<Vec<ConfigMap>, NodefigError> {
    paths.iter().map(|path| load_mapping(path)).collect()
}
