//! Shared YAML/JSON loading.
//!
//! All configuration loaders go through these helpers so that a missing
//! file, an I/O failure and a parse failure are reported the same way,
//! always with the path attached.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{PackError, PackResult};

fn read_file(path: &Path) -> PackResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PackError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PackError::Io(e)
        }
    })
}

/// Load a YAML file into a strongly-typed struct.
pub fn load_yaml_typed<T: DeserializeOwned>(path: &Path) -> PackResult<T> {
    let content = read_file(path)?;
    serde_yaml::from_str(&content).map_err(|e| PackError::YamlParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a JSON file into a strongly-typed struct.
pub fn load_json_typed<T: DeserializeOwned>(path: &Path) -> PackResult<T> {
    let content = read_file(path)?;
    serde_json::from_str(&content).map_err(|e| PackError::JsonParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load a YAML or JSON file, choosing the format by extension.
pub fn load_typed<T: DeserializeOwned>(path: &Path) -> PackResult<T> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => load_json_typed(path),
        _ => load_yaml_typed(path),
    }
}
