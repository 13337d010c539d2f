//! Loading of YAML configuration files.
//!
//! Configuration files are read into a [`serde_yaml::Value`], optionally
//! deep-merged with overrides, and deserialized into typed structs. A missing
//! or mistyped key is reported as [`CampusError::Config`].
use crate::error::CampusError;
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_yaml::Value;
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Output directories of training runs.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Directories {
    /// Root of metrics, reports and intermediate checkpoints.
    pub results_directory: PathBuf,

    /// Root of the final model parameters.
    pub model_directory: PathBuf,
}

impl Default for Directories {
    fn default() -> Self {
        Self {
            results_directory: PathBuf::from("results"),
            model_directory: PathBuf::from("models"),
        }
    }
}

/// Configuration shared by every agent.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct SharedConfig {
    /// Output directories.
    pub directories: Directories,
}

impl SharedConfig {
    /// Sets the results directory.
    pub fn results_directory(mut self, v: impl Into<PathBuf>) -> Self {
        self.directories.results_directory = v.into();
        self
    }

    /// Sets the model directory.
    pub fn model_directory(mut self, v: impl Into<PathBuf>) -> Self {
        self.directories.model_directory = v.into();
        self
    }

    /// Loads the configuration from a YAML file, applying `overrides`.
    pub fn load(path: impl AsRef<Path>, overrides: Option<&Value>) -> Result<Self> {
        let mut value = load_value(path)?;
        if let Some(overrides) = overrides {
            merge(&mut value, overrides.clone());
        }
        from_value(value)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Reads a YAML file into a generic value.
pub fn load_value(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        CampusError::Config(format!("Failed to open {}: {}", path.display(), e))
    })?;
    let rdr = BufReader::new(file);
    let value = serde_yaml::from_reader(rdr)
        .map_err(|e| CampusError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(value)
}

/// Deep-merges `overrides` into `base`.
///
/// Mappings are merged key by key; any other value in `overrides` replaces
/// the corresponding value of `base`.
pub fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Mapping(base), Value::Mapping(overrides)) => {
            for (k, v) in overrides {
                match base.get_mut(&k) {
                    Some(b) => merge(b, v),
                    None => {
                        base.insert(k, v);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

/// Deserializes a typed configuration from a generic value.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_yaml::from_value(value).map_err(|e| CampusError::Config(e.to_string()))?)
}

/// Loads the mapping under `section` of a YAML file as a typed configuration.
///
/// `overrides` is merged into the whole document, so it has the same layout
/// as the file, e.g. `{agent: {max_episodes: 10}}`.
pub fn load_section<T: DeserializeOwned>(
    path: impl AsRef<Path>,
    section: &str,
    overrides: Option<&Value>,
) -> Result<T> {
    let mut value = load_value(path)?;
    if let Some(overrides) = overrides {
        merge(&mut value, overrides.clone());
    }
    let section_value = match &value {
        Value::Mapping(m) => m.get(&Value::String(section.to_string())).cloned(),
        _ => None,
    }
    .ok_or_else(|| CampusError::Config(format!("Missing section: {}", section)))?;
    from_value(section_value)
}
