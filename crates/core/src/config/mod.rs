use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Result, SyncError};

/// Location the published timelines are served from by default.
pub const DEFAULT_DATA_URL: &str = "https://bauersimon.github.io/critrolehue/data/v1/c3/";
/// Configuration key holding the [`RunSettings`] defaults.
pub const RUN_SETTINGS_KEY: &str = "run";

/// Parameters of a single synchronization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Seconds to wait between two polls of the timestamp source.
    pub poll_delay_seconds: f64,
    /// Seconds a light takes to transition into a new state.
    pub transition_seconds: f64,
    /// Seconds added to the wall clock to line it up with the video.
    pub offset_seconds: f64,
    /// Base URL the timeline documents are fetched from.
    pub data_url: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            poll_delay_seconds: 1.0,
            transition_seconds: 10.0,
            offset_seconds: 0.0,
            data_url: DEFAULT_DATA_URL.to_string(),
        }
    }
}

/// Hierarchical key/value store addressed by dot-separated key paths.
///
/// `lights.abc.index` addresses `{"lights": {"abc": {"index": ...}}}`. The
/// store is backed by a JSON file when opened from a path and lives purely in
/// memory otherwise. Changes only reach the disk on [`ConfigStore::save`].
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    root: Map<String, Value>,
    path: Option<PathBuf>,
}

impl ConfigStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the store at `path`, creating an empty file if none exists yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            let store = Self {
                root: Map::new(),
                path: Some(path),
            };
            store.save()?;
            return Ok(store);
        }

        let data = std::fs::read(&path)?;
        let root = match serde_json::from_slice::<Value>(&data) {
            Ok(Value::Object(root)) => root,
            Ok(_) => {
                return Err(SyncError::Config(format!(
                    "{} does not hold a JSON object",
                    path.display()
                )))
            }
            Err(err) => {
                return Err(SyncError::Config(format!("{}: {err}", path.display())));
            }
        };

        Ok(Self {
            root,
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Reads a non-negative integer. Integral floats and numbers stored as
    /// strings are accepted.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(number) => number.as_u64().or_else(|| {
                number
                    .as_f64()
                    .filter(|value| value.fract() == 0.0 && *value >= 0.0)
                    .map(|value| value as u64)
            }),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Names of the entries directly below `key`.
    pub fn children(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Stores `value` at `key`, replacing any non-object value on the way.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|err| SyncError::Config(format!("cannot store `{key}`: {err}")))?;

        let (parents, leaf) = split_key(key)?;
        let mut current = &mut self.root;
        for part in parents {
            let entry = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = entry
                .as_object_mut()
                .ok_or_else(|| SyncError::Config(format!("cannot store `{key}`")))?;
        }
        current.insert(leaf.to_string(), value);
        Ok(())
    }

    /// Removes `key` and everything below it. Returns whether anything was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        let Ok((parents, leaf)) = split_key(key) else {
            return false;
        };

        let mut current = &mut self.root;
        for part in parents {
            match current.get_mut(part) {
                Some(Value::Object(object)) => current = object,
                _ => return false,
            }
        }
        current.remove(leaf).is_some()
    }

    /// Run settings stored under `run`, with defaults for anything missing.
    pub fn run_settings(&self) -> Result<RunSettings> {
        match self.get(RUN_SETTINGS_KEY) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|err| SyncError::Config(format!("`{RUN_SETTINGS_KEY}`: {err}"))),
            None => Ok(RunSettings::default()),
        }
    }

    /// Writes the store back to its file. In-memory stores ignore this.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let data = serde_json::to_vec_pretty(&self.root)
            .map_err(|err| SyncError::Config(err.to_string()))?;
        std::fs::write(path, data)?;
        tracing::debug!(path = %path.display(), "saved configuration");
        Ok(())
    }
}

fn split_key(key: &str) -> Result<(Vec<&str>, &str)> {
    let mut parts: Vec<&str> = key.split('.').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(SyncError::Config(format!("invalid key path `{key}`")));
    }
    let leaf = parts.pop().unwrap_or_default();
    Ok((parts, leaf))
}
