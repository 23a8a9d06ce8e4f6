//! Platform property sources.
//!
//! Services read runtime properties (catalog locations, invoice settings,
//! plugin switches) through [`ConfigSource`]. Keys are dotted, e.g.
//! `invoice.due_days`.
//!
//! # Design Decisions
//! - Sources are read-only from the caller's point of view
//! - `FileProperties` swaps its whole snapshot on reload; readers never see
//!   a half-applied file
//! - `LayeredSource` answers from the first source that knows the key

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

/// Read access to platform properties.
pub trait ConfigSource: Send + Sync {
    /// Value for `key`, if the source has one.
    fn get(&self, key: &str) -> Option<String>;

    /// Short description used in logs.
    fn describe(&self) -> String;
}

/// Errors loading a properties file.
#[derive(Debug, Error)]
pub enum PropertiesError {
    #[error("failed to read properties file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse properties file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Fixed in-memory properties.
#[derive(Debug, Clone, Default)]
pub struct StaticProperties {
    values: HashMap<String, String>,
}

impl StaticProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl FromIterator<(String, String)> for StaticProperties {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl ConfigSource for StaticProperties {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn describe(&self) -> String {
        format!("static({} keys)", self.values.len())
    }
}

/// Properties read from environment variables.
///
/// `invoice.due-days` with prefix `BILLING` reads `BILLING_INVOICE_DUE_DAYS`.
#[derive(Debug, Clone)]
pub struct EnvProperties {
    prefix: String,
}

impl EnvProperties {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable consulted for `key`.
    pub fn variable_name(&self, key: &str) -> String {
        let key: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}_{}", self.prefix.to_ascii_uppercase(), key)
    }
}

impl ConfigSource for EnvProperties {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.variable_name(key)).ok()
    }

    fn describe(&self) -> String {
        format!("env({}_*)", self.prefix.to_ascii_uppercase())
    }
}

/// Properties loaded from a TOML file, reloadable in place.
pub struct FileProperties {
    path: PathBuf,
    snapshot: ArcSwap<HashMap<String, String>>,
}

impl FileProperties {
    /// Load `path`. The file must exist and parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PropertiesError> {
        let path = path.as_ref().to_path_buf();
        let values = read_properties(&path)?;
        tracing::info!(path = %path.display(), keys = values.len(), "Loaded properties file");
        Ok(Self {
            path,
            snapshot: ArcSwap::from_pointee(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file. On failure the previous snapshot stays in place.
    pub fn reload(&self) -> Result<usize, PropertiesError> {
        let values = parse_properties(&self.path, &read_file(&self.path)?)?;
        let count = values.len();
        self.snapshot.store(Arc::new(values));
        Ok(count)
    }

    /// Re-read the file after a change notification.
    ///
    /// Editors often truncate before writing, so a blank file does not
    /// replace a non-empty snapshot here; `Ok(None)` reports the skip.
    pub fn refresh(&self) -> Result<Option<usize>, PropertiesError> {
        let content = read_file(&self.path)?;
        if content.trim().is_empty() && !self.snapshot.load().is_empty() {
            return Ok(None);
        }
        let values = parse_properties(&self.path, &content)?;
        let count = values.len();
        self.snapshot.store(Arc::new(values));
        Ok(Some(count))
    }

    /// Current snapshot of every key.
    pub fn snapshot(&self) -> Arc<HashMap<String, String>> {
        self.snapshot.load_full()
    }
}

impl fmt::Debug for FileProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileProperties")
            .field("path", &self.path)
            .field("keys", &self.snapshot.load().len())
            .finish()
    }
}

impl ConfigSource for FileProperties {
    fn get(&self, key: &str) -> Option<String> {
        self.snapshot.load().get(key).cloned()
    }

    fn describe(&self) -> String {
        format!("file({})", self.path.display())
    }
}

fn read_properties(path: &Path) -> Result<HashMap<String, String>, PropertiesError> {
    parse_properties(path, &read_file(path)?)
}

fn read_file(path: &Path) -> Result<String, PropertiesError> {
    fs::read_to_string(path).map_err(|source| PropertiesError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_properties(path: &Path, content: &str) -> Result<HashMap<String, String>, PropertiesError> {
    let table: toml::Table = toml::from_str(content).map_err(|source| PropertiesError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let mut values = HashMap::new();
    flatten("", &table, &mut values);
    Ok(values)
}

/// Nested tables become dotted keys; arrays are joined with `,`.
fn flatten(prefix: &str, table: &toml::Table, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(nested) => flatten(&key, nested, out),
            other => {
                out.insert(key, scalar(other));
            }
        }
    }
}

fn scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Several sources consulted in order.
#[derive(Default)]
pub struct LayeredSource {
    layers: Vec<Arc<dyn ConfigSource>>,
}

impl LayeredSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lower-priority layer.
    pub fn push(mut self, source: Arc<dyn ConfigSource>) -> Self {
        self.layers.push(source);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl ConfigSource for LayeredSource {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }

    fn describe(&self) -> String {
        let layers: Vec<String> = self.layers.iter().map(|layer| layer.describe()).collect();
        format!("layered[{}]", layers.join(", "))
    }
}
