//! Immutable point-in-time views of configuration.

mod path_ops;

#[cfg(test)]
mod tests;

use std::{fmt, sync::Arc};

use serde::Serialize;
use toml::Value;

use crate::{ConfigError, Result};

pub(crate) use path_ops::set_value_at_path;

/// An immutable view of all configuration values at one instant.
///
/// Values are addressed by dot-separated paths such as `"server.port"`;
/// numeric segments index into arrays (`"hosts.0"`). Every typed lookup
/// returns `None` when the path is absent or holds a value of another kind.
/// Cloning is cheap: the underlying table is shared.
#[derive(Clone, PartialEq)]
pub struct Snapshot {
    root: Arc<Value>,
}

impl Snapshot {
    /// Creates a snapshot from a TOML table.
    pub fn new(table: toml::Table) -> Self {
        Self {
            root: Arc::new(Value::Table(table)),
        }
    }

    /// Creates a snapshot with no values.
    pub fn empty() -> Self {
        Self::new(toml::Table::new())
    }

    /// Parses a snapshot from TOML text.
    ///
    /// # Errors
    /// * `ConfigError::TomlParseError` - If the text is not a valid TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table =
            toml::from_str(content).map_err(|e| ConfigError::toml_parse(e, "string"))?;

        Ok(Self::new(table))
    }

    /// Creates a snapshot from any value that serializes to a TOML table.
    ///
    /// # Errors
    /// * `ConfigError::TomlParseError` - If the value does not serialize to a table
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        match Value::try_from(value) {
            Ok(Value::Table(table)) => Ok(Self::new(table)),
            Ok(other) => Err(ConfigError::toml_parse(
                format!("expected a table, found {}", other.type_str()),
                "serialized value",
            )),
            Err(e) => Err(ConfigError::toml_parse(e, "serialized value")),
        }
    }

    /// Returns the raw TOML value at `path`, if present.
    pub fn get(&self, path: &str) -> Option<&Value> {
        path_ops::navigate_path(&self.root, path).ok()
    }

    /// Returns `true` if any value exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Looks up a string value.
    pub fn string(&self, path: &str) -> Option<String> {
        self.get(path)?.as_str().map(str::to_owned)
    }

    /// Looks up an integer value.
    pub fn int(&self, path: &str) -> Option<i64> {
        self.get(path)?.as_integer()
    }

    /// Looks up a floating-point value.
    pub fn double(&self, path: &str) -> Option<f64> {
        self.get(path)?.as_float()
    }

    /// Looks up a boolean value.
    pub fn bool(&self, path: &str) -> Option<bool> {
        self.get(path)?.as_bool()
    }

    /// Looks up an array whose elements are all strings.
    pub fn string_array(&self, path: &str) -> Option<Vec<String>> {
        self.get(path)?
            .as_array()?
            .iter()
            .map(|item| item.as_str().map(str::to_owned))
            .collect()
    }

    /// Returns the snapshot contents as a TOML value.
    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<toml::Table> for Snapshot {
    fn from(table: toml::Table) -> Self {
        Self::new(table)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Snapshot").field(&self.root).finish()
    }
}
