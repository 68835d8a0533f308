//! Project configuration handling for kiln.
//! Loads the answers produced by the prompt layer, validates them against a
//! JSON schema and sanitizes them before composition.

use crate::constants::{CUSTOM_PREFIX, KNOWN_FIELDS, LIST_FIELDS, NONE_VALUE};
use crate::error::{Error, Result};
use cruet::Inflector;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// JSON schema the default validator checks configurations against
pub const DEFAULT_SCHEMA: &str = include_str!("../schema/project-config.schema.json");

/// Flat mapping of answers describing the project to set up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectConfig {
    fields: Map<String, Value>,
}

impl ProjectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::ConfigError(format!(
                "expected a mapping of answers, found {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Parses configuration content, trying JSON first and YAML second.
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(_) => serde_yaml::from_str(content).map_err(|e| {
                Error::ConfigError(format!("Invalid configuration format: {e}"))
            })?,
        };
        Self::from_value(value)
    }

    /// Reads and parses a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::ConfigError(format!(
                "Invalid configuration path: {}",
                path.display()
            )));
        }
        debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Builder-style setter, mostly useful in tests and embedding code.
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn set<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns a non-blank string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
    }

    /// Returns the string items of a list field, ignoring anything else.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        match self.fields.get(key) {
            Some(Value::Array(items)) => {
                items.iter().filter_map(Value::as_str).map(str::to_string).collect()
            }
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Returns a selection field, treating `none` the same as an absent value.
    pub fn selection(&self, key: &str) -> Option<&str> {
        self.get_str(key).filter(|v| !v.eq_ignore_ascii_case(NONE_VALUE))
    }

    pub fn project_name(&self) -> Option<&str> {
        self.get_str("projectName")
    }

    pub fn project_type(&self) -> Option<&str> {
        self.get_str("projectType")
    }

    pub fn language(&self) -> Option<&str> {
        self.get_str("language")
    }

    pub fn features(&self) -> Vec<String> {
        self.get_list("features")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Free-form override fields as `(render context key, value)` pairs.
    pub fn custom_overrides(&self) -> Vec<(String, Value)> {
        self.fields
            .iter()
            .filter_map(|(key, value)| override_key(key).map(|k| (k, value.clone())))
            .collect()
    }

    /// Drops null fields, trims strings and coerces list fields to lists.
    pub fn sanitized(self) -> Self {
        let fields = self
            .fields
            .into_iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| {
                let value = if LIST_FIELDS.contains(&key.as_str()) {
                    coerce_list(value)
                } else {
                    trim_value(value)
                };
                (key, value)
            })
            .collect();
        Self { fields }
    }
}

/// Maps `customTestingStrategy` / `custom-testing-strategy` to `testingStrategy`.
pub fn override_key(field: &str) -> Option<String> {
    let rest = field.strip_prefix(CUSTOM_PREFIX)?;
    let rest = rest.trim_start_matches(['-', '_']);
    if rest.is_empty() {
        return None;
    }
    // `customer` is not an override, `customFoo` and `custom-foo` are.
    let separated = field.len() - rest.len() > CUSTOM_PREFIX.len();
    if !separated && !rest.starts_with(|c: char| c.is_ascii_uppercase()) {
        return None;
    }
    Some(rest.to_camel_case())
}

fn trim_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}

fn coerce_list(value: Value) -> Value {
    let items = match value {
        Value::Array(items) => items
            .into_iter()
            .filter(|item| !item.is_null())
            .map(trim_value)
            .filter(|item| item.as_str().map_or(true, |s| !s.is_empty()))
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
        other => vec![other],
    };
    Value::Array(items)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Outcome of validating a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validation and sanitation contract the composition pipeline relies on.
pub trait ConfigValidator {
    fn validate(&self, config: &ProjectConfig) -> ValidationReport;

    fn sanitize(&self, config: ProjectConfig) -> ProjectConfig {
        config.sanitized()
    }
}

/// Validates configurations against a JSON schema.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    schema: Value,
}

impl SchemaValidator {
    /// Creates a validator using the embedded project configuration schema.
    pub fn new() -> Self {
        // The embedded schema is part of the crate and parsed in tests.
        let schema = serde_json::from_str(DEFAULT_SCHEMA).unwrap_or(Value::Bool(true));
        Self { schema }
    }

    pub fn from_schema(schema: Value) -> Self {
        Self { schema }
    }

    /// Loads a schema from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let schema = serde_json::from_str(&content).map_err(|e| {
            Error::ConfigError(format!("Invalid schema '{}': {e}", path.display()))
        })?;
        Ok(Self { schema })
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        SchemaValidator::new()
    }
}

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &ProjectConfig) -> ValidationReport {
        let instance = config.to_value();
        let errors: Vec<String> = match jsonschema::validator_for(&self.schema) {
            Ok(validator) => validator.iter_errors(&instance).map(|e| e.to_string()).collect(),
            Err(e) => vec![format!("configuration schema is invalid: {e}")],
        };

        let warnings = config
            .fields()
            .keys()
            .filter(|key| !KNOWN_FIELDS.contains(&key.as_str()) && override_key(key).is_none())
            .map(|key| format!("Unrecognized field '{key}' is passed through unchanged"))
            .collect();

        ValidationReport { is_valid: errors.is_empty(), errors, warnings }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_schema_is_valid_json() {
        let schema: Value = serde_json::from_str(DEFAULT_SCHEMA).unwrap();
        assert_eq!(schema["type"], json!("object"));
    }

    #[test]
    fn test_override_key() {
        assert_eq!(override_key("customTestingStrategy").as_deref(), Some("testingStrategy"));
        assert_eq!(override_key("custom-file-structure").as_deref(), Some("fileStructure"));
        assert_eq!(override_key("custom_notes").as_deref(), Some("notes"));
        assert_eq!(override_key("customer"), None);
        assert_eq!(override_key("custom"), None);
        assert_eq!(override_key("stack"), None);
    }
}
