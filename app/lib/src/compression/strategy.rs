//! Backend kinds and named compression strategies.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::compression::FilterPipeline;
use crate::error::{ConvertError, Result};

/// Physical output family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Delimited text (CSV).
    Flat,
    /// Structured file holding one columnar compound dataset.
    Columnar,
    /// Structured file holding one appendable row table.
    Table,
}

impl BackendKind {
    /// All backends in output order.
    pub const ALL: [BackendKind; 3] = [BackendKind::Flat, BackendKind::Columnar, BackendKind::Table];

    /// Get the lowercase name of the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Flat => "flat",
            BackendKind::Columnar => "columnar",
            BackendKind::Table => "table",
        }
    }

    /// Tag inserted between the source stem and the strategy label.
    pub fn tag(&self) -> &'static str {
        match self {
            BackendKind::Flat => "",
            BackendKind::Columnar => "-columnar-",
            BackendKind::Table => "-table-",
        }
    }

    /// File extension of the output, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            BackendKind::Flat => "csv",
            BackendKind::Columnar | BackendKind::Table => "hdf5",
        }
    }

    /// Whether the format has a compression dimension at all.
    pub fn compresses(&self) -> bool {
        !matches!(self, BackendKind::Flat)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "flat" | "flat-table" | "csv" => Ok(BackendKind::Flat),
            "columnar" | "columnar-file" | "h5py" => Ok(BackendKind::Columnar),
            "table" | "row-table" | "row-table-file" | "pytables" => Ok(BackendKind::Table),
            _ => Err(ConvertError::Config {
                message: format!("unknown backend: {} (expected flat, columnar or table)", s),
            }),
        }
    }
}

/// A strategy parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag
    Bool(bool),
    /// Integer option
    Int(i64),
    /// Text option
    Text(String),
}

impl ParamValue {
    /// Get the value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{}", b),
            ParamValue::Int(i) => write!(f, "{}", i),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

/// A named, backend-scoped compression configuration.
///
/// # Examples
///
/// ```
/// use accel_convert::{BackendKind, CompressionStrategy};
///
/// let strategy = CompressionStrategy::new("gzip", "gzip", [BackendKind::Columnar])
///     .with_param("filter", "deflate")
///     .with_param("level", 4);
///
/// assert!(strategy.supports(BackendKind::Columnar));
/// assert!(!strategy.supports(BackendKind::Table));
/// assert!(!strategy.pipeline().unwrap().is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStrategy {
    name: String,
    label: String,
    backends: BTreeSet<BackendKind>,
    #[serde(default)]
    parameters: BTreeMap<String, ParamValue>,
}

impl CompressionStrategy {
    /// Create a strategy without parameters.
    pub fn new<N, L, B>(name: N, label: L, backends: B) -> Self
    where
        N: Into<String>,
        L: Into<String>,
        B: IntoIterator<Item = BackendKind>,
    {
        Self {
            name: name.into(),
            label: label.into(),
            backends: backends.into_iter().collect(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add or replace a parameter.
    pub fn with_param<K: Into<String>, V: Into<ParamValue>>(mut self, key: K, value: V) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Lookup key, e.g. `blosc:lz4`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable, filename-safe label, e.g. `blosc-lz4`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Backends this strategy is valid for.
    pub fn backends(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.backends.iter().copied()
    }

    /// Check whether the strategy may be used with `backend`.
    pub fn supports(&self, backend: BackendKind) -> bool {
        self.backends.contains(&backend)
    }

    /// All parameters, ordered by name.
    pub fn parameters(&self) -> &BTreeMap<String, ParamValue> {
        &self.parameters
    }

    /// Get one parameter.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    /// Compile the parameters into a typed filter pipeline.
    pub fn pipeline(&self) -> Result<FilterPipeline> {
        FilterPipeline::from_parameters(&self.name, &self.parameters)
    }
}

impl fmt::Display for CompressionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, " ({})", params.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("flat".parse::<BackendKind>().unwrap(), BackendKind::Flat);
        assert_eq!("CSV".parse::<BackendKind>().unwrap(), BackendKind::Flat);
        assert_eq!("columnar".parse::<BackendKind>().unwrap(), BackendKind::Columnar);
        assert_eq!("row-table".parse::<BackendKind>().unwrap(), BackendKind::Table);
        assert!("parquet".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_naming_parts() {
        assert_eq!(BackendKind::Flat.extension(), "csv");
        assert_eq!(BackendKind::Table.extension(), "hdf5");
        assert_ne!(BackendKind::Columnar.tag(), BackendKind::Table.tag());
        assert!(!BackendKind::Flat.compresses());
    }

    #[test]
    fn test_strategy_display() {
        let strategy = CompressionStrategy::new("zlib", "zlib", [BackendKind::Table])
            .with_param("filter", "deflate")
            .with_param("level", 9);
        assert_eq!(strategy.to_string(), "zlib (filter=deflate, level=9)");
    }

    #[test]
    fn test_strategy_json() {
        let json = r#"{
            "name": "gzip-1",
            "label": "gzip-1",
            "backends": ["columnar"],
            "parameters": {"filter": "deflate", "level": 1, "shuffle": true}
        }"#;
        let strategy: CompressionStrategy = serde_json::from_str(json).unwrap();
        assert_eq!(strategy.param("level"), Some(&ParamValue::Int(1)));
        assert_eq!(strategy.param("shuffle"), Some(&ParamValue::Bool(true)));
        assert_eq!(strategy.param("filter").and_then(ParamValue::as_text), Some("deflate"));
        assert!(strategy.supports(BackendKind::Columnar));
    }

    #[test]
    fn test_strategy_json_without_parameters() {
        let strategy: CompressionStrategy =
            serde_json::from_str(r#"{"name": "raw", "label": "raw", "backends": ["table"]}"#).unwrap();
        assert!(strategy.parameters().is_empty());
        assert!(strategy.pipeline().unwrap().is_empty());
    }
}
