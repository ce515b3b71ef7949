//! Decode parameters (`/DecodeParms`) passed to filters at `begin_decode`.

use crate::error::{PdfError, Result};
use std::collections::HashMap;

/// A single decode parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Int(i64),
    Bool(bool),
    Name(String),
}

/// Read-only key/value lookup of decode parameters.
///
/// Filters only read from it; the mapping is owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeParms {
    entries: HashMap<String, ParamValue>,
}

impl DecodeParms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.entries.insert(key.into(), value);
        self
    }

    pub fn with_int(self, key: impl Into<String>, value: i64) -> Self {
        self.with(key, ParamValue::Int(value))
    }

    pub fn with_name(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.with(key, ParamValue::Name(value.into()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Integer value of `key`, or `default` when absent.
    ///
    /// Booleans are accepted as 0/1 since some writers emit
    /// `/EarlyChange false`.
    pub fn int_or(&self, key: &str, default: i64) -> Result<i64> {
        match self.entries.get(key) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v),
            Some(ParamValue::Bool(b)) => Ok(i64::from(*b)),
            Some(other) => Err(PdfError::config(format!(
                "decode parameter {key} must be an integer, got {other:?}"
            ))),
        }
    }

    pub fn name(&self, key: &str) -> Result<Option<&str>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(ParamValue::Name(n)) => Ok(Some(n.as_str())),
            Some(other) => Err(PdfError::config(format!(
                "decode parameter {key} must be a name, got {other:?}"
            ))),
        }
    }

    /// Parse a `Key=Value` pair as given on a command line.
    ///
    /// Integers and `true`/`false` are typed; anything else becomes a name,
    /// with an optional leading `/` stripped.
    pub fn parse_pair(pair: &str) -> Result<(String, ParamValue)> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| PdfError::config(format!("expected Key=Value, got {pair:?}")))?;
        let key = key.trim().trim_start_matches('/');
        if key.is_empty() {
            return Err(PdfError::config(format!("empty parameter name in {pair:?}")));
        }
        let value = value.trim();
        let value = if let Ok(i) = value.parse::<i64>() {
            ParamValue::Int(i)
        } else if value == "true" {
            ParamValue::Bool(true)
        } else if value == "false" {
            ParamValue::Bool(false)
        } else {
            ParamValue::Name(value.trim_start_matches('/').to_string())
        };
        Ok((key.to_string(), value))
    }
}

impl FromIterator<(String, ParamValue)> for DecodeParms {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_lookup_with_default() {
        let parms = DecodeParms::new().with_int("Columns", 5);
        assert_eq!(parms.int_or("Columns", 1).unwrap(), 5);
        assert_eq!(parms.int_or("Colors", 1).unwrap(), 1);
    }

    #[test]
    fn bool_counts_as_int() {
        let parms = DecodeParms::new().with("EarlyChange", ParamValue::Bool(false));
        assert_eq!(parms.int_or("EarlyChange", 1).unwrap(), 0);
    }

    #[test]
    fn name_where_int_expected_is_config_error() {
        let parms = DecodeParms::new().with_name("Predictor", "PNG");
        assert!(parms.int_or("Predictor", 1).unwrap_err().is_configuration());
    }

    #[test]
    fn parse_pair_types_values() {
        assert_eq!(
            DecodeParms::parse_pair("Predictor=12").unwrap(),
            ("Predictor".to_string(), ParamValue::Int(12))
        );
        assert_eq!(
            DecodeParms::parse_pair("/CFM=/AESV2").unwrap(),
            ("CFM".to_string(), ParamValue::Name("AESV2".to_string()))
        );
        assert!(DecodeParms::parse_pair("novalue").is_err());
    }
}
