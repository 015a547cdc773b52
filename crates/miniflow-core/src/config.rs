use crate::{NodeError, Value};
use std::collections::HashMap;

/// Typed, validating view over a node's configuration mapping.
///
/// `Null` entries are treated as missing. Shape mismatches surface as
/// `NodeError::Configuration` instead of being coerced.
#[derive(Debug, Clone, Copy)]
pub struct Config<'a> {
    map: &'a HashMap<String, Value>,
}

impl<'a> Config<'a> {
    pub fn new(map: &'a HashMap<String, Value>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|v| !v.is_null())
    }

    /// Optional string parameter
    pub fn str_opt(&self, key: &str) -> Result<Option<&'a str>, NodeError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(type_mismatch(key, "a string", other)),
        }
    }

    /// First present string among `keys`
    pub fn first_str(&self, keys: &[&str]) -> Result<Option<&'a str>, NodeError> {
        for key in keys {
            if let Some(s) = self.str_opt(key)? {
                return Ok(Some(s));
            }
        }
        Ok(None)
    }

    /// Required, non-blank string parameter
    pub fn require_str(&self, key: &str) -> Result<&'a str, NodeError> {
        match self.str_opt(key)? {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(NodeError::Configuration(format!("Missing {} in node config", key))),
        }
    }

    /// Non-negative integer with a default. Accepts integral floats and numeric strings.
    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64, NodeError> {
        let value = match self.get(key) {
            None => return Ok(default),
            Some(v) => v,
        };

        let parsed = match value {
            Value::Integer(n) if *n >= 0 => Some(*n as u64),
            Value::Float(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as u64),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        parsed.ok_or_else(|| type_mismatch(key, "a non-negative integer", value))
    }

    /// List of non-blank strings; `Null` items and blank strings are skipped
    pub fn string_list(&self, key: &str) -> Result<Vec<&'a str>, NodeError> {
        let items = match self.get(key) {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(other) => return Err(type_mismatch(key, "a list", other)),
        };

        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Null => {}
                Value::String(s) if s.trim().is_empty() => {}
                Value::String(s) => out.push(s.as_str()),
                other => return Err(type_mismatch(key, "a list of strings", other)),
            }
        }
        Ok(out)
    }

    /// String-to-string mapping, returned in key order
    pub fn string_map(&self, key: &str) -> Result<Vec<(&'a str, &'a str)>, NodeError> {
        let map = match self.get(key) {
            None => return Ok(Vec::new()),
            Some(Value::Object(map)) => map,
            Some(other) => return Err(type_mismatch(key, "a mapping", other)),
        };

        let mut out = Vec::with_capacity(map.len());
        for (k, v) in map {
            match v {
                Value::String(s) => out.push((k.as_str(), s.as_str())),
                other => {
                    return Err(NodeError::Configuration(format!(
                        "'{}.{}' must be a string, got {}",
                        key,
                        k,
                        other.type_name()
                    )))
                }
            }
        }
        out.sort_by(|a, b| a.0.cmp(b.0));
        Ok(out)
    }
}

fn type_mismatch(key: &str, expected: &str, actual: &Value) -> NodeError {
    NodeError::Configuration(format!(
        "'{}' must be {}, got {}",
        key,
        expected,
        actual.type_name()
    ))
}
