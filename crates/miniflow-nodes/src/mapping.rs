//! Path expressions used by `outputMapping` to pull values out of an HTTP response.
//!
//! Supported forms: `$.status`, `$.body`, `$.data`, `$.payload` and dotted
//! object paths such as `$.user.address.city`.

use miniflow_core::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid integer regex"));
static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+\.\d+$").expect("valid decimal regex"));

/// A received response, with its body parsed once
pub struct Response<'a> {
    pub status: u16,
    pub body: &'a str,
    parsed: Option<Value>,
}

impl<'a> Response<'a> {
    pub fn new(status: u16, body: &'a str) -> Self {
        let parsed = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .map(Value::from)
        };

        Self {
            status,
            body,
            parsed,
        }
    }

    /// Evaluate one path expression.
    ///
    /// `None` means nothing was found (missing key, a step through a
    /// non-object, or a body that is not JSON); `Some(Value::Null)` means the
    /// key exists with a JSON null.
    pub fn resolve(&self, path: &str) -> Option<Value> {
        let path = path.trim();

        match path {
            "" => None,
            "$.body" => Some(Value::String(self.body.to_string())),
            "$.status" => Some(
                self.lookup("status")
                    .filter(|v| !v.is_null())
                    .map(normalize)
                    .unwrap_or(Value::Integer(self.status as i64)),
            ),
            "$.data" => self.either("data", "payload"),
            "$.payload" => self.either("payload", "data"),
            _ => path.strip_prefix("$.").and_then(|p| self.lookup(p)).map(normalize),
        }
    }

    fn either(&self, first: &str, second: &str) -> Option<Value> {
        self.lookup(first)
            .filter(|v| !v.is_null())
            .or_else(|| self.lookup(second))
            .map(normalize)
    }

    /// Walk the parsed body through nested objects by dotted keys
    fn lookup(&self, dotted: &str) -> Option<Value> {
        if dotted.trim().is_empty() {
            return None;
        }

        let mut current = self.parsed.as_ref()?;
        for key in dotted.split('.') {
            current = current.as_object()?.get(key)?;
        }
        Some(current.clone())
    }
}

/// Numeric-looking strings become numbers; everything else passes through
fn normalize(value: Value) -> Value {
    if let Value::String(s) = &value {
        let t = s.trim();
        if INTEGER.is_match(t) {
            if let Ok(n) = t.parse::<i64>() {
                return Value::Integer(n);
            }
        } else if DECIMAL.is_match(t) {
            if let Ok(n) = t.parse::<f64>() {
                return Value::Float(n);
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_selectors() {
        let response = Response::new(201, "not json");
        assert_eq!(response.resolve("$.body"), Some(Value::from("not json")));
        assert_eq!(response.resolve("$.status"), Some(Value::Integer(201)));
        assert_eq!(response.resolve("$.data"), None);
        assert_eq!(response.resolve("$.anything"), None);
    }

    #[test]
    fn test_body_status_takes_precedence() {
        let response = Response::new(200, r#"{"status": "404"}"#);
        assert_eq!(response.resolve("$.status"), Some(Value::Integer(404)));
    }

    #[test]
    fn test_data_and_payload_fall_back_to_each_other() {
        let response = Response::new(200, r#"{"payload": {"id": 1}}"#);
        let expected = response.resolve("$.payload");
        assert!(expected.is_some());
        assert_eq!(response.resolve("$.data"), expected);
    }

    #[test]
    fn test_nested_paths_and_coercion() {
        let body = r#"{"user": {"age": "42", "score": "9.5", "name": "Ana", "nick": null}, "list": [1]}"#;
        let response = Response::new(200, body);

        assert_eq!(response.resolve("$.user.age"), Some(Value::Integer(42)));
        assert_eq!(response.resolve("$.user.score"), Some(Value::Float(9.5)));
        assert_eq!(response.resolve("$.user.name"), Some(Value::from("Ana")));
        assert_eq!(response.resolve("$.user.nick"), Some(Value::Null));
        assert_eq!(response.resolve("$.user.missing"), None);
        assert_eq!(response.resolve("$.list.0"), None);
        assert_eq!(response.resolve("user.age"), None);
    }
}
