//! # Binding Errors
//!
//! [`CoercionError`] is the only error [`Binder::bind`](crate::Binder::bind)
//! returns. Missing values are never errors; only values that are present and
//! cannot take the declared type are.

use serde_json::{json, Value};
use std::fmt;

/// A raw value could not be converted to a field's declared type.
///
/// Raised synchronously from `Binder::bind` and never caught inside the binder.
/// Fields committed before the failure stay committed. The HTTP layer turns the
/// error into a client response, usually via [`CoercionError::to_problem_json`].
#[derive(Debug, Clone, PartialEq)]
pub struct CoercionError {
    field: String,
    raw: Value,
    target: String,
    reason: String,
}

impl CoercionError {
    pub fn new(
        field: impl Into<String>,
        raw: Value,
        target: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            raw,
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Field path (`age`, `tags[2]`, `address.zip`)
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The raw value that failed to convert
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Name of the declared type (`int`, `list<file>`, ...)
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Prefix the field path with a parent field: `zip` in `address` becomes `address.zip`.
    pub fn nested_in(mut self, parent: &str) -> Self {
        if !parent.is_empty() {
            self.field = format!("{parent}.{}", self.field);
        }
        self
    }

    /// HTTP status the caller should answer with
    pub fn status(&self) -> u16 {
        400
    }

    /// RFC 7807 problem details body
    pub fn to_problem_json(&self) -> Value {
        json!({
            "type": "about:blank",
            "title": "Invalid request parameter",
            "status": self.status(),
            "detail": self.to_string(),
            "field": self.field,
            "target": self.target,
            "value": self.raw,
        })
    }
}

impl fmt::Display for CoercionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot bind field '{}': value {} is not a valid {} ({})",
            self.field, self.raw, self.target, self.reason
        )
    }
}

impl std::error::Error for CoercionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_field_value_and_target() {
        let err = CoercionError::new("age", json!("abc"), "int", "not a base-10 integer");
        assert_eq!(
            err.to_string(),
            "cannot bind field 'age': value \"abc\" is not a valid int (not a base-10 integer)"
        );
    }

    #[test]
    fn test_nested_path() {
        let err = CoercionError::new("zip", json!("x"), "int", "bad").nested_in("address");
        assert_eq!(err.field(), "address.zip");
        assert_eq!(err.nested_in("").field(), "address.zip");
    }

    #[test]
    fn test_problem_json() {
        let err = CoercionError::new("age", json!("abc"), "int", "bad");
        let body = err.to_problem_json();
        assert_eq!(body["status"], 400);
        assert_eq!(body["field"], "age");
        assert_eq!(body["target"], "int");
        assert_eq!(body["value"], "abc");
    }
}
