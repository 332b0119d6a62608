//! Values on either side of coercion.

use crate::upload::UploadedFile;
use serde_json::{Map, Value};

/// An untyped value found in one of the request sources.
///
/// Route, query and body values are JSON. Upload values are normalized before
/// they become a `RawValue`; shapes the normalizer did not recognise stay JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Json(Value),
    File(UploadedFile),
    Files(Vec<UploadedFile>),
}

impl RawValue {
    /// JSON rendering of the raw value, for error reports
    pub fn to_json(&self) -> Value {
        match self {
            RawValue::Json(v) => v.clone(),
            RawValue::File(f) => f.to_json(),
            RawValue::Files(fs) => Value::Array(fs.iter().map(UploadedFile::to_json).collect()),
        }
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Json(value)
    }
}

/// JSON number for an integer, or its decimal string outside the 64-bit range.
pub(crate) fn int_json(i: i128) -> Value {
    if let Ok(v) = i64::try_from(i) {
        Value::from(v)
    } else if let Ok(v) = u64::try_from(i) {
        Value::from(v)
    } else {
        Value::String(i.to_string())
    }
}

/// A coerced value ready to be committed to a controller field.
///
/// Its variant always matches the field's declared `FieldType`, or is `Null`
/// for a nullable field.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Null,
    Bool(bool),
    /// Wide enough for both `i64` and `u64` fields
    Int(i128),
    Float(f64),
    Str(String),
    File(UploadedFile),
    List(Vec<BoundValue>),
    /// Nested object: only sub-fields that received a value (or null) appear
    Object(Vec<(String, BoundValue)>),
    Json(Value),
}

impl BoundValue {
    /// Short name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            BoundValue::Null => "null",
            BoundValue::Bool(_) => "bool",
            BoundValue::Int(_) => "int",
            BoundValue::Float(_) => "float",
            BoundValue::Str(_) => "string",
            BoundValue::File(_) => "file",
            BoundValue::List(_) => "list",
            BoundValue::Object(_) => "object",
            BoundValue::Json(_) => "mixed",
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            BoundValue::Null => Value::Null,
            BoundValue::Bool(b) => Value::Bool(*b),
            BoundValue::Int(i) => int_json(*i),
            BoundValue::Float(f) => Value::from(*f),
            BoundValue::Str(s) => Value::String(s.clone()),
            BoundValue::File(f) => f.to_json(),
            BoundValue::List(items) => Value::Array(items.iter().map(BoundValue::to_json).collect()),
            BoundValue::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
            BoundValue::Json(v) => v.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bound_to_json() {
        let v = BoundValue::Object(vec![
            ("id".into(), BoundValue::Int(7)),
            ("tags".into(), BoundValue::List(vec![BoundValue::Str("a".into())])),
            ("note".into(), BoundValue::Null),
        ]);
        assert_eq!(v.to_json(), json!({"id": 7, "tags": ["a"], "note": null}));
        assert_eq!(v.kind(), "object");
    }

    #[test]
    fn test_raw_files_to_json() {
        let raw = RawValue::Files(vec![UploadedFile::new("/tmp/a", "a.txt")]);
        assert_eq!(raw.to_json()[0]["tmp_name"], json!("/tmp/a"));
    }
}
