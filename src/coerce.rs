//! # Type Coercion
//!
//! [`TypeCoercer`] converts a [`RawValue`] into a [`BoundValue`] compatible with
//! a field's declared [`FieldType`]. Values already of the right shape pass
//! through; everything else follows a fixed conversion table:
//!
//! | From \ To | string            | int                       | float                  | bool                           |
//! |-----------|-------------------|---------------------------|------------------------|--------------------------------|
//! | string    | as is             | base-10 integer, trimmed  | finite float, trimmed  | `true/1/on/yes`, `false/0/off/no/""` |
//! | int       | decimal           | as is                     | widened                | `0` / `1` only                 |
//! | float     | decimal           | integral values in range  | as is                  | rejected                       |
//! | bool      | `"true"/"false"`  | `1` / `0`                 | `1.0` / `0.0`          | as is                          |
//!
//! Strings with a fractional part (`"3.7"`) are rejected for int fields rather
//! than truncated, and non-numeric strings always fail; nothing is silently
//! zeroed.
//!
//! Null binds to a nullable field as `BoundValue::Null` without conversion and
//! fails for a non-nullable field. Lists are coerced element by element and
//! fail as a whole on the first bad element. Nested objects are built from JSON
//! maps with the same lookup and absent-field policy the binder applies at the
//! top level.

use crate::descriptor::{Absent, ControllerDescriptor, FieldType};
use crate::error::CoercionError;
use crate::naming::alt_form;
use crate::value::{BoundValue, RawValue};
use serde_json::{Map, Value};
use std::num::IntErrorKind;

/// Converts raw request values into values of a declared type.
#[derive(Debug, Clone, Copy)]
pub struct TypeCoercer {
    naming_fallback: bool,
    descriptor_cache: bool,
}

impl Default for TypeCoercer {
    fn default() -> Self {
        Self::new(true)
    }
}

fn fail(field: &str, raw: Value, target: &FieldType, reason: impl Into<String>) -> CoercionError {
    CoercionError::new(field, raw, target.to_string(), reason)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Integral f64 to i128, rejecting fractions and non-finite values.
fn integral(f: f64) -> Option<i128> {
    // 2^127 is exactly representable, so the upper bound is exclusive.
    const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    if f.is_finite() && f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f) {
        Some(f as i128)
    } else {
        None
    }
}

impl TypeCoercer {
    /// `naming_fallback` controls whether nested object members are also looked
    /// up under the snake-case form of their name.
    pub fn new(naming_fallback: bool) -> Self {
        Self {
            naming_fallback,
            descriptor_cache: true,
        }
    }

    /// Resolve nested controller descriptors through the shared cache (default)
    /// or build them fresh on every use.
    pub fn with_descriptor_cache(mut self, enabled: bool) -> Self {
        self.descriptor_cache = enabled;
        self
    }

    /// Coerce `raw` for the field `field` of type `ty`.
    pub fn coerce(
        &self,
        field: &str,
        raw: RawValue,
        ty: &FieldType,
        nullable: bool,
    ) -> Result<BoundValue, CoercionError> {
        match raw {
            RawValue::Json(Value::Null) if nullable => Ok(BoundValue::Null),
            RawValue::Json(value) => self.coerce_json(field, value, ty),
            RawValue::File(file) => match ty {
                FieldType::File => Ok(BoundValue::File(file)),
                FieldType::Json => Ok(BoundValue::Json(file.to_json())),
                FieldType::List(inner) if **inner == FieldType::File => {
                    Ok(BoundValue::List(vec![BoundValue::File(file)]))
                }
                _ => Err(fail(field, file.to_json(), ty, "an uploaded file cannot bind here")),
            },
            RawValue::Files(files) => match ty {
                FieldType::List(inner) if **inner == FieldType::File => Ok(BoundValue::List(
                    files.into_iter().map(BoundValue::File).collect(),
                )),
                FieldType::Json => Ok(BoundValue::Json(RawValue::Files(files).to_json())),
                _ => Err(fail(
                    field,
                    RawValue::Files(files).to_json(),
                    ty,
                    "a list of uploaded files cannot bind here",
                )),
            },
        }
    }

    fn coerce_json(
        &self,
        field: &str,
        value: Value,
        ty: &FieldType,
    ) -> Result<BoundValue, CoercionError> {
        if value.is_null() && *ty != FieldType::Json {
            return Err(fail(field, value, ty, "null given for a non-nullable field"));
        }
        match ty {
            FieldType::Json => Ok(BoundValue::Json(value)),
            FieldType::Str => match value {
                Value::String(s) => Ok(BoundValue::Str(s)),
                Value::Number(n) => Ok(BoundValue::Str(n.to_string())),
                Value::Bool(b) => Ok(BoundValue::Str(b.to_string())),
                other => Err(fail(field, other, ty, "expected a scalar")),
            },
            FieldType::Int => self.to_int(field, value, ty),
            FieldType::Float => self.to_float(field, value, ty),
            FieldType::Bool => match value {
                Value::Bool(b) => Ok(BoundValue::Bool(b)),
                Value::String(s) => match parse_bool(&s) {
                    Some(b) => Ok(BoundValue::Bool(b)),
                    None => Err(fail(field, Value::String(s), ty, "not a recognised boolean")),
                },
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Ok(BoundValue::Bool(false)),
                    Some(1) => Ok(BoundValue::Bool(true)),
                    _ => Err(fail(field, Value::Number(n), ty, "only 0 and 1 convert to bool")),
                },
                other => Err(fail(field, other, ty, "expected a scalar")),
            },
            FieldType::File => Err(fail(field, value, ty, "expected an uploaded file")),
            FieldType::List(inner) => match value {
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.coerce(&format!("{field}[{i}]"), RawValue::Json(item), inner, false)
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(BoundValue::List),
                other => Err(fail(field, other, ty, "expected a list")),
            },
            FieldType::Object(desc) => match value {
                Value::Object(map) => {
                    self.build_object(field, map, &desc.resolve(self.descriptor_cache))
                }
                other => Err(fail(field, other, ty, "expected an object")),
            },
        }
    }

    fn to_int(
        &self,
        field: &str,
        value: Value,
        ty: &FieldType,
    ) -> Result<BoundValue, CoercionError> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(BoundValue::Int(i128::from(i)))
                } else if let Some(u) = n.as_u64() {
                    Ok(BoundValue::Int(i128::from(u)))
                } else {
                    match n.as_f64().and_then(integral) {
                        Some(i) => Ok(BoundValue::Int(i)),
                        None => Err(fail(field, Value::Number(n), ty, "not an integral number")),
                    }
                }
            }
            Value::String(s) => match s.trim().parse::<i128>() {
                Ok(i) => Ok(BoundValue::Int(i)),
                Err(e) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => {
                    Err(fail(field, Value::String(s), ty, "out of range"))
                }
                Err(_) => Err(fail(field, Value::String(s), ty, "not a base-10 integer")),
            },
            Value::Bool(b) => Ok(BoundValue::Int(i128::from(b))),
            other => Err(fail(field, other, ty, "expected a scalar")),
        }
    }

    fn to_float(
        &self,
        field: &str,
        value: Value,
        ty: &FieldType,
    ) -> Result<BoundValue, CoercionError> {
        match value {
            Value::Number(n) => match n.as_f64() {
                Some(f) => Ok(BoundValue::Float(f)),
                None => Err(fail(field, Value::Number(n), ty, "not representable as float")),
            },
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(BoundValue::Float(f)),
                _ => Err(fail(field, Value::String(s), ty, "not a finite number")),
            },
            Value::Bool(b) => Ok(BoundValue::Float(if b { 1.0 } else { 0.0 })),
            other => Err(fail(field, other, ty, "expected a scalar")),
        }
    }

    /// Build a nested object: own name first, then the snake-case form.
    fn build_object(
        &self,
        field: &str,
        mut map: Map<String, Value>,
        desc: &ControllerDescriptor,
    ) -> Result<BoundValue, CoercionError> {
        let mut entries = Vec::with_capacity(desc.fields().len());
        for sub in desc.fields() {
            let mut raw = map.remove(sub.name());
            if raw.is_none() && self.naming_fallback {
                let alt = alt_form(sub.name());
                if alt != sub.name() {
                    raw = map.remove(&*alt);
                }
            }
            let path = format!("{field}.{}", sub.name());
            match raw {
                Some(v) => {
                    let bound = self.coerce(&path, RawValue::Json(v), sub.ty(), sub.is_nullable())?;
                    entries.push((sub.name().to_string(), bound));
                }
                None => match sub.when_absent() {
                    Absent::AssignNull => entries.push((sub.name().to_string(), BoundValue::Null)),
                    Absent::KeepDefault | Absent::LeaveUnset => {}
                },
            }
        }
        Ok(BoundValue::Object(entries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{DescriptorRef, FieldDescriptor};
    use crate::upload::UploadedFile;
    use serde_json::json;
    use std::sync::Arc;

    fn c() -> TypeCoercer {
        TypeCoercer::default()
    }

    fn json(v: Value, ty: FieldType) -> Result<BoundValue, CoercionError> {
        c().coerce("f", RawValue::Json(v), &ty, false)
    }

    #[test]
    fn test_string_to_int() {
        assert_eq!(json(json!("42"), FieldType::Int).unwrap(), BoundValue::Int(42));
        assert_eq!(json(json!(" -7 "), FieldType::Int).unwrap(), BoundValue::Int(-7));
        let err = json(json!("abc"), FieldType::Int).unwrap_err();
        assert_eq!(err.raw(), &json!("abc"));
        assert_eq!(err.target(), "int");
        assert!(json(json!("3.7"), FieldType::Int).is_err());
        assert!(json(json!(""), FieldType::Int).is_err());
    }

    #[test]
    fn test_oversized_integer_string_is_a_range_error() {
        let huge = "1".repeat(60);
        let err = json(json!(huge), FieldType::Int).unwrap_err();
        assert_eq!(err.reason(), "out of range");
        let err = json(json!(format!("-{huge}")), FieldType::Int).unwrap_err();
        assert_eq!(err.reason(), "out of range");
    }

    #[test]
    fn test_number_to_int() {
        assert_eq!(json(json!(3.0), FieldType::Int).unwrap(), BoundValue::Int(3));
        assert!(json(json!(3.5), FieldType::Int).is_err());
        assert_eq!(
            json(json!(u64::MAX), FieldType::Int).unwrap(),
            BoundValue::Int(i128::from(u64::MAX))
        );
        assert_eq!(json(json!(true), FieldType::Int).unwrap(), BoundValue::Int(1));
    }

    #[test]
    fn test_float_and_bool() {
        assert_eq!(json(json!("2.5"), FieldType::Float).unwrap(), BoundValue::Float(2.5));
        assert_eq!(json(json!(2), FieldType::Float).unwrap(), BoundValue::Float(2.0));
        assert!(json(json!("NaN"), FieldType::Float).is_err());
        assert_eq!(json(json!("on"), FieldType::Bool).unwrap(), BoundValue::Bool(true));
        assert_eq!(json(json!("FALSE"), FieldType::Bool).unwrap(), BoundValue::Bool(false));
        assert_eq!(json(json!(0), FieldType::Bool).unwrap(), BoundValue::Bool(false));
        assert!(json(json!(2), FieldType::Bool).is_err());
        assert!(json(json!("maybe"), FieldType::Bool).is_err());
    }

    #[test]
    fn test_scalars_to_string() {
        assert_eq!(json(json!(12), FieldType::Str).unwrap(), BoundValue::Str("12".into()));
        assert_eq!(json(json!(false), FieldType::Str).unwrap(), BoundValue::Str("false".into()));
        assert!(json(json!({"a": 1}), FieldType::Str).is_err());
    }

    #[test]
    fn test_null_handling() {
        let ok = c().coerce("f", RawValue::Json(Value::Null), &FieldType::Int, true);
        assert_eq!(ok.unwrap(), BoundValue::Null);
        assert!(json(Value::Null, FieldType::Int).is_err());
        assert_eq!(json(Value::Null, FieldType::Json).unwrap(), BoundValue::Json(Value::Null));
    }

    #[test]
    fn test_list_elementwise() {
        let ty = FieldType::List(Box::new(FieldType::Int));
        assert_eq!(
            json(json!(["1", 2]), ty.clone()).unwrap(),
            BoundValue::List(vec![BoundValue::Int(1), BoundValue::Int(2)])
        );
        let err = json(json!(["1", "x", "3"]), ty.clone()).unwrap_err();
        assert_eq!(err.field(), "f[1]");
        assert!(json(json!("1"), ty).is_err());
    }

    #[test]
    fn test_files() {
        let file = UploadedFile::new("/tmp/a", "a.txt");
        let one = c().coerce("f", RawValue::File(file.clone()), &FieldType::File, false);
        assert_eq!(one.unwrap(), BoundValue::File(file.clone()));

        let list_ty = FieldType::List(Box::new(FieldType::File));
        let many = c().coerce("f", RawValue::Files(vec![file.clone()]), &list_ty, false);
        assert_eq!(many.unwrap(), BoundValue::List(vec![BoundValue::File(file.clone())]));

        assert!(c()
            .coerce("f", RawValue::Files(vec![file]), &FieldType::File, false)
            .is_err());
        assert!(json(json!({"name": "a.png"}), FieldType::File).is_err());
    }

    #[test]
    fn test_nested_object() {
        let desc = Arc::new(
            ControllerDescriptor::new("Address")
                .field(FieldDescriptor::new("zipCode", FieldType::Int))
                .field(FieldDescriptor::new("line2", FieldType::Str).nullable(true))
                .field(FieldDescriptor::new("country", FieldType::Str).with_default(true)),
        );
        let ty = FieldType::Object(DescriptorRef::fixed(Arc::clone(&desc)));
        let bound = json(json!({"zip_code": "1000"}), ty.clone()).unwrap();
        assert_eq!(
            bound,
            BoundValue::Object(vec![
                ("zipCode".into(), BoundValue::Int(1000)),
                ("line2".into(), BoundValue::Null),
            ])
        );

        let err = json(json!({"zipCode": "x"}), ty.clone()).unwrap_err();
        assert_eq!(err.field(), "f.zipCode");

        let strict = TypeCoercer::new(false)
            .coerce("f", RawValue::Json(json!({"zip_code": "1"})), &ty, false)
            .unwrap();
        assert_eq!(strict, BoundValue::Object(vec![("line2".into(), BoundValue::Null)]));
    }
}
