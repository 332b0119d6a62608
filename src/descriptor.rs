//! # Controller Descriptors
//!
//! A [`ControllerDescriptor`] lists a controller type's bindable fields: the
//! name used to look the field up in request sources, its declared
//! [`FieldType`], whether it is nullable, and whether it has a default.
//!
//! Descriptors are derived purely from type structure, so each controller type
//! builds its descriptor once; [`descriptor_for`] caches it by `TypeId` for the
//! life of the process. The cache is write-once-then-read and safe to use from
//! any number of request threads.
//!
//! Controllers normally get their [`Controller`] impl from
//! `#[derive(Controller)]`, which also implements [`BindValue`] so a controller
//! type can be nested inside another one. A nested controller's field type is a
//! [`DescriptorRef`] resolved when a value is coerced, so a type may contain
//! itself (`struct Node { children: Vec<Node> }`).
//!
//! Only the top-level controller has its `request` field injected. Nested
//! controllers are built from JSON objects and never see the request.

use crate::error::CoercionError;
use crate::request::BindRequest;
use crate::upload::UploadedFile;
use crate::value::BoundValue;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Declared type of a bindable field (nullability is tracked on the field).
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Str,
    Int,
    Float,
    Bool,
    File,
    /// Any JSON value, bound verbatim
    Json,
    List(Box<FieldType>),
    Object(DescriptorRef),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Str => write!(f, "string"),
            FieldType::Int => write!(f, "int"),
            FieldType::Float => write!(f, "float"),
            FieldType::Bool => write!(f, "bool"),
            FieldType::File => write!(f, "file"),
            FieldType::Json => write!(f, "mixed"),
            FieldType::List(inner) => write!(f, "list<{inner}>"),
            FieldType::Object(desc) => write!(f, "object<{}>", desc.short_name()),
        }
    }
}

/// Reference to a nested controller's descriptor, resolved on use.
///
/// Two references are equal when they name the same type.
#[derive(Clone)]
pub struct DescriptorRef {
    type_name: &'static str,
    source: DescriptorSource,
}

#[derive(Clone)]
enum DescriptorSource {
    Fixed(Arc<ControllerDescriptor>),
    Typed {
        cached: fn() -> Arc<ControllerDescriptor>,
        build: fn() -> ControllerDescriptor,
    },
}

impl DescriptorRef {
    /// Descriptor of controller type `C`. Nothing is built until [`resolve`](Self::resolve).
    pub fn of<C: Controller>() -> Self {
        Self {
            type_name: std::any::type_name::<C>(),
            source: DescriptorSource::Typed {
                cached: descriptor_for::<C>,
                build: C::describe,
            },
        }
    }

    /// An already built descriptor, for hand-written controllers.
    pub fn fixed(descriptor: Arc<ControllerDescriptor>) -> Self {
        Self {
            type_name: descriptor.type_name(),
            source: DescriptorSource::Fixed(descriptor),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn short_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    /// The descriptor, from the process-wide cache when `use_cache` is set.
    pub fn resolve(&self, use_cache: bool) -> Arc<ControllerDescriptor> {
        match &self.source {
            DescriptorSource::Fixed(descriptor) => Arc::clone(descriptor),
            DescriptorSource::Typed { cached, build } => {
                if use_cache {
                    cached()
                } else {
                    Arc::new(build())
                }
            }
        }
    }
}

impl PartialEq for DescriptorRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name
    }
}

impl fmt::Debug for DescriptorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DescriptorRef").field(&self.type_name).finish()
    }
}

fn short_type_name(type_name: &'static str) -> &'static str {
    type_name.rsplit("::").next().unwrap_or(type_name)
}

/// What the binder does with a field no source provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absent {
    /// Field has a default: do not touch it
    KeepDefault,
    /// Nullable field without default: assign null
    AssignNull,
    /// Leave the field unset for downstream validation
    LeaveUnset,
}

/// One bindable field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    ty: FieldType,
    nullable: bool,
    has_default: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
            has_default: false,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_default(mut self, has_default: bool) -> Self {
        self.has_default = has_default;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn has_default(&self) -> bool {
        self.has_default
    }

    /// Default wins over nullability; a field with neither stays unset.
    pub fn when_absent(&self) -> Absent {
        if self.has_default {
            Absent::KeepDefault
        } else if self.nullable {
            Absent::AssignNull
        } else {
            Absent::LeaveUnset
        }
    }
}

/// Bindable fields of a controller type, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerDescriptor {
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
    injects_request: bool,
}

impl ControllerDescriptor {
    pub fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
            injects_request: false,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Mark the controller as declaring a `request` field.
    pub fn with_request_field(mut self) -> Self {
        self.injects_request = true;
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn injects_request(&self) -> bool {
        self.injects_request
    }
}

/// A type whose fields can be bound from a request.
///
/// Implement with `#[derive(Controller)]`. Hand-written impls must keep
/// `describe` and `assign` in agreement: every described field name must be
/// accepted by `assign` with a value of the described type.
pub trait Controller: Sized + 'static {
    /// Build the descriptor. Called once per type when caching is enabled.
    fn describe() -> ControllerDescriptor;

    /// Commit a coerced value to the field described as `field`.
    fn assign(&mut self, field: &str, value: BoundValue) -> Result<(), CoercionError>;

    /// Store the request itself; only called on the top-level controller and
    /// only when the descriptor says so.
    fn inject_request(&mut self, _request: &BindRequest) {}
}

/// A Rust type a coerced [`BoundValue`] can be committed into.
pub trait BindValue: Sized {
    /// Declared type used for coercion
    fn field_type() -> FieldType;

    /// Convert the coerced value. Fails when it does not fit (e.g. integer range).
    fn from_bound(field: &str, value: BoundValue) -> Result<Self, CoercionError>;
}

/// Types a controller's `request` field may have.
pub trait InjectRequest {
    fn inject(request: &BindRequest) -> Self;
}

impl InjectRequest for BindRequest {
    fn inject(request: &BindRequest) -> Self {
        request.clone()
    }
}

impl InjectRequest for Arc<BindRequest> {
    fn inject(request: &BindRequest) -> Self {
        Arc::new(request.clone())
    }
}

impl<T: InjectRequest> InjectRequest for Option<T> {
    fn inject(request: &BindRequest) -> Self {
        Some(T::inject(request))
    }
}

impl<T: InjectRequest> InjectRequest for Slot<T> {
    fn inject(request: &BindRequest) -> Self {
        Slot::Set(T::inject(request))
    }
}

/// State of a non-nullable field: either bound or left for validation to reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    Unset,
    Set(T),
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Unset
    }
}

impl<T> From<T> for Slot<T> {
    fn from(value: T) -> Self {
        Slot::Set(value)
    }
}

impl<T> Slot<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Slot::Set(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Slot::Unset)
    }

    pub fn get(&self) -> Option<&T> {
        match self {
            Slot::Set(v) => Some(v),
            Slot::Unset => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Slot::Set(v) => Some(v),
            Slot::Unset => None,
        }
    }
}

static DESCRIPTORS: Lazy<DashMap<TypeId, Arc<ControllerDescriptor>>> = Lazy::new(DashMap::new);

/// Cached descriptor for `C`, built on first use.
///
/// Building a descriptor never resolves nested descriptors, so this cannot
/// recurse into itself. The descriptor is built outside the map lock; if two
/// threads race, the first insert wins and both get the same `Arc`.
pub fn descriptor_for<C: Controller>() -> Arc<ControllerDescriptor> {
    let id = TypeId::of::<C>();
    if let Some(found) = DESCRIPTORS.get(&id) {
        return Arc::clone(found.value());
    }
    let built = Arc::new(C::describe());
    debug!(
        controller = built.type_name(),
        fields = built.fields().len(),
        injects_request = built.injects_request(),
        "Controller descriptor cached"
    );
    let entry = DESCRIPTORS.entry(id).or_insert(built);
    Arc::clone(entry.value())
}

fn mismatch(field: &str, value: &BoundValue, target: FieldType) -> CoercionError {
    CoercionError::new(
        field,
        value.to_json(),
        target.to_string(),
        format!("{} value cannot be committed here", value.kind()),
    )
}

/// `BindValue::from_bound` for derived controllers: start from `C::default()`
/// and commit each nested entry.
pub fn from_bound_object<C: Controller + Default>(
    field: &str,
    value: BoundValue,
) -> Result<C, CoercionError> {
    match value {
        BoundValue::Object(entries) => {
            let mut nested = C::default();
            for (name, v) in entries {
                nested.assign(&name, v).map_err(|e| e.nested_in(field))?;
            }
            Ok(nested)
        }
        other => Err(mismatch(field, &other, FieldType::Object(DescriptorRef::of::<C>()))),
    }
}

macro_rules! bind_int {
    ($($t:ty),*) => {
        $(
            impl BindValue for $t {
                fn field_type() -> FieldType {
                    FieldType::Int
                }

                fn from_bound(field: &str, value: BoundValue) -> Result<Self, CoercionError> {
                    match value {
                        BoundValue::Int(i) => <$t>::try_from(i).map_err(|_| {
                            CoercionError::new(
                                field,
                                crate::value::int_json(i),
                                FieldType::Int.to_string(),
                                concat!("out of range for ", stringify!($t)),
                            )
                        }),
                        other => Err(mismatch(field, &other, FieldType::Int)),
                    }
                }
            }
        )*
    };
}

bind_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl BindValue for f64 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn from_bound(field: &str, value: BoundValue) -> Result<Self, CoercionError> {
        match value {
            BoundValue::Float(f) => Ok(f),
            other => Err(mismatch(field, &other, FieldType::Float)),
        }
    }
}

impl BindValue for f32 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn from_bound(field: &str, value: BoundValue) -> Result<Self, CoercionError> {
        let wide = f64::from_bound(field, value)?;
        let narrow = wide as f32;
        if narrow.is_finite() {
            Ok(narrow)
        } else {
            Err(CoercionError::new(
                field,
                Value::from(wide),
                FieldType::Float.to_string(),
                "out of range for f32",
            ))
        }
    }
}

impl BindValue for bool {
    fn field_type() -> FieldType {
        FieldType::Bool
    }

    fn from_bound(field: &str, value: BoundValue) -> Result<Self, CoercionError> {
        match value {
            BoundValue::Bool(b) => Ok(b),
            other => Err(mismatch(field, &other, FieldType::Bool)),
        }
    }
}

impl BindValue for String {
    fn field_type() -> FieldType {
        FieldType::Str
    }

    fn from_bound(field: &str, value: BoundValue) -> Result<Self, CoercionError> {
        match value {
            BoundValue::Str(s) => Ok(s),
            other => Err(mismatch(field, &other, FieldType::Str)),
        }
    }
}

impl BindValue for UploadedFile {
    fn field_type() -> FieldType {
        FieldType::File
    }

    fn from_bound(field: &str, value: BoundValue) -> Result<Self, CoercionError> {
        match value {
            BoundValue::File(f) => Ok(f),
            other => Err(mismatch(field, &other, FieldType::File)),
        }
    }
}

impl BindValue for Value {
    fn field_type() -> FieldType {
        FieldType::Json
    }

    fn from_bound(_field: &str, value: BoundValue) -> Result<Self, CoercionError> {
        match value {
            BoundValue::Json(v) => Ok(v),
            other => Ok(other.to_json()),
        }
    }
}

impl<T: BindValue> BindValue for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::List(Box::new(T::field_type()))
    }

    fn from_bound(field: &str, value: BoundValue) -> Result<Self, CoercionError> {
        match value {
            BoundValue::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_bound(&format!("{field}[{i}]"), item))
                .collect(),
            other => Err(mismatch(field, &other, Self::field_type())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_policy() {
        let f = FieldDescriptor::new("page", FieldType::Int);
        assert_eq!(f.when_absent(), Absent::LeaveUnset);
        assert_eq!(f.clone().nullable(true).when_absent(), Absent::AssignNull);
        assert_eq!(
            f.nullable(true).with_default(true).when_absent(),
            Absent::KeepDefault
        );
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::List(Box::new(FieldType::File)).to_string(), "list<file>");
        let desc = Arc::new(ControllerDescriptor::new("app::controllers::Address"));
        assert_eq!(FieldType::Object(DescriptorRef::fixed(desc)).to_string(), "object<Address>");
    }

    #[test]
    fn test_int_range_checked() {
        assert_eq!(u8::from_bound("n", BoundValue::Int(255)).unwrap(), 255);
        let err = u8::from_bound("n", BoundValue::Int(256)).unwrap_err();
        assert_eq!(err.field(), "n");
        assert_eq!(err.target(), "int");
        assert!(u32::from_bound("n", BoundValue::Int(-1)).is_err());
        let max = i128::from(u64::MAX);
        assert_eq!(u64::from_bound("n", BoundValue::Int(max)).unwrap(), u64::MAX);
        assert!(u64::from_bound("n", BoundValue::Int(max + 1)).is_err());
    }

    #[test]
    fn test_f32_range_checked() {
        assert_eq!(f32::from_bound("r", BoundValue::Float(0.5)).unwrap(), 0.5);
        let err = f32::from_bound("r", BoundValue::Float(1e300)).unwrap_err();
        assert_eq!(err.field(), "r");
        assert_eq!(err.reason(), "out of range for f32");
    }

    #[test]
    fn test_vec_element_paths() {
        let err = Vec::<i8>::from_bound(
            "ids",
            BoundValue::List(vec![BoundValue::Int(1), BoundValue::Int(1000)]),
        )
        .unwrap_err();
        assert_eq!(err.field(), "ids[1]");
    }

    #[test]
    fn test_slot_states() {
        let mut s: Slot<i64> = Slot::default();
        assert!(s.is_unset());
        s = 5.into();
        assert_eq!(s.get(), Some(&5));
        assert_eq!(s.into_option(), Some(5));
    }
}
