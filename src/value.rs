//! The five value kinds a binding can carry, and extraction of them from snapshots.

use std::fmt;

use crate::Snapshot;

/// The kinds of value a configuration binding can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A UTF-8 string.
    String,
    /// A signed 64-bit integer.
    Int,
    /// A 64-bit floating-point number.
    Double,
    /// A boolean.
    Bool,
    /// A list of strings.
    StringArray,
}

impl ValueKind {
    /// All supported kinds.
    pub const ALL: [ValueKind; 5] = [
        ValueKind::String,
        ValueKind::Int,
        ValueKind::Double,
        ValueKind::Bool,
        ValueKind::StringArray,
    ];

    /// Human-readable name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::Bool => "bool",
            ValueKind::StringArray => "string array",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value extracted from a snapshot, tagged with its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// A string value.
    String(String),
    /// An integer value.
    Int(i64),
    /// A floating-point value.
    Double(f64),
    /// A boolean value.
    Bool(bool),
    /// A list of strings.
    StringArray(Vec<String>),
}

impl TypedValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            TypedValue::String(_) => ValueKind::String,
            TypedValue::Int(_) => ValueKind::Int,
            TypedValue::Double(_) => ValueKind::Double,
            TypedValue::Bool(_) => ValueKind::Bool,
            TypedValue::StringArray(_) => ValueKind::StringArray,
        }
    }

    /// Converts into the equivalent TOML value.
    pub fn into_toml(self) -> toml::Value {
        match self {
            TypedValue::String(value) => toml::Value::String(value),
            TypedValue::Int(value) => toml::Value::Integer(value),
            TypedValue::Double(value) => toml::Value::Float(value),
            TypedValue::Bool(value) => toml::Value::Boolean(value),
            TypedValue::StringArray(values) => {
                toml::Value::Array(values.into_iter().map(toml::Value::String).collect())
            }
        }
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        TypedValue::String(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        TypedValue::String(value.to_string())
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        TypedValue::Int(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        TypedValue::Double(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        TypedValue::Bool(value)
    }
}

impl From<Vec<String>> for TypedValue {
    fn from(value: Vec<String>) -> Self {
        TypedValue::StringArray(value)
    }
}

/// Pulls a value of the requested kind out of a snapshot.
///
/// Returns `None` when the path is absent or holds a value of a different kind.
pub fn extract(snapshot: &Snapshot, path: &str, kind: ValueKind) -> Option<TypedValue> {
    match kind {
        ValueKind::String => snapshot.string(path).map(TypedValue::String),
        ValueKind::Int => snapshot.int(path).map(TypedValue::Int),
        ValueKind::Double => snapshot.double(path).map(TypedValue::Double),
        ValueKind::Bool => snapshot.bool(path).map(TypedValue::Bool),
        ValueKind::StringArray => snapshot.string_array(path).map(TypedValue::StringArray),
    }
}

/// Rust types that can be bound to a configuration key.
///
/// Implemented for `String`, `i64`, `f64`, `bool` and `Vec<String>`.
pub trait Bindable: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The kind this type is extracted as.
    const KIND: ValueKind;

    /// Converts a typed value into `Self`, or `None` if the kinds differ.
    fn from_typed(value: TypedValue) -> Option<Self>;

    /// Converts `self` into a typed value.
    fn into_typed(self) -> TypedValue;

    /// Extracts a value of this type from `snapshot`.
    fn extract(snapshot: &Snapshot, path: &str) -> Option<Self> {
        extract(snapshot, path, Self::KIND).and_then(Self::from_typed)
    }
}

macro_rules! impl_bindable {
    ($ty:ty, $variant:ident) => {
        impl Bindable for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn from_typed(value: TypedValue) -> Option<Self> {
                match value {
                    TypedValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }

            fn into_typed(self) -> TypedValue {
                TypedValue::$variant(self)
            }
        }
    };
}

impl_bindable!(String, String);
impl_bindable!(i64, Int);
impl_bindable!(f64, Double);
impl_bindable!(bool, Bool);
impl_bindable!(Vec<String>, StringArray);
