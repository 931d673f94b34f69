use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::context::ContextMap;
use crate::view::ReadOnlyMap;

/// A value stored in a [`ContextMap`].
///
/// The set of arms is closed: every accessor matches on it instead of casting.
/// Caller-defined types live behind [`ContextValue::Opaque`] and are recovered
/// with [`ContextValue::downcast_ref`].
#[derive(Clone)]
pub enum ContextValue {
    Null,
    Str(String),
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    List(Vec<ContextValue>),
    Map(IndexMap<String, ContextValue>),
    Opaque(Arc<dyn Any + Send + Sync>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Null,
    String,
    Int,
    Long,
    Double,
    Bool,
    List,
    Map,
    Object,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Long => "long",
            ValueKind::Double => "double",
            ValueKind::Bool => "bool",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Object => "object",
        }
    }

    /// Kind a JSON value would take once converted, without converting it.
    pub fn of_json(value: &Value) -> ValueKind {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(n) => match n.as_i64() {
                Some(i) if i32::try_from(i).is_ok() => ValueKind::Int,
                Some(_) => ValueKind::Long,
                None => ValueKind::Double,
            },
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Map,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ContextValue {
    /// Wrap a caller-defined value. It can only be read back by its exact type.
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        ContextValue::Opaque(Arc::new(value))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ContextValue::Null => ValueKind::Null,
            ContextValue::Str(_) => ValueKind::String,
            ContextValue::Int(_) => ValueKind::Int,
            ContextValue::Long(_) => ValueKind::Long,
            ContextValue::Double(_) => ValueKind::Double,
            ContextValue::Bool(_) => ValueKind::Bool,
            ContextValue::List(_) => ValueKind::List,
            ContextValue::Map(_) => ValueKind::Map,
            ContextValue::Opaque(_) => ValueKind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ContextValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the payload as `T` when its type is exactly `T`.
    ///
    /// Built-in arms expose their payload types (`String`, `i32`, `i64`, `f64`,
    /// `bool`, `Vec<ContextValue>`, `IndexMap<String, ContextValue>`); opaque
    /// values expose whatever was wrapped. No numeric widening happens here.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        let payload: &dyn Any = match self {
            ContextValue::Null => return None,
            ContextValue::Str(s) => s as &dyn Any,
            ContextValue::Int(n) => n as &dyn Any,
            ContextValue::Long(n) => n as &dyn Any,
            ContextValue::Double(n) => n as &dyn Any,
            ContextValue::Bool(b) => b as &dyn Any,
            ContextValue::List(items) => items as &dyn Any,
            ContextValue::Map(entries) => entries as &dyn Any,
            ContextValue::Opaque(handle) => return (**handle).downcast_ref::<T>(),
        };
        payload.downcast_ref::<T>()
    }

    /// Read the payload as `T`: borrowed on an exact type match, owned when an
    /// integer widens into an `i64` or `f64` target.
    pub fn extract<T: Any + Clone>(&self) -> Option<Cow<'_, T>> {
        if let Some(exact) = self.downcast_ref::<T>() {
            return Some(Cow::Borrowed(exact));
        }
        let target = TypeId::of::<T>();
        let widened: Box<dyn Any> = if target == TypeId::of::<i64>() {
            Box::new(i64::from_value(self)?)
        } else if target == TypeId::of::<f64>() {
            Box::new(f64::from_value(self)?)
        } else {
            return None;
        };
        widened.downcast::<T>().ok().map(|boxed| Cow::Owned(*boxed))
    }
}

/// Coercion from a stored value into an owned target type.
///
/// Returns `None` when the stored value is not compatible. Numeric targets
/// accept narrower integers (`i32` -> `i64` -> `f64`); nothing else converts.
pub trait FromValue: Sized {
    fn from_value(value: &ContextValue) -> Option<Self>;
}

impl FromValue for String {
    fn from_value(value: &ContextValue) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

impl FromValue for i32 {
    fn from_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Int(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Int(n) => Some(i64::from(*n)),
            ContextValue::Long(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Int(n) => Some(f64::from(*n)),
            // only longs that survive the round trip; 2^63 saturates back to i64::MAX
            ContextValue::Long(n) => {
                let f = *n as f64;
                (f < i64::MAX as f64 && f as i64 == *n).then_some(f)
            }
            ContextValue::Double(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for ReadOnlyMap {
    fn from_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::Map(entries) => Some(ReadOnlyMap::from(entries.clone())),
            _ => None,
        }
    }
}

impl FromValue for ContextValue {
    fn from_value(value: &ContextValue) -> Option<Self> {
        Some(value.clone())
    }
}

// A list converts only if every element does.
impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &ContextValue) -> Option<Self> {
        match value {
            ContextValue::List(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl From<&str> for ContextValue {
    fn from(s: &str) -> Self {
        ContextValue::Str(s.to_owned())
    }
}

impl From<String> for ContextValue {
    fn from(s: String) -> Self {
        ContextValue::Str(s)
    }
}

impl From<i32> for ContextValue {
    fn from(n: i32) -> Self {
        ContextValue::Int(n)
    }
}

impl From<i64> for ContextValue {
    fn from(n: i64) -> Self {
        ContextValue::Long(n)
    }
}

impl From<u32> for ContextValue {
    fn from(n: u32) -> Self {
        i32::try_from(n).map_or(ContextValue::Long(i64::from(n)), ContextValue::Int)
    }
}

impl From<f64> for ContextValue {
    fn from(n: f64) -> Self {
        ContextValue::Double(n)
    }
}

impl From<f32> for ContextValue {
    fn from(n: f32) -> Self {
        ContextValue::Double(f64::from(n))
    }
}

impl From<bool> for ContextValue {
    fn from(b: bool) -> Self {
        ContextValue::Bool(b)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(items: Vec<T>) -> Self {
        ContextValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ContextValue>> From<Option<T>> for ContextValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ContextValue::Null, Into::into)
    }
}

impl From<IndexMap<String, ContextValue>> for ContextValue {
    fn from(entries: IndexMap<String, ContextValue>) -> Self {
        ContextValue::Map(entries)
    }
}

impl From<ContextMap> for ContextValue {
    fn from(map: ContextMap) -> Self {
        ContextValue::Map(map.into_index_map())
    }
}

impl From<ReadOnlyMap> for ContextValue {
    fn from(view: ReadOnlyMap) -> Self {
        ContextValue::Map(view.to_index_map())
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => ContextValue::Null,
            Value::Bool(b) => ContextValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => i32::try_from(i).map_or(ContextValue::Long(i), ContextValue::Int),
                None => n.as_f64().map_or(ContextValue::Null, ContextValue::Double),
            },
            Value::String(s) => ContextValue::Str(s),
            Value::Array(items) => ContextValue::List(items.into_iter().map(Into::into).collect()),
            Value::Object(fields) => {
                ContextValue::Map(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl PartialEq for ContextValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ContextValue::Null, ContextValue::Null) => true,
            (ContextValue::Str(a), ContextValue::Str(b)) => a == b,
            (ContextValue::Int(a), ContextValue::Int(b)) => a == b,
            (ContextValue::Long(a), ContextValue::Long(b)) => a == b,
            (ContextValue::Double(a), ContextValue::Double(b)) => a == b,
            (ContextValue::Bool(a), ContextValue::Bool(b)) => a == b,
            (ContextValue::List(a), ContextValue::List(b)) => a == b,
            (ContextValue::Map(a), ContextValue::Map(b)) => a == b,
            // opaque values have no structural equality; compare identity
            (ContextValue::Opaque(a), ContextValue::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Null => f.write_str("Null"),
            ContextValue::Str(s) => f.debug_tuple("Str").field(s).finish(),
            ContextValue::Int(n) => f.debug_tuple("Int").field(n).finish(),
            ContextValue::Long(n) => f.debug_tuple("Long").field(n).finish(),
            ContextValue::Double(n) => f.debug_tuple("Double").field(n).finish(),
            ContextValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            ContextValue::List(items) => f.debug_tuple("List").field(items).finish(),
            ContextValue::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            ContextValue::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Null => f.write_str("null"),
            ContextValue::Str(s) => f.write_str(s),
            ContextValue::Int(n) => write!(f, "{n}"),
            ContextValue::Long(n) => write!(f, "{n}"),
            ContextValue::Double(n) => write!(f, "{n}"),
            ContextValue::Bool(b) => write!(f, "{b}"),
            ContextValue::List(items) => write!(f, "[{}]", items.iter().join(", ")),
            ContextValue::Map(entries) => fmt_entries(f, entries),
            ContextValue::Opaque(_) => f.write_str("<object>"),
        }
    }
}

/// Renders entries as `{k1=v1, k2=v2}` in iteration order.
pub(crate) fn fmt_entries(f: &mut fmt::Formatter<'_>, entries: &IndexMap<String, ContextValue>) -> fmt::Result {
    let body = entries.iter().map(|(k, v)| format!("{k}={v}")).join(", ");
    write!(f, "{{{body}}}")
}

/// Opaque values have no serialized form and are written as `null`.
impl Serialize for ContextValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContextValue::Null | ContextValue::Opaque(_) => serializer.serialize_unit(),
            ContextValue::Str(s) => serializer.serialize_str(s),
            ContextValue::Int(n) => serializer.serialize_i32(*n),
            ContextValue::Long(n) => serializer.serialize_i64(*n),
            ContextValue::Double(n) => serializer.serialize_f64(*n),
            ContextValue::Bool(b) => serializer.serialize_bool(*b),
            ContextValue::List(items) => items.serialize(serializer),
            ContextValue::Map(entries) => entries.serialize(serializer),
        }
    }
}
