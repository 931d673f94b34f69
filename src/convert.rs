use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::errors::{ContextError, Result};
use crate::value::{ContextValue, ValueKind};

/// Turn any serializable value into a mapping of its field names to field values.
///
/// A value that serializes to `null` (such as `None`) yields `Ok(None)`.
/// Field order follows serialization order, so derived structs keep their
/// declaration order. Values that are not map-shaped are rejected.
pub fn to_map<T: Serialize + ?Sized>(source: &T) -> Result<Option<IndexMap<String, ContextValue>>> {
    match serde_json::to_value(source)? {
        Value::Null => Ok(None),
        Value::Object(fields) => Ok(Some(
            fields.into_iter().map(|(k, v)| (k, ContextValue::from(v))).collect(),
        )),
        other => Err(ContextError::NotAMapping { found: ValueKind::of_json(&other) }),
    }
}
