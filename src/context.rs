use std::any::{type_name, Any};
use std::borrow::Cow;
use std::fmt;

use indexmap::map::Iter;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, trace};

use crate::errors::{ContextError, Result};
use crate::value::{fmt_entries, ContextValue, FromValue, ValueKind};
use crate::view::ReadOnlyMap;

/// Insertion-ordered, string-keyed store of heterogeneous values.
///
/// Reads never fail: a missing key or a value of the wrong type degrades to the
/// accessor's default (`""`, `0`, `0.0`, `false`) or to `None`. Writes go
/// through [`ContextMap::put`] and [`ContextMap::put_all`]; entries are never
/// removed. Overwriting a key keeps its original position.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextMap {
    entries: IndexMap<String, ContextValue>,
}

impl ContextMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from any string-keyed mapping, copying entries in iteration order.
    pub fn of<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ContextValue>,
    {
        let mut map = Self::new();
        map.put_all(entries);
        map
    }

    /// Build a map from a JSON object. Anything other than an object is rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::of(fields)),
            other => Err(ContextError::NotAMapping { found: ValueKind::of_json(&other) }),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json(serde_json::from_str(json)?)
    }

    pub fn put(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Owned form of [`ContextMap::put`] for building a map in one expression.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.put(key, value);
        self
    }

    pub fn put_all<I, K, V>(&mut self, entries: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ContextValue>,
    {
        let before = self.entries.len();
        for (key, value) in entries {
            self.entries.insert(key.into(), value.into());
        }
        trace!(added = self.entries.len() - before, total = self.entries.len(), "put_all");
        self
    }

    pub fn get_string(&self, key: &str) -> String {
        self.get_string_or(key, "")
    }

    pub fn get_string_or(&self, key: &str, default: impl Into<String>) -> String {
        self.coerce(key).unwrap_or_else(|| default.into())
    }

    pub fn get_int(&self, key: &str) -> i32 {
        self.get_int_or(key, 0)
    }

    pub fn get_int_or(&self, key: &str, default: i32) -> i32 {
        self.coerce(key).unwrap_or(default)
    }

    pub fn get_long(&self, key: &str) -> i64 {
        self.get_long_or(key, 0)
    }

    pub fn get_long_or(&self, key: &str, default: i64) -> i64 {
        self.coerce(key).unwrap_or(default)
    }

    pub fn get_double(&self, key: &str) -> f64 {
        self.get_double_or(key, 0.0)
    }

    pub fn get_double_or(&self, key: &str, default: f64) -> f64 {
        self.coerce(key).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get_bool_or(key, false)
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.coerce(key).unwrap_or(default)
    }

    /// Value stored under `key` read as `T`. Borrowed when the stored type is
    /// exactly `T`; owned when a stored integer widens into an `i64` or `f64`.
    pub fn get_object<T: Any + Clone>(&self, key: &str) -> Option<Cow<'_, T>> {
        let value = self.entries.get(key)?;
        let out = value.extract::<T>();
        if out.is_none() {
            debug!(key, expected = type_name::<T>(), found = %value.kind(), "context value type mismatch");
        }
        out
    }

    /// Owned variant of [`ContextMap::get_object`].
    pub fn get_optional<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.get_object::<T>(key).map(Cow::into_owned)
    }

    /// `None` when the key is absent, the value is not a list, or any element
    /// fails to convert to `T`.
    pub fn get_list<T: FromValue>(&self, key: &str) -> Option<Vec<T>> {
        self.coerce(key)
    }

    /// Snapshot of a nested map. The returned view never aliases this map's storage.
    pub fn get_map(&self, key: &str) -> Option<ReadOnlyMap> {
        self.coerce(key)
    }

    /// Raw stored value, without coercion.
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// True when the value is a string with at least one non-whitespace character.
    pub fn has_text(&self, key: &str) -> bool {
        matches!(
            self.entries.get(key),
            Some(ContextValue::Str(s)) if s.chars().any(|c| !c.is_whitespace())
        )
    }

    /// Snapshot of the current entries. Later `put`s are not reflected in it.
    pub fn as_read_only_map(&self) -> ReadOnlyMap {
        ReadOnlyMap::from(self.entries.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, ContextValue> {
        self.entries.iter()
    }

    pub fn into_index_map(self) -> IndexMap<String, ContextValue> {
        self.entries
    }

    fn coerce<T: FromValue>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        let out = T::from_value(value);
        if out.is_none() {
            debug!(key, expected = type_name::<T>(), found = %value.kind(), "context value type mismatch");
        }
        out
    }
}

impl<K: Into<String>, V: Into<ContextValue>> FromIterator<(K, V)> for ContextMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::of(iter)
    }
}

impl<K: Into<String>, V: Into<ContextValue>> Extend<(K, V)> for ContextMap {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

impl<'a> IntoIterator for &'a ContextMap {
    type Item = (&'a String, &'a ContextValue);
    type IntoIter = Iter<'a, String, ContextValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ContextMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_entries(f, &self.entries)
    }
}

impl Serialize for ContextMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq)]
    struct Session {
        id: u64,
    }

    #[test]
    fn timeout_scenario() {
        let mut ctx = ContextMap::new();
        ctx.put("timeoutSeconds", 30);
        assert_eq!(ctx.get_int("timeoutSeconds"), 30);
        assert_eq!(ctx.get_long("timeoutSeconds"), 30);
        assert_eq!(ctx.get_double("timeoutSeconds"), 30.0);
        assert!(!ctx.get_bool("timeoutSeconds"));
        assert_eq!(ctx.get_string("timeoutSeconds"), "");
    }

    #[test]
    fn explicit_default_covers_absence_and_mismatch() {
        let ctx = ContextMap::new().with("flag", "yes");
        assert_eq!(ctx.get_string_or("missing", "d"), "d");
        assert!(ctx.get_bool_or("flag", true));
        assert_eq!(ctx.get_int_or("flag", 7), 7);
        assert_eq!(ctx.get_long_or("missing", -1), -1);
        assert_eq!(ctx.get_double_or("missing", 2.5), 2.5);
    }

    #[test]
    fn long_does_not_narrow_to_int() {
        let ctx = ContextMap::new().with("big", 5_000_000_000i64);
        assert_eq!(ctx.get_int("big"), 0);
        assert_eq!(ctx.get_long("big"), 5_000_000_000);
    }

    #[test]
    fn overwrite_keeps_position() {
        let mut ctx = ContextMap::new();
        ctx.put("a", 1).put("b", 2).put("a", 3);
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(ctx.get_int("a"), 3);
    }

    #[test]
    fn stored_null_is_present() {
        let ctx = ContextMap::new().with("sessionId", None::<String>);
        assert!(ctx.contains_key("sessionId"));
        assert_eq!(ctx.get_string_or("sessionId", "none"), "none");
        assert_eq!(ctx.get_optional::<String>("sessionId"), None);
    }

    #[test]
    fn opaque_values_round_trip() {
        let ctx = ContextMap::new().with("session", ContextValue::opaque(Session { id: 12 }));
        assert_eq!(ctx.get_object::<Session>("session").as_deref(), Some(&Session { id: 12 }));
        assert_eq!(ctx.get_optional::<Session>("session"), Some(Session { id: 12 }));
        assert_eq!(ctx.get_optional::<String>("session"), None);
        assert_eq!(ctx.get_map("session"), None);
    }

    #[test]
    fn get_object_reads_builtin_payloads() {
        let ctx = ContextMap::new().with("name", "kim").with("age", 25);
        assert_eq!(ctx.get_object::<String>("name").as_deref().map(String::as_str), Some("kim"));
        assert_eq!(ctx.get_optional::<i32>("age"), Some(25));
        assert_eq!(ctx.get_optional::<String>("age"), None);
    }

    #[test]
    fn optional_widens_stored_ints() {
        let ctx = ContextMap::new().with("timeoutSeconds", 30);
        assert_eq!(ctx.get_optional::<i64>("timeoutSeconds"), Some(30));
        assert_eq!(ctx.get_object::<f64>("timeoutSeconds").as_deref(), Some(&30.0));
        assert_eq!(ctx.get_optional::<bool>("timeoutSeconds"), None);
    }

    #[test]
    fn lossy_long_degrades_to_default() {
        let ctx = ContextMap::new().with("big", (1i64 << 53) + 1);
        assert_eq!(ctx.get_double("big"), 0.0);
        assert_eq!(ctx.get_double_or("big", -1.0), -1.0);
        assert_eq!(ctx.get_optional::<f64>("big"), None);
        assert_eq!(ctx.get_long("big"), (1i64 << 53) + 1);
    }

    #[test]
    fn u32_reads_back_as_int() {
        let ctx = ContextMap::new().with("age", 30u32);
        assert_eq!(ctx.get_int("age"), 30);
    }

    #[test]
    fn has_text_rules() {
        let ctx = ContextMap::new()
            .with("empty", "")
            .with("blank", " \t\n")
            .with("word", "x")
            .with("number", 1);
        assert!(!ctx.has_text("missing"));
        assert!(!ctx.has_text("empty"));
        assert!(!ctx.has_text("blank"));
        assert!(!ctx.has_text("number"));
        assert!(ctx.has_text("word"));
    }

    #[test]
    fn lists_convert_elementwise() {
        let ctx = ContextMap::new()
            .with("flags", vec!["A", "B", "C"])
            .with("ports", vec![80, 443]);
        assert_eq!(ctx.get_list::<String>("flags"), Some(vec!["A".to_string(), "B".to_string(), "C".to_string()]));
        assert_eq!(ctx.get_list::<i64>("ports"), Some(vec![80, 443]));
        assert_eq!(ctx.get_list::<bool>("ports"), None);
        assert_eq!(ctx.get_list::<i32>("flags"), None);
        assert_eq!(ctx.get_list::<i32>("missing"), None);
    }

    #[test]
    fn nested_map_is_a_snapshot() {
        let mut ctx = ContextMap::new();
        ctx.put("user", ContextMap::new().with("id", 42).with("name", "hong"));

        let user = ctx.get_map("user").unwrap();
        assert_eq!(user.get("id"), Some(&ContextValue::Int(42)));

        let mut copy = user.to_index_map();
        copy.insert("id".to_string(), ContextValue::Int(0));
        assert_eq!(ctx.get_map("user").unwrap().get("id"), Some(&ContextValue::Int(42)));
        assert_eq!(ctx.get_map("missing"), None);
        assert_eq!(ctx.get_map("user").unwrap().len(), 2);
    }

    #[test]
    fn view_is_a_snapshot() {
        let mut ctx = ContextMap::new().with("a", 1);
        let view = ctx.as_read_only_map();
        ctx.put("b", 2);
        assert_eq!(view.len(), 1);
        assert_eq!(ctx.len(), 2);
    }

    #[test]
    fn json_ingest_and_export() {
        let ctx = ContextMap::from_json(json!({"applicationName": "RecordExampleApp", "retries": 3})).unwrap();
        assert_eq!(ctx.get_string("applicationName"), "RecordExampleApp");
        assert_eq!(ctx.get_int("retries"), 3);
        assert_eq!(serde_json::to_string(&ctx).unwrap(), r#"{"applicationName":"RecordExampleApp","retries":3}"#);
        assert_eq!(ctx.to_string(), "{applicationName=RecordExampleApp, retries=3}");
    }

    #[test]
    fn collect_and_extend() {
        let mut ctx: ContextMap = vec![("a", 1), ("b", 2)].into_iter().collect();
        ctx.extend(vec![("c", 3)]);
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }
}
