use std::fmt;
use std::sync::Arc;

use indexmap::map::Iter;
use indexmap::IndexMap;
use serde::{Serialize, Serializer};

use crate::value::{fmt_entries, ContextValue};

/// An immutable, ordered snapshot of context entries.
///
/// Clones share the same backing storage, so handing a view to several readers
/// (or threads) costs one reference count each. There is no way to mutate it;
/// [`ReadOnlyMap::to_index_map`] hands out an independent copy instead.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadOnlyMap {
    entries: Arc<IndexMap<String, ContextValue>>,
}

impl ReadOnlyMap {
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
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

    pub fn values(&self) -> impl Iterator<Item = &ContextValue> {
        self.entries.values()
    }

    pub fn iter(&self) -> Iter<'_, String, ContextValue> {
        self.entries.iter()
    }

    /// Owned copy of the entries. Changes to the copy are not seen by this view.
    pub fn to_index_map(&self) -> IndexMap<String, ContextValue> {
        self.entries.as_ref().clone()
    }
}

impl From<IndexMap<String, ContextValue>> for ReadOnlyMap {
    fn from(entries: IndexMap<String, ContextValue>) -> Self {
        Self { entries: Arc::new(entries) }
    }
}

impl<'a> IntoIterator for &'a ReadOnlyMap {
    type Item = (&'a String, &'a ContextValue);
    type IntoIter = Iter<'a, String, ContextValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for ReadOnlyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_entries(f, &self.entries)
    }
}

impl Serialize for ReadOnlyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.as_ref().serialize(serializer)
    }
}
