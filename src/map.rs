//! `Map`: insertion-ordered map over dynamic `Value` keys.
//!
//! Every keyed operation normalizes its key to a `KeyHandle` first, then
//! works on the structural `HandleHashMap`. The original key `Value` is
//! stored alongside the value, which keeps reference-typed keys alive (and
//! their addresses stable) for as long as the entry exists.

use crate::cursor::Cursor;
use crate::error::MapError;
use crate::handle_hash_map::HandleHashMap;
use crate::index::HashIndex;
use crate::iter::{Entries, Keys, Values};
use crate::key::KeyHandle;
use crate::value::{Array, Value};
use core::fmt;
use core::hash::BuildHasher;
use hashbrown::HashTable;
use log::{debug, trace};
use slotmap::DefaultKey;
use std::collections::hash_map::RandomState;

pub(crate) struct Slot {
    pub(crate) key: Value,
    pub(crate) value: Value,
}

pub struct Map<S = RandomState, I = HashTable<DefaultKey>> {
    pub(crate) inner: HandleHashMap<KeyHandle, Slot, S, I>,
}

impl Map {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    /// See `from_source_with`.
    pub fn from_source(source: &Value) -> Result<Self, MapError> {
        Self::from_source_with(source, Default::default(), HashTable::new())
    }
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Map<S>
where
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            inner: HandleHashMap::with_hasher(hasher),
        }
    }
}

impl<S, I> Map<S, I>
where
    S: BuildHasher,
    I: HashIndex,
{
    /// Build a map over a caller-supplied hash index.
    pub fn with_hasher_and_index(hasher: S, index: I) -> Self {
        Self {
            inner: HandleHashMap::with_hasher_and_index(hasher, index),
        }
    }

    /// Build a map from a source value.
    ///
    /// `Undefined` and `Null` give an empty map. An `Array` whose elements
    /// are all arrays is read as key/value pairs (element 0 is the key,
    /// element 1 the value, missing elements read as `Undefined`, extra
    /// elements are ignored) and inserted in order with `set` semantics.
    /// Anything else fails with `InvalidSourceKind` and builds nothing.
    pub fn from_source_with(source: &Value, hasher: S, index: I) -> Result<Self, MapError> {
        let pairs = pairs_of(source)?;
        trace!("building map from {} source pairs", pairs.len());
        let mut map = Self::with_hasher_and_index(hasher, index);
        for (k, v) in pairs {
            map.set(k, v);
        }
        Ok(map)
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.inner.len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn set(&mut self, key: impl Into<Value>, value: impl Into<Value>) -> &mut Self {
        let key = match key.into() {
            // -0 is stored as +0
            Value::Number(n) if n == 0.0 => Value::Number(0.0),
            k => k,
        };
        let handle = KeyHandle::new(&key);
        let value = value.into();
        self.inner.upsert(handle, Slot { key, value });
        self
    }

    /// Positional form of `set`: `args[0]` is the key and `args[1]` the
    /// value. Missing arguments read as `Undefined`; the rest are ignored.
    pub fn set_args(&mut self, args: &[Value]) -> &mut Self {
        let key = args.first().cloned().unwrap_or_default();
        let value = args.get(1).cloned().unwrap_or_default();
        self.set(key, value)
    }

    /// Value stored under `key`, or `Undefined` if there is none.
    pub fn get(&self, key: &Value) -> Value {
        self.get_ref(key).cloned().unwrap_or_default()
    }

    pub fn get_ref(&self, key: &Value) -> Option<&Value> {
        let h = self.inner.find(&KeyHandle::new(key))?;
        h.value(&self.inner).map(|slot| &slot.value)
    }

    pub fn has(&self, key: &Value) -> bool {
        self.inner.contains_key(&KeyHandle::new(key))
    }

    /// Remove `key`. Returns whether an entry was removed.
    pub fn delete(&mut self, key: &Value) -> bool {
        self.inner.remove_key(&KeyHandle::new(key)).is_some()
    }

    pub fn clear(&mut self) {
        trace!("clearing map with {} entries", self.inner.len());
        self.inner.clear();
    }

    /// Call `f(value, key, map)` once per entry in insertion order.
    ///
    /// `f` may mutate the map; traversal continues from the current list
    /// position (see `Cursor`).
    pub fn for_each<F>(&mut self, mut f: F)
    where
        F: FnMut(&Value, &Value, &mut Self),
    {
        let mut cursor = Cursor::new();
        loop {
            let Some((key, value)) = self
                .advance(&mut cursor)
                .map(|(k, v)| (k.clone(), v.clone()))
            else {
                break;
            };
            f(&value, &key, self);
        }
    }

    /// A detached cursor positioned before the first entry.
    pub fn cursor(&self) -> Cursor {
        Cursor::new()
    }

    /// Step `cursor` and return the entry it lands on.
    pub fn advance(&self, cursor: &mut Cursor) -> Option<(&Value, &Value)> {
        let h = cursor.advance(&self.inner)?;
        h.value(&self.inner).map(|slot| (&slot.key, &slot.value))
    }

    pub fn keys(&self) -> Keys<'_> {
        Keys::new(self.inner.iter())
    }

    pub fn values(&self) -> Values<'_> {
        Values::new(self.inner.iter())
    }

    pub fn entries(&self) -> Entries<'_> {
        Entries::new(self.inner.iter())
    }

    /// Default iteration; same as `entries`.
    pub fn iter(&self) -> Entries<'_> {
        self.entries()
    }

    /// Entries as an `Array` of two-element `Array`s, in order.
    pub fn to_array(&self) -> Array {
        self.iter()
            .map(|(k, v)| Value::Array(Array::from_vec(vec![k.clone(), v.clone()])))
            .collect()
    }
}

fn pairs_of(source: &Value) -> Result<Vec<(Value, Value)>, MapError> {
    let items = match source {
        Value::Undefined | Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items.to_vec(),
        other => {
            debug!("rejecting map source of type {}", other.type_name());
            return Err(MapError::InvalidSourceKind {
                found: other.type_name().to_string(),
            });
        }
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item.as_array() {
            Some(pair) => Ok((pair.get(0), pair.get(1))),
            None => {
                debug!("rejecting map source element {} of type {}", i, item.type_name());
                Err(MapError::InvalidSourceKind {
                    found: format!("{} at index {}", item.type_name(), i),
                })
            }
        })
        .collect()
}

impl TryFrom<&Value> for Map {
    type Error = MapError;

    fn try_from(source: &Value) -> Result<Self, Self::Error> {
        Map::from_source(source)
    }
}

impl<K, V> FromIterator<(K, V)> for Map
where
    K: Into<Value>,
    V: Into<Value>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Map::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, I> Extend<(K, V)> for Map<S, I>
where
    K: Into<Value>,
    V: Into<Value>,
    S: BuildHasher,
    I: HashIndex,
{
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<'a, S, I> IntoIterator for &'a Map<S, I>
where
    S: BuildHasher,
    I: HashIndex,
{
    type Item = (&'a Value, &'a Value);
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

impl<S, I> fmt::Debug for Map<S, I>
where
    S: BuildHasher,
    I: HashIndex,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
