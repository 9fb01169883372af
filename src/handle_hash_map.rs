//! HandleHashMap: structural layer with stable handles and insertion order.
//!
//! Entries live in a generational `SlotMap`, are found through a
//! `HashIndex` keyed by their stored hash, and are threaded in a
//! doubly-linked list in insertion order. Each entry is stamped with a
//! sequence number taken from a counter that only ever grows, so the list
//! is always sorted by sequence.

use crate::index::HashIndex;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }

    pub fn key<'a, K, V, S, I>(&self, map: &'a HandleHashMap<K, V, S, I>) -> Option<&'a K>
    where
        K: Eq + Hash,
        S: BuildHasher,
        I: HashIndex,
    {
        map.handle_key(*self)
    }

    pub fn value<'a, K, V, S, I>(&self, map: &'a HandleHashMap<K, V, S, I>) -> Option<&'a V>
    where
        K: Eq + Hash,
        S: BuildHasher,
        I: HashIndex,
    {
        map.handle_value(*self)
    }

    pub fn value_mut<'a, K, V, S, I>(
        &self,
        map: &'a mut HandleHashMap<K, V, S, I>,
    ) -> Option<&'a mut V>
    where
        K: Eq + Hash,
        S: BuildHasher,
        I: HashIndex,
    {
        map.handle_value_mut(*self)
    }
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
    seq: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

pub struct HandleHashMap<K, V, S = RandomState, I = HashTable<DefaultKey>> {
    hasher: S,
    index: I,
    slots: SlotMap<DefaultKey, Entry<K, V>>, // storage using generational keys
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
    next_seq: u64,
}

impl<K, V> HandleHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V> Default for HandleHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over entries of `HandleHashMap` in insertion order.
pub struct Iter<'a, K, V> {
    slots: &'a SlotMap<DefaultKey, Entry<K, V>>,
    cur: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let e = self.slots.get(k)?;
        self.cur = e.next;
        self.remaining -= 1;
        Some((Handle::new(k), &e.key, &e.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> core::iter::FusedIterator for Iter<'_, K, V> {}

impl<K, V, S> HandleHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_hasher_and_index(hasher, HashTable::new())
    }
}

impl<K, V, S, I> HandleHashMap<K, V, S, I>
where
    K: Eq + Hash,
    S: BuildHasher,
    I: HashIndex,
{
    pub fn with_hasher_and_index(hasher: S, index: I) -> Self {
        debug_assert!(index.is_empty());
        Self {
            hasher,
            index,
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
            next_seq: 0,
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn lookup<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.index.find(hash, |k| {
            self.slots
                .get(k)
                .map(|e| e.key.borrow() == q)
                .unwrap_or(false)
        })
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.lookup(hash, q).map(Handle::new)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    /// Insert `key`, or replace the value of an existing equal key in place.
    ///
    /// A replaced entry keeps its handle, sequence number and list
    /// position, and the previous value is returned. A new entry is
    /// appended at the tail with the next sequence number.
    pub fn upsert(&mut self, key: K, value: V) -> (Handle, Option<V>) {
        let hash = self.make_hash(&key);
        if let Some(k) = self.lookup(hash, &key) {
            if let Some(e) = self.slots.get_mut(k) {
                let old = core::mem::replace(&mut e.value, value);
                return (Handle::new(k), Some(old));
            }
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let prev = self.tail;
        let k = self.slots.insert(Entry {
            key,
            value,
            hash,
            seq,
            prev,
            next: None,
        });
        match prev.and_then(|p| self.slots.get_mut(p)) {
            Some(p) => p.next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        let slots = &self.slots;
        self.index
            .insert(hash, k, |kk| slots.get(kk).map(|e| e.hash).unwrap_or(0));
        debug_assert_eq!(self.index.len(), self.slots.len());
        (Handle::new(k), None)
    }

    pub fn remove(&mut self, handle: Handle) -> Option<(K, V)> {
        let k = handle.raw_handle();

        // Remove slot
        let entry = self.slots.remove(k)?;

        // Unlink from the order list
        match entry.prev.and_then(|p| self.slots.get_mut(p)) {
            Some(p) => p.next = entry.next,
            None => self.head = entry.next,
        }
        match entry.next.and_then(|n| self.slots.get_mut(n)) {
            Some(n) => n.prev = entry.prev,
            None => self.tail = entry.prev,
        }

        // Unlink from index
        let unindexed = self.index.remove(entry.hash, k);
        debug_assert!(unindexed, "live slot missing from index");

        Some((entry.key, entry.value))
    }

    pub fn remove_key<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.find(q)?;
        self.remove(h)
    }

    /// Drop every entry. The sequence counter keeps counting.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    pub fn first(&self) -> Option<Handle> {
        self.head.map(Handle::new)
    }

    /// Successor of a live entry; `None` at the tail or for a stale handle.
    pub fn next_of(&self, h: Handle) -> Option<Handle> {
        self.slots.get(h.raw_handle())?.next.map(Handle::new)
    }

    /// Sequence number of a live entry.
    pub fn sequence(&self, h: Handle) -> Option<u64> {
        self.slots.get(h.raw_handle()).map(|e| e.seq)
    }

    /// Earliest live entry whose sequence number is greater than `seq`.
    ///
    /// Walks backwards from the tail, so the cost is the number of entries
    /// newer than `seq`.
    pub fn first_after(&self, seq: u64) -> Option<Handle> {
        let mut found = None;
        let mut cur = self.tail;
        while let Some(k) = cur {
            let e = self.slots.get(k)?;
            if e.seq <= seq {
                break;
            }
            found = Some(k);
            cur = e.prev;
        }
        found.map(Handle::new)
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&K> {
        self.slots.get(h.raw_handle()).map(|e| &e.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        self.slots.get(h.raw_handle()).map(|e| &e.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        self.slots.get_mut(h.raw_handle()).map(|e| &mut e.value)
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            cur: self.head,
            remaining: self.slots.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BucketIndex;

    #[derive(Clone, Default)]
    struct ConstBuildHasher;
    struct ConstHasher;
    impl BuildHasher for ConstBuildHasher {
        type Hasher = ConstHasher;
        fn build_hasher(&self) -> Self::Hasher {
            ConstHasher
        }
    }
    impl core::hash::Hasher for ConstHasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn finish(&self) -> u64 {
            0
        } // force all keys into the same hash bucket
    }

    fn keys<S: BuildHasher, I: HashIndex>(m: &HandleHashMap<String, i32, S, I>) -> Vec<&str> {
        m.iter().map(|(_, k, _)| k.as_str()).collect()
    }

    /// Invariant: Upserting an existing key replaces the value in place and keeps
    /// the handle, sequence number and position.
    #[test]
    fn upsert_existing_replaces_in_place() {
        let mut m: HandleHashMap<String, i32> = HandleHashMap::new();
        let (h1, old) = m.upsert("a".to_string(), 1);
        assert!(old.is_none());
        m.upsert("b".to_string(), 2);
        let seq = m.sequence(h1);

        let (h2, old) = m.upsert("a".to_string(), 10);
        assert_eq!(old, Some(1));
        assert_eq!(h1, h2);
        assert_eq!(m.sequence(h2), seq);
        assert_eq!(h1.value(&m), Some(&10));
        assert_eq!(keys(&m), ["a", "b"]);
        assert_eq!(m.len(), 2);
    }

    /// Invariant: `find(k).is_some() == contains_key(k)` for present/absent keys.
    #[test]
    fn find_contains_parity() {
        let mut m: HandleHashMap<String, i32> = HandleHashMap::new();
        let present = ["a", "b", "c"];
        for (i, k) in present.iter().enumerate() {
            m.upsert((*k).to_string(), i as i32);
        }

        for k in present {
            assert!(m.find(k).is_some());
            assert!(m.contains_key(k));
        }
        for k in ["x", "y", "z"] {
            assert!(m.find(k).is_none());
            assert!(!m.contains_key(k));
        }
    }

    /// Invariant: Handle-based access yields references while the entry exists and
    /// becomes `None` after removal. Mutating via `value_mut` updates the stored value.
    #[test]
    fn handle_access_and_mutation() {
        let mut m: HandleHashMap<String, i32> = HandleHashMap::new();
        let (h, _) = m.upsert("k1".to_string(), 10);
        assert_eq!(h.key(&m), Some(&"k1".to_string()));
        if let Some(v) = h.value_mut(&mut m) {
            *v += 5;
        }
        assert_eq!(h.value(&m), Some(&15));

        let (k, v) = m.remove(h).unwrap();
        assert_eq!((k.as_str(), v), ("k1", 15));
        assert!(h.value(&m).is_none());
        assert!(m.remove(h).is_none(), "double remove is a no-op");
    }

    /// Invariant: A removed entry's handle does not alias an entry inserted
    /// afterward, even if the physical slot is reused (generational keys).
    #[test]
    fn stale_handle_does_not_alias_new_entry() {
        let mut m: HandleHashMap<String, i32> = HandleHashMap::new();
        let (h1, _) = m.upsert("old".to_string(), 1);
        m.remove(h1).unwrap();
        let (h2, _) = m.upsert("new".to_string(), 2);
        assert_ne!(h1, h2, "handles must differ across generations");
        assert!(h1.value(&m).is_none(), "stale handle must not resolve");
        assert!(m.next_of(h1).is_none());
        assert!(m.sequence(h1).is_none());
    }

    /// Invariant: Removal from head, middle and tail keeps the list linked in
    /// insertion order, and re-inserting a removed key appends it at the tail.
    #[test]
    fn remove_relinks_and_reinsert_moves_to_tail() {
        let mut m: HandleHashMap<String, i32> = HandleHashMap::new();
        for (i, k) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            m.upsert((*k).to_string(), i as i32);
        }
        m.remove_key("c").unwrap();
        assert_eq!(keys(&m), ["a", "b", "d", "e"]);
        m.remove_key("a").unwrap();
        assert_eq!(keys(&m), ["b", "d", "e"]);
        m.remove_key("e").unwrap();
        assert_eq!(keys(&m), ["b", "d"]);

        m.upsert("a".to_string(), 0);
        assert_eq!(keys(&m), ["b", "d", "a"]);
        let back: Vec<_> = {
            let mut out = Vec::new();
            let mut cur = m.first();
            while let Some(h) = cur {
                out.push(h.key(&m).unwrap().clone());
                cur = m.next_of(h);
            }
            out
        };
        assert_eq!(back, ["b", "d", "a"]);
    }

    /// Invariant: Sequence numbers grow strictly across removals and clear; they
    /// are never reused.
    #[test]
    fn sequence_survives_clear() {
        let mut m: HandleHashMap<String, i32> = HandleHashMap::new();
        let (a, _) = m.upsert("a".to_string(), 1);
        let (b, _) = m.upsert("b".to_string(), 2);
        assert_eq!(m.sequence(a), Some(0));
        assert_eq!(m.sequence(b), Some(1));
        m.remove(b);
        let (c, _) = m.upsert("c".to_string(), 3);
        assert_eq!(m.sequence(c), Some(2));

        m.clear();
        assert!(m.is_empty());
        assert!(m.first().is_none());
        assert!(!m.contains_key("a"));
        let (d, _) = m.upsert("a".to_string(), 4);
        assert_eq!(m.sequence(d), Some(3));
        assert_eq!(keys(&m), ["a"]);
    }

    /// Invariant: `first_after(seq)` returns the earliest live entry newer than `seq`.
    #[test]
    fn first_after_skips_old_and_removed() {
        let mut m: HandleHashMap<String, i32> = HandleHashMap::new();
        for (i, k) in ["a", "b", "c", "d"].iter().enumerate() {
            m.upsert((*k).to_string(), i as i32);
        }
        let c = m.find("c").unwrap();
        assert_eq!(m.first_after(0).and_then(|h| h.key(&m).cloned()).as_deref(), Some("b"));
        m.remove_key("b");
        assert_eq!(m.first_after(0), Some(c));
        assert!(m.first_after(3).is_none());
        assert_eq!(m.first_after(u64::MAX), None);
    }

    /// Invariant: Iteration yields each live entry exactly once, in insertion order,
    /// with an exact length.
    #[test]
    fn iteration_in_insertion_order() {
        let mut m: HandleHashMap<String, i32> = HandleHashMap::new();
        for (i, k) in ["k3", "k1", "k2"].iter().enumerate() {
            m.upsert((*k).to_string(), i as i32);
        }
        let it = m.iter();
        assert_eq!(it.len(), 3);
        let seen: Vec<(String, i32)> = it.map(|(_, k, v)| (k.clone(), *v)).collect();
        assert_eq!(
            seen,
            vec![("k3".into(), 0), ("k1".into(), 1), ("k2".into(), 2)]
        );
    }

    /// Invariant: Lookups work under heavy hash collisions; equality resolves to the
    /// correct entry. This also exercises collision probing via `Eq`.
    #[test]
    fn collision_handling_with_const_hasher() {
        let mut m: HandleHashMap<String, i32, ConstBuildHasher> =
            HandleHashMap::with_hasher(ConstBuildHasher);
        m.upsert("a".to_string(), 1);
        m.upsert("b".to_string(), 2);

        let ha = m.find("a").expect("find a");
        let hb = m.find("b").expect("find b");
        assert_ne!(ha, hb);
        assert_eq!(ha.value(&m), Some(&1));
        assert_eq!(hb.value(&m), Some(&2));

        m.remove(ha).unwrap();
        assert!(!m.contains_key("a"));
        assert_eq!(m.find("b"), Some(hb));
    }

    /// Invariant: Behavior is the same over a different index implementation.
    #[test]
    fn bucket_index_substitutes() {
        let mut m: HandleHashMap<String, i32, ConstBuildHasher, BucketIndex> =
            HandleHashMap::with_hasher_and_index(ConstBuildHasher, BucketIndex::default());
        m.upsert("a".to_string(), 1);
        m.upsert("b".to_string(), 2);
        m.upsert("a".to_string(), 3);
        assert_eq!(keys(&m), ["a", "b"]);
        assert_eq!(m.find("a").and_then(|h| h.value(&m).copied()), Some(3));
        m.remove_key("a");
        assert_eq!(keys(&m), ["b"]);
        m.clear();
        assert!(m.is_empty());
    }
}
