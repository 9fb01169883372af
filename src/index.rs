//! Hash index capability used by the structural map.
//!
//! The ordered map only needs "insert / lookup / remove by hash code" from
//! its index; equality and ordering live above it. Any type implementing
//! `HashIndex` can be plugged in via `HandleHashMap::with_hasher_and_index`.

use hashbrown::HashTable;
use slotmap::DefaultKey;
use std::collections::HashMap;

/// Storage slots indexed by precomputed hash codes.
///
/// Implementations never hash anything themselves: the caller passes the
/// stored hash, plus an equality probe (`eq`) and, where the index may
/// grow, a way to recover the hash of an already-indexed slot (`rehash`).
pub trait HashIndex {
    /// First slot under `hash` for which `eq` returns true.
    fn find<F>(&self, hash: u64, eq: F) -> Option<DefaultKey>
    where
        F: FnMut(DefaultKey) -> bool;

    /// Index `slot` under `hash`. The caller guarantees `slot` is not
    /// already indexed.
    fn insert<H>(&mut self, hash: u64, slot: DefaultKey, rehash: H)
    where
        H: Fn(DefaultKey) -> u64;

    /// Unindex `slot`. Returns false if it was not indexed under `hash`.
    fn remove(&mut self, hash: u64, slot: DefaultKey) -> bool;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HashIndex for HashTable<DefaultKey> {
    #[inline]
    fn find<F>(&self, hash: u64, mut eq: F) -> Option<DefaultKey>
    where
        F: FnMut(DefaultKey) -> bool,
    {
        HashTable::find(self, hash, |&k| eq(k)).copied()
    }

    #[inline]
    fn insert<H>(&mut self, hash: u64, slot: DefaultKey, rehash: H)
    where
        H: Fn(DefaultKey) -> u64,
    {
        let _ = self.insert_unique(hash, slot, |&k| rehash(k));
    }

    #[inline]
    fn remove(&mut self, hash: u64, slot: DefaultKey) -> bool {
        match self.find_entry(hash, |&k| k == slot) {
            Ok(occupied) => {
                let _ = occupied.remove();
                true
            }
            Err(_) => false,
        }
    }

    fn clear(&mut self) {
        HashTable::clear(self)
    }

    fn len(&self) -> usize {
        HashTable::len(self)
    }
}

/// Index that buckets slots by exact hash code in a `std` `HashMap`.
///
/// Slower than the `hashbrown` table; useful to check that the map's
/// behavior does not depend on the index implementation.
#[derive(Debug, Default)]
pub struct BucketIndex {
    buckets: HashMap<u64, Vec<DefaultKey>>,
    len: usize,
}

impl HashIndex for BucketIndex {
    fn find<F>(&self, hash: u64, mut eq: F) -> Option<DefaultKey>
    where
        F: FnMut(DefaultKey) -> bool,
    {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|&k| eq(k))
    }

    fn insert<H>(&mut self, hash: u64, slot: DefaultKey, _rehash: H)
    where
        H: Fn(DefaultKey) -> u64,
    {
        self.buckets.entry(hash).or_default().push(slot);
        self.len += 1;
    }

    fn remove(&mut self, hash: u64, slot: DefaultKey) -> bool {
        let Some(bucket) = self.buckets.get_mut(&hash) else {
            return false;
        };
        let Some(pos) = bucket.iter().position(|&k| k == slot) else {
            return false;
        };
        bucket.swap_remove(pos);
        if bucket.is_empty() {
            self.buckets.remove(&hash);
        }
        self.len -= 1;
        true
    }

    fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }

    fn len(&self) -> usize {
        self.len
    }
}
