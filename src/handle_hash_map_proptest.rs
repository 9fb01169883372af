#![cfg(test)]

// Property tests for HandleHashMap kept inside the crate so they can reach
// the crate-private handle accessors.

use crate::handle_hash_map::{Handle, HandleHashMap};
use crate::index::{BucketIndex, HashIndex};
use core::hash::BuildHasher;
use proptest::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Upsert(usize, i32),
    Remove(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Clear,
    Iterate,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Upsert(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![
                contains_pool.prop_map(|s: String| s),
                "[a-z]{0,5}".prop_map(|s| s)
            ]
            .prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            1 => Just(OpI::Clear),
            1 => Just(OpI::Iterate),
        ];
        proptest::collection::vec(op, 1..60).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Model: an insertion-ordered Vec of (key, value, sequence).
struct Model {
    entries: Vec<(Key, i32, u64)>,
    next_seq: u64,
}

impl Model {
    fn pos(&self, k: &Key) -> Option<usize> {
        self.entries.iter().position(|(kk, _, _)| kk == k)
    }
}

// Invariants exercised across random operation sequences:
// - Upsert on a present key keeps handle, sequence and position; on an absent
//   key it appends at the tail with the next sequence number.
// - `find`/`contains_key` parity and handle stability for live entries.
// - `remove(handle)` returns the owned `(K,V)` matching the model and invalidates the handle.
// - `iter` yields live entries in model order; sequences strictly increase.
// - `clear` empties the map but never resets the sequence counter.
// - Stale handles never resolve; `len`/`is_empty` parity with the model after each op.
fn run_state_machine<S, I>(
    mut sut: HandleHashMap<Key, i32, S, I>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    S: BuildHasher,
    I: HashIndex,
{
    let mut model = Model {
        entries: Vec::new(),
        next_seq: 0,
    };
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            OpI::Upsert(i, v) => {
                let k = key_from(&pool, i);
                let (h, old) = sut.upsert(k.clone(), v);
                match model.pos(&k) {
                    Some(p) => {
                        prop_assert_eq!(old, Some(model.entries[p].1));
                        prop_assert_eq!(Some(&h), live.get(&k), "handle must be stable");
                        prop_assert_eq!(sut.sequence(h), Some(model.entries[p].2));
                        model.entries[p].1 = v;
                    }
                    None => {
                        prop_assert!(old.is_none());
                        prop_assert_eq!(sut.sequence(h), Some(model.next_seq));
                        model.entries.push((k.clone(), v, model.next_seq));
                        model.next_seq += 1;
                        live.insert(k, h);
                    }
                }
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.remove(h).expect("handle valid for removal");
                    prop_assert!(kk == k);
                    let p = model.pos(&k).expect("present in model");
                    let (_, mv, _) = model.entries.remove(p);
                    prop_assert_eq!(vv, mv);
                    stale.push(h);
                } else {
                    prop_assert!(sut.find(&k).is_none());
                    prop_assert!(sut.remove_key(&k).is_none());
                }
            }
            OpI::Find(i) => {
                let k = key_from(&pool, i);
                let s = sut.find(&k);
                prop_assert_eq!(s.is_some(), model.pos(&k).is_some());
                if let Some(h) = s {
                    prop_assert_eq!(Some(&h), live.get(&k));
                }
            }
            OpI::Contains(s) => {
                let has = sut.contains_key(s.as_str());
                let has_model = model.entries.iter().any(|(k, _, _)| k.0 == s);
                prop_assert_eq!(has, has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(&h) = live.get(&k) {
                    match h.value_mut(&mut sut) {
                        Some(vr) => {
                            *vr = vr.saturating_add(d);
                            let p = model.pos(&k).expect("present in model");
                            model.entries[p].1 = model.entries[p].1.saturating_add(d);
                        }
                        None => prop_assert!(false, "live handle should resolve"),
                    }
                }
            }
            OpI::Clear => {
                sut.clear();
                model.entries.clear();
                stale.extend(live.drain().map(|(_, h)| h));
            }
            OpI::Iterate => {
                let got: Vec<(Key, i32)> = sut.iter().map(|(_, k, v)| (k.clone(), *v)).collect();
                let want: Vec<(Key, i32)> =
                    model.entries.iter().map(|(k, v, _)| (k.clone(), *v)).collect();
                prop_assert_eq!(got, want);
                let seqs: Vec<u64> = sut.iter().filter_map(|(h, _, _)| sut.sequence(h)).collect();
                prop_assert!(seqs.windows(2).all(|w| w[0] < w[1]));
            }
        }

        // Post-conditions after each op
        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.entries.len());
        prop_assert_eq!(sut.is_empty(), model.entries.is_empty());
        prop_assert_eq!(
            sut.first().and_then(|h| h.key(&sut).cloned()),
            model.entries.first().map(|(k, _, _)| k.clone())
        );
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(HandleHashMap::new(), pool, ops)?;
    }
}

// Collision variant using a constant hasher to stress equality resolution.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state-machine invariants as above, under worst-case
// collision behavior (constant hasher), over both index implementations.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(HandleHashMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }

    #[test]
    fn prop_state_machine_bucket_index((pool, ops) in arb_scenario()) {
        let sut = HandleHashMap::with_hasher_and_index(
            std::collections::hash_map::RandomState::new(),
            BucketIndex::default(),
        );
        run_state_machine(sut, pool, ops)?;
    }
}
