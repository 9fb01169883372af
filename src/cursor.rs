//! Detached traversal position over the insertion-ordered list.
//!
//! A `Cursor` does not borrow the map, so the map may be mutated between
//! steps. It remembers the last entry it yielded (handle and sequence
//! number). Advancing follows that entry's `next` link while the entry is
//! live. Once it has been removed, the cursor resumes at the successor it
//! saw when yielding, if that is still live, and otherwise at the earliest
//! live entry with a larger sequence number. Entries removed ahead of the
//! cursor are therefore skipped and entries appended at the tail are
//! reached. Removing each entry as it is visited keeps a full pass linear.

use crate::handle_hash_map::{Handle, HandleHashMap};
use crate::index::HashIndex;
use core::hash::{BuildHasher, Hash};

#[derive(Clone, Debug, Default)]
pub struct Cursor {
    last: Option<(Handle, u64)>,
    // Successor of `last` at the time it was yielded.
    succ: Option<(Handle, u64)>,
    finished: bool,
}

impl Cursor {
    /// A cursor positioned before the first entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the cursor has run off the tail. A finished cursor stays
    /// finished even if entries are appended later.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn advance<K, V, S, I>(&mut self, map: &HandleHashMap<K, V, S, I>) -> Option<Handle>
    where
        K: Eq + Hash,
        S: BuildHasher,
        I: HashIndex,
    {
        if self.finished {
            return None;
        }
        let live = |pos: (Handle, u64)| map.sequence(pos.0) == Some(pos.1);
        let next = match self.last {
            None => map.first(),
            Some(last) if live(last) => map.next_of(last.0),
            // New entries only ever get larger sequence numbers, so a live
            // recorded successor is still the earliest entry after `last`.
            Some(_) if self.succ.is_some_and(live) => self.succ.map(|(h, _)| h),
            Some((_, seq)) => map.first_after(seq),
        };
        match next.and_then(|h| map.sequence(h).map(|seq| (h, seq))) {
            Some(pos) => {
                self.last = Some(pos);
                self.succ = map
                    .next_of(pos.0)
                    .and_then(|n| map.sequence(n).map(|seq| (n, seq)));
                Some(pos.0)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(c: &mut Cursor, m: &HandleHashMap<&'static str, i32>) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Some(h) = c.advance(m) {
            out.push(*h.key(m).unwrap());
        }
        out
    }

    fn filled(keys: &[&'static str]) -> HandleHashMap<&'static str, i32> {
        let mut m = HandleHashMap::new();
        for (i, k) in keys.iter().enumerate() {
            m.upsert(*k, i as i32);
        }
        m
    }

    /// Invariant: Independent cursors do not disturb each other.
    #[test]
    fn cursors_are_independent() {
        let m = filled(&["a", "b", "c"]);
        let mut c1 = Cursor::new();
        let mut c2 = Cursor::new();
        assert_eq!(c1.advance(&m).and_then(|h| h.key(&m).copied()), Some("a"));
        assert_eq!(c1.advance(&m).and_then(|h| h.key(&m).copied()), Some("b"));
        assert_eq!(drain(&mut c2, &m), ["a", "b", "c"]);
        assert_eq!(drain(&mut c1, &m), ["c"]);
        assert!(c1.is_finished());
    }

    /// Invariant: Removing the entry under the cursor resumes at its successor.
    #[test]
    fn removed_current_entry_resumes_at_successor() {
        let mut m = filled(&["a", "b", "c"]);
        let mut c = Cursor::new();
        c.advance(&m);
        c.advance(&m); // at "b"
        m.remove_key("b");
        assert_eq!(drain(&mut c, &m), ["c"]);
    }

    /// Invariant: Entries removed ahead are skipped; entries appended are visited.
    #[test]
    fn skips_removed_ahead_and_visits_appended() {
        let mut m = filled(&["a", "b", "c"]);
        let mut c = Cursor::new();
        c.advance(&m); // at "a"
        m.remove_key("b");
        m.upsert("d", 3);
        assert_eq!(drain(&mut c, &m), ["c", "d"]);
    }

    /// Invariant: After `clear`, the cursor only sees entries inserted afterward.
    #[test]
    fn clear_then_insert() {
        let mut m = filled(&["a", "b"]);
        let mut c = Cursor::new();
        c.advance(&m);
        m.clear();
        m.upsert("a", 9);
        assert_eq!(drain(&mut c, &m), ["a"]);
    }

    /// Invariant: Removing every entry as it is visited walks the whole
    /// list once, resuming through the recorded successor.
    #[test]
    fn remove_each_visited_entry() {
        let keys: Vec<&'static str> = (0..2_000)
            .map(|i| &*Box::leak(format!("k{}", i).into_boxed_str()))
            .collect();
        let mut m = filled(&keys);
        let mut c = Cursor::new();
        let mut seen = Vec::new();
        while let Some(h) = c.advance(&m) {
            let (k, _) = m.remove(h).expect("live");
            seen.push(k);
            // The recorded successor is live, so no tail walk is needed.
            if let Some((n, _)) = c.succ {
                assert_eq!(m.first_after(c.last.unwrap().1), Some(n));
            }
        }
        assert_eq!(seen, keys);
        assert!(m.is_empty());
    }

    /// Invariant: When both the current entry and its recorded successor
    /// are removed, the cursor falls back to the next live entry.
    #[test]
    fn removed_current_and_successor() {
        let mut m = filled(&["a", "b", "c", "d"]);
        let mut c = Cursor::new();
        c.advance(&m); // at "a"
        m.remove_key("a");
        m.remove_key("b");
        assert_eq!(drain(&mut c, &m), ["c", "d"]);
    }

    /// Invariant: A finished cursor stays finished.
    #[test]
    fn finished_is_sticky() {
        let mut m = filled(&["a"]);
        let mut c = Cursor::new();
        assert_eq!(drain(&mut c, &m), ["a"]);
        m.upsert("b", 1);
        assert!(c.advance(&m).is_none());
    }
}
