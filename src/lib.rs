//! ordered-keymap: an insertion-ordered map over dynamic keys, with value
//! equality for primitive keys and identity equality for reference keys.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a map with the semantics of a scripting-language `Map` (any value
//!   as key, insertion-order iteration, set/get/has/delete/clear) built from
//!   small layers that can be reasoned about independently.
//! - Layers:
//!   - `KeyHandle`: normalizes a `Value` into the thing that is hashed and
//!     compared. Primitives by value (all NaNs equal, `-0 == +0`); objects,
//!     arrays and functions by allocation.
//!   - `HashIndex`: "insert / find / remove by hash code" capability. The
//!     default is a `hashbrown::HashTable` of slot keys; any implementation
//!     can be substituted without touching equality or ordering.
//!   - `HandleHashMap<K, V, S, I>`: structural map. Generational slot
//!     storage, a doubly-linked list in insertion order, and a sequence
//!     number per entry from a counter that is never reset.
//!   - `Map`: public API over `HandleHashMap<KeyHandle, _>`, plus the
//!     `keys`/`values`/`entries` views and detached `Cursor`s.
//!
//! Constraints
//! - Single-threaded: values are `Rc`-backed, so `Map` is `!Send`/`!Sync`.
//! - O(1) average set/get/has/delete; `size` is never computed by traversal.
//! - The hash index and the linked list always hold the same entries.
//! - Re-setting a key keeps its position; delete + set moves it to the end.
//!
//! Iteration and mutation
//! - Borrowing views (`keys`, `values`, `entries`) hold `&Map`, so the map
//!   cannot change under them.
//! - `for_each` hands the callback `&mut Map`, and `Cursor` does not borrow
//!   at all. Both resume from their last list position: entries removed
//!   ahead are skipped, entries appended at the tail are visited.
//!
//! Errors
//! - Only construction from a source value can fail
//!   (`MapError::InvalidSourceKind`). Every other operation is total and
//!   reports absence through its return value.
//!
//! Notes and non-goals
//! - No internal synchronization; share behind external locking only.
//! - The map holds key and value handles, not the objects themselves;
//!   dropping the map releases them like any other `Rc`.

pub mod cursor;
pub mod error;
pub mod handle_hash_map;
mod handle_hash_map_proptest;
pub mod index;
pub mod iter;
pub mod key;
pub mod map;
pub mod value;

// Public surface
pub use cursor::Cursor;
pub use error::MapError;
pub use index::{BucketIndex, HashIndex};
pub use key::KeyHandle;
pub use map::Map;
pub use value::{Array, Function, Object, Value};
