//! Borrowing iteration views over a `Map`.
//!
//! Each view owns its own position in the insertion-ordered list, so any
//! number of views can be advanced independently. A view is single-pass;
//! call the producing method again to restart.

use crate::handle_hash_map::Iter;
use crate::key::KeyHandle;
use crate::map::Slot;
use crate::value::Value;
use core::iter::FusedIterator;

type Raw<'a> = Iter<'a, KeyHandle, Slot>;

/// Entries of a `Map` as `(key, value)` pairs, in insertion order.
pub struct Entries<'a> {
    raw: Raw<'a>,
}

impl<'a> Entries<'a> {
    pub(crate) fn new(raw: Raw<'a>) -> Self {
        Self { raw }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a Value, &'a Value);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.raw.next().map(|(_, _, s)| (&s.key, &s.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

/// Keys of a `Map`, in insertion order.
pub struct Keys<'a> {
    raw: Raw<'a>,
}

impl<'a> Keys<'a> {
    pub(crate) fn new(raw: Raw<'a>) -> Self {
        Self { raw }
    }
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a Value;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.raw.next().map(|(_, _, s)| &s.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

/// Values of a `Map`, in insertion order.
pub struct Values<'a> {
    raw: Raw<'a>,
}

impl<'a> Values<'a> {
    pub(crate) fn new(raw: Raw<'a>) -> Self {
        Self { raw }
    }
}

impl<'a> Iterator for Values<'a> {
    type Item = &'a Value;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.raw.next().map(|(_, _, s)| &s.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl ExactSizeIterator for Entries<'_> {}
impl ExactSizeIterator for Keys<'_> {}
impl ExactSizeIterator for Values<'_> {}
impl FusedIterator for Entries<'_> {}
impl FusedIterator for Keys<'_> {}
impl FusedIterator for Values<'_> {}
