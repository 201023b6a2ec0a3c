//! Ascending iteration over the distinct keys of a `KeyedStack`.

use crate::index::{KeyIndex, KeyStack};
use core::iter::FusedIterator;
use core::ptr::NonNull;
use std::collections::btree_map;
use std::fmt;
use std::rc::Rc;

/// Forward iterator over distinct keys in ascending order.
///
/// Clones advance independently. `Keys::default()` is the past-the-end
/// sentinel, and so is the iterator of a stack that never allocated storage.
///
/// Two iterators compare equal when both are past the end, or when both
/// walk the same storage and sit at the same key. Comparing iterators of
/// unrelated storages that still have keys left always yields `false`.
pub struct Keys<'a, K> {
    inner: Option<btree_map::Keys<'a, Rc<K>, KeyStack>>,
    origin: Option<NonNull<KeyIndex<K>>>,
}

impl<'a, K> Keys<'a, K> {
    pub(crate) fn new(index: &'a KeyIndex<K>) -> Self {
        Self {
            inner: Some(index.keys()),
            origin: Some(NonNull::from(index)),
        }
    }
}

impl<K> Default for Keys<'_, K> {
    fn default() -> Self {
        Self {
            inner: None,
            origin: None,
        }
    }
}

impl<K> Clone for Keys<'_, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            origin: self.origin,
        }
    }
}

impl<'a, K> Iterator for Keys<'a, K> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().map(|k| &**k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.inner.as_ref().map_or(0, ExactSizeIterator::len);
        (n, Some(n))
    }
}

impl<K> ExactSizeIterator for Keys<'_, K> {}

impl<K> FusedIterator for Keys<'_, K> {}

impl<K> PartialEq for Keys<'_, K> {
    fn eq(&self, other: &Self) -> bool {
        let remaining = self.len();
        remaining == other.len() && (remaining == 0 || self.origin == other.origin)
    }
}

impl<K> Eq for Keys<'_, K> {}

impl<K: fmt::Debug> fmt::Debug for Keys<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}
