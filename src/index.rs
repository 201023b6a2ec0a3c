//! KeyIndex: ordered map from each distinct key to the stack of its positions.

use crate::sequence::Position;
use std::collections::btree_map::{self, BTreeMap, Entry, OccupiedEntry};
use std::fmt;
use std::rc::Rc;

/// Positions of every live occurrence of one key, most recent on top.
pub(crate) type KeyStack = Vec<Position>;

/// Ordered index over the distinct keys of a storage instance.
///
/// Each key is held once, as the `Rc<K>` handle shared with the elements of
/// that key. An entry exists iff its stack is non-empty; callers that empty a
/// stack must remove the entry in the same step.
pub(crate) struct KeyIndex<K> {
    map: BTreeMap<Rc<K>, KeyStack>,
}

impl<K> Default for KeyIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> KeyIndex<K> {
    pub(crate) fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    /// Number of distinct keys.
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn keys(&self) -> btree_map::Keys<'_, Rc<K>, KeyStack> {
        self.map.keys()
    }

    pub(crate) fn stacks(&self) -> impl Iterator<Item = (&Rc<K>, &KeyStack)> {
        self.map.iter()
    }
}

impl<K: Ord> KeyIndex<K> {
    /// The shared handle for `key`, if the key is present.
    pub(crate) fn handle(&self, key: &K) -> Option<Rc<K>> {
        self.map.get_key_value(key).map(|(h, _)| Rc::clone(h))
    }

    pub(crate) fn count(&self, key: &K) -> usize {
        self.map.get(key).map_or(0, Vec::len)
    }

    /// Most recent position recorded for `key`.
    pub(crate) fn top(&self, key: &K) -> Option<Position> {
        self.map.get(key).and_then(|s| s.last().copied())
    }

    pub(crate) fn stack_mut(&mut self, key: &K) -> Option<&mut KeyStack> {
        self.map.get_mut(key)
    }

    /// Create an empty stack for a key that is not yet indexed. Returns
    /// false (and changes nothing) if the key is already present.
    pub(crate) fn insert_empty(&mut self, handle: Rc<K>) -> bool {
        match self.map.entry(handle) {
            Entry::Vacant(v) => {
                v.insert(KeyStack::new());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub(crate) fn remove_entry(&mut self, key: &K) -> Option<KeyStack> {
        self.map.remove(key)
    }

    /// Pop the most recent position of `key`, dropping the entry when its
    /// stack runs empty. All comparisons happen before anything changes.
    pub(crate) fn pop_position(&mut self, key: &K) -> Option<Position> {
        let mut entry = self.occupied(key)?;
        let pos = entry.get_mut().pop();
        if entry.get().is_empty() {
            entry.remove();
        }
        pos
    }

    fn occupied(&mut self, key: &K) -> Option<OccupiedEntry<'_, Rc<K>, KeyStack>> {
        let handle = self.handle(key)?;
        match self.map.entry(handle) {
            Entry::Occupied(o) => Some(o),
            Entry::Vacant(_) => None,
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for KeyIndex<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.map.iter().map(|(k, s)| (&**k, s.len())))
            .finish()
    }
}
