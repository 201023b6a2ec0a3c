use crate::error::StackError;
use crate::iter::Keys;
use crate::storage::Storage;
use std::fmt;
use std::rc::Rc;

/// A stack of `(key, value)` pairs with keyed access and copy-on-write
/// sharing between clones.
///
/// Unkeyed operations (`front`, `pop`) act on the most recently pushed pair.
/// Keyed operations (`front_key`, `pop_key`, `count`) act on the most recent
/// occurrence of a given key. `keys()` lists the distinct keys in ascending
/// order.
///
/// Cloning shares storage in O(1); the first mutation of either clone copies
/// the whole content into private storage. Every mutation is all-or-nothing:
/// if a key comparison or a clone panics part-way, the stack is left exactly
/// as it was before the call.
///
/// ```
/// use keyed_stack::{KeyedStack, StackError};
///
/// let mut s = KeyedStack::new();
/// s.push(1, "a");
/// s.push(2, "b");
/// s.push(1, "c");
/// assert_eq!(s.front(), Ok((&1, &"c")));
/// assert_eq!(s.count(&1), 2);
///
/// let snapshot = s.clone();
/// assert_eq!(s.pop_key(&1), Ok("c"));
/// assert_eq!(s.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
/// assert_eq!(snapshot.count(&1), 2);
/// assert_eq!(KeyedStack::<i32, &str>::new().pop(), Err(StackError::EmptyContainer));
/// ```
pub struct KeyedStack<K, V> {
    storage: Option<Rc<Storage<K, V>>>,
    // False once a `&mut V` into `storage` has been handed out; a clone then
    // copies eagerly instead of sharing.
    shareable: bool,
}

impl<K, V> KeyedStack<K, V> {
    /// Empty stack. Storage is allocated by the first mutation.
    pub const fn new() -> Self {
        Self {
            storage: None,
            shareable: true,
        }
    }

    pub fn len(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recently pushed pair.
    pub fn front(&self) -> Result<(&K, &V), StackError> {
        self.storage
            .as_ref()
            .and_then(|s| s.front())
            .map(|e| (&*e.key, &e.value))
            .ok_or(StackError::EmptyContainer)
    }

    /// Distinct keys, ascending.
    pub fn keys(&self) -> Keys<'_, K> {
        match &self.storage {
            Some(s) => Keys::new(&s.index),
            None => Keys::default(),
        }
    }

    /// Drop this stack's reference to its storage and reset to empty. The
    /// storage itself is freed once no other clone refers to it.
    pub fn clear(&mut self) {
        self.storage = None;
        self.shareable = true;
    }

    /// Whether `a` and `b` currently share the same storage.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        match (&a.storage, &b.storage) {
            (Some(x), Some(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl<K: Ord, V> KeyedStack<K, V> {
    pub fn count(&self, key: &K) -> usize {
        self.storage.as_ref().map_or(0, |s| s.count(key))
    }

    /// Value of the most recent occurrence of `key`.
    pub fn front_key(&self, key: &K) -> Result<&V, StackError> {
        self.storage
            .as_ref()
            .and_then(|s| s.front_key(key))
            .ok_or(StackError::KeyNotFound)
    }
}

impl<K: Ord + Clone, V: Clone> KeyedStack<K, V> {
    /// Push `(key, value)` on top.
    pub fn push(&mut self, key: K, value: V) {
        let mut cow = CowGuard::begin(self, true);
        cow.storage_mut().push(key, value);
        cow.commit();
    }

    /// Remove the most recently pushed pair and return its value.
    pub fn pop(&mut self) -> Result<V, StackError> {
        if self.is_empty() {
            return Err(StackError::EmptyContainer);
        }
        let mut cow = CowGuard::begin(self, true);
        let value = cow
            .storage_mut()
            .pop_front()
            .expect("stack was checked to be non-empty");
        cow.commit();
        Ok(value)
    }

    /// Remove the most recent occurrence of `key` and return its value. The
    /// other pairs keep their relative order.
    pub fn pop_key(&mut self, key: &K) -> Result<V, StackError> {
        if self.count(key) == 0 {
            return Err(StackError::KeyNotFound);
        }
        let mut cow = CowGuard::begin(self, true);
        let value = cow
            .storage_mut()
            .pop_key(key)
            .expect("key was checked to be present");
        cow.commit();
        Ok(value)
    }

    /// The most recently pushed pair, with mutable access to its value.
    ///
    /// Afterwards clones of this stack copy eagerly until the next push or
    /// pop, since the value may have been changed outside the copy-on-write
    /// protocol.
    pub fn front_mut(&mut self) -> Result<(&K, &mut V), StackError> {
        if self.is_empty() {
            return Err(StackError::EmptyContainer);
        }
        CowGuard::begin(self, false).commit();
        let element = self
            .private_storage()
            .front_mut()
            .expect("stack was checked to be non-empty");
        Ok((&*element.key, &mut element.value))
    }

    /// Mutable access to the value of the most recent occurrence of `key`.
    /// Marks the stack unshareable, like `front_mut`.
    pub fn front_key_mut(&mut self, key: &K) -> Result<&mut V, StackError> {
        if self.count(key) == 0 {
            return Err(StackError::KeyNotFound);
        }
        let mut cow = CowGuard::begin(self, false);
        let Some(pos) = cow.storage_mut().top(key) else {
            return Err(StackError::KeyNotFound);
        };
        cow.commit();
        self.private_storage()
            .value_mut(pos)
            .ok_or(StackError::KeyNotFound)
    }

    fn private_storage(&mut self) -> &mut Storage<K, V> {
        self.storage
            .as_mut()
            .and_then(Rc::get_mut)
            .expect("storage must be private after copy-on-write")
    }
}

/// Copy-on-write snapshot around one mutation.
///
/// `begin` makes the stack's storage private (allocating or deep-copying as
/// needed) and sets the shareable flag for the outcome. Dropping the guard
/// without `commit` puts back the storage it displaced and the previous
/// flag, so a mutation that unwinds after the copy leaves no trace.
struct CowGuard<'a, K, V> {
    stack: &'a mut KeyedStack<K, V>,
    // `Some` when `begin` replaced the storage; holds what was there before.
    displaced: Option<Option<Rc<Storage<K, V>>>>,
    shareable: bool,
    armed: bool,
}

impl<'a, K: Ord + Clone, V: Clone> CowGuard<'a, K, V> {
    fn begin(stack: &'a mut KeyedStack<K, V>, mark_shareable: bool) -> Self {
        let private = match &stack.storage {
            None => Some(Rc::new(Storage::new())),
            Some(shared) if Rc::strong_count(shared) > 1 => Some(Rc::new(shared.duplicate())),
            Some(_) => None,
        };
        let displaced = private.map(|fresh| stack.storage.replace(fresh));
        let shareable = core::mem::replace(&mut stack.shareable, mark_shareable);
        Self {
            stack,
            displaced,
            shareable,
            armed: true,
        }
    }

    fn storage_mut(&mut self) -> &mut Storage<K, V> {
        self.stack.private_storage()
    }

    fn commit(mut self) {
        self.armed = false;
    }
}

impl<K, V> Drop for CowGuard<'_, K, V> {
    fn drop(&mut self) {
        if self.armed {
            if let Some(previous) = self.displaced.take() {
                self.stack.storage = previous;
            }
            self.stack.shareable = self.shareable;
        }
    }
}

impl<K, V> Default for KeyedStack<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone, V: Clone> Clone for KeyedStack<K, V> {
    /// O(1) when this stack is shareable; otherwise a deep copy.
    fn clone(&self) -> Self {
        let storage = match &self.storage {
            Some(shared) if !self.shareable => Some(Rc::new(shared.duplicate())),
            other => other.clone(),
        };
        Self {
            storage,
            shareable: true,
        }
    }
}

impl<K: Ord + Clone, V: Clone> Extend<(K, V)> for KeyedStack<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.push(k, v);
        }
    }
}

impl<K: Ord + Clone, V: Clone> FromIterator<(K, V)> for KeyedStack<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut s = Self::new();
        s.extend(iter);
        s
    }
}

impl<'a, K, V> IntoIterator for &'a KeyedStack<K, V> {
    type Item = &'a K;
    type IntoIter = Keys<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for KeyedStack<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        if let Some(s) = &self.storage {
            list.entries(s.sequence.iter().map(|e| (&*e.key, &e.value)));
        }
        list.finish()
    }
}
