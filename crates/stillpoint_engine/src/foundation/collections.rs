//! Specialized collection types
//!
//! [`BoundedCache`] is a fixed-capacity map with strict least-recently-used
//! eviction. Recency is kept in an intrusive doubly linked list whose nodes
//! live in a [`SlotMap`], so every operation is O(1) and no node pointers
//! can dangle after eviction.

use slotmap::{new_key_type, SlotMap};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

new_key_type! {
    /// Slot in the recency list
    struct EntryKey;
}

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    /// Towards the least recently used end
    prev: Option<EntryKey>,
    /// Towards the most recently used end
    next: Option<EntryKey>,
}

/// Fixed-capacity LRU cache
///
/// Values are stored as-is; the cache does not protect them from mutation.
/// Callers that modify what they read must go through [`get_cloned`]
/// (copy-on-read) so the cached artifact stays pristine.
///
/// [`get_cloned`]: BoundedCache::get_cloned
#[derive(Debug)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    index: HashMap<K, EntryKey>,
    entries: SlotMap<EntryKey, Entry<K, V>>,
    /// Least recently used
    head: Option<EntryKey>,
    /// Most recently used
    tail: Option<EntryKey>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            entries: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
        }
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value and mark it most recently used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.touch(slot);
        self.entries.get(slot).map(|entry| &entry.value)
    }

    /// Look up a value, mark it most recently used and hand out a copy
    pub fn get_cloned<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        self.get(key).cloned()
    }

    /// Look up a value without affecting recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = *self.index.get(key)?;
        self.entries.get(slot).map(|entry| &entry.value)
    }

    /// Presence check; does not affect recency
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Insert or overwrite a value, marking it most recently used
    ///
    /// Returns the entry evicted to stay within capacity, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&slot) = self.index.get(&key) {
            if let Some(entry) = self.entries.get_mut(slot) {
                entry.value = value;
            }
            self.touch(slot);
            return None;
        }

        if self.capacity == 0 {
            return Some((key, value));
        }

        let slot = self.entries.insert(Entry {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.index.insert(key, slot);
        self.push_back(slot);

        if self.entries.len() > self.capacity {
            return self.evict_lru();
        }
        None
    }

    /// Remove an entry
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let slot = self.index.remove(key)?;
        self.detach(slot);
        self.entries.remove(slot).map(|entry| entry.value)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys ordered from least to most recently used
    pub fn keys_by_recency(&self) -> Vec<&K> {
        let mut keys = Vec::with_capacity(self.entries.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let Some(entry) = self.entries.get(slot) else {
                break;
            };
            keys.push(&entry.key);
            cursor = entry.next;
        }
        keys
    }

    fn evict_lru(&mut self) -> Option<(K, V)> {
        let slot = self.head?;
        self.detach(slot);
        let entry = self.entries.remove(slot)?;
        self.index.remove(&entry.key);
        Some((entry.key, entry.value))
    }

    fn touch(&mut self, slot: EntryKey) {
        if self.tail == Some(slot) {
            return;
        }
        self.detach(slot);
        self.push_back(slot);
    }

    fn detach(&mut self, slot: EntryKey) {
        let Some(entry) = self.entries.get_mut(slot) else {
            return;
        };
        let (prev, next) = (entry.prev.take(), entry.next.take());

        match prev {
            Some(prev) => {
                if let Some(prev_entry) = self.entries.get_mut(prev) {
                    prev_entry.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(next_entry) = self.entries.get_mut(next) {
                    next_entry.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn push_back(&mut self, slot: EntryKey) {
        let old_tail = self.tail;
        if let Some(entry) = self.entries.get_mut(slot) {
            entry.prev = old_tail;
            entry.next = None;
        }
        match old_tail {
            Some(tail) => {
                if let Some(tail_entry) = self.entries.get_mut(tail) {
                    tail_entry.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }
}
