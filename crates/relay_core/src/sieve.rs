//! Bounded cache with SIEVE eviction.
//!
//! Regular entries live in a fixed-size ring scanned by a circular "hand". A hit sets
//! the entry's visited bit; the eviction scan clears set bits as it passes and evicts
//! the first entry whose bit is already clear. Entries that are hit more than once
//! therefore survive a pass over one-shot entries.
//!
//! Pinned entries are kept outside the ring. They never count against the capacity and
//! the hand never reaches them.

use std::hash::Hash;

use crate::hash::{FastHashMap, fast_map_new};

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
    visited: bool,
}

#[derive(Debug)]
pub struct SieveCache<K, V> {
    capacity: usize,
    ring: Vec<Entry<K, V>>,
    index: FastHashMap<K, usize>,
    pinned: FastHashMap<K, V>,
    hand: usize,
}

impl<K: Clone + Eq + Hash, V> SieveCache<K, V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ring: Vec::with_capacity(capacity.min(4096)),
            index: fast_map_new(),
            pinned: fast_map_new(),
            hand: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of entries, pinned ones included.
    pub fn len(&self) -> usize {
        self.ring.len() + self.pinned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pinned_len(&self) -> usize {
        self.pinned.len()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.pinned.contains_key(key) || self.index.contains_key(key)
    }

    pub fn is_pinned(&self, key: &K) -> bool {
        self.pinned.contains_key(key)
    }

    /// Looks up `key`, marking a regular entry as visited on a hit.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(v) = self.pinned.get(key) {
            return Some(v);
        }
        let idx = *self.index.get(key)?;
        let entry = &mut self.ring[idx];
        entry.visited = true;
        Some(&entry.value)
    }

    /// Inserts or updates `key`.
    ///
    /// An existing entry keeps its pin state; only the value changes and the visited
    /// bit is set. Returns the entry evicted to make room, if any.
    pub fn set(&mut self, key: K, value: V, pinned: bool) -> Option<(K, V)> {
        if let Some(slot) = self.pinned.get_mut(&key) {
            *slot = value;
            return None;
        }
        if let Some(&idx) = self.index.get(&key) {
            let entry = &mut self.ring[idx];
            entry.value = value;
            entry.visited = true;
            return None;
        }
        if pinned {
            self.pinned.insert(key, value);
            return None;
        }
        if self.capacity == 0 {
            return None;
        }
        if self.ring.len() < self.capacity {
            self.index.insert(key.clone(), self.ring.len());
            self.ring.push(Entry {
                key,
                value,
                visited: false,
            });
            return None;
        }

        let victim = self.find_victim();
        self.index.insert(key.clone(), victim);
        let old = std::mem::replace(
            &mut self.ring[victim],
            Entry {
                key,
                value,
                visited: false,
            },
        );
        self.index.remove(&old.key);
        Some((old.key, old.value))
    }

    /// Drops every entry, pinned ones included.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.index.clear();
        self.pinned.clear();
        self.hand = 0;
    }

    fn find_victim(&mut self) -> usize {
        let len = self.ring.len();
        for _ in 0..len {
            let idx = self.hand;
            self.hand = (self.hand + 1) % len;
            let entry = &mut self.ring[idx];
            if !entry.visited {
                return idx;
            }
            entry.visited = false;
        }
        // A full lap found every entry visited: take the one right after the hand.
        let idx = self.hand;
        self.hand = (self.hand + 1) % len;
        idx
    }
}
