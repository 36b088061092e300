//! Ordered, keyed parameter lists.
//!
//! A `ParamList` mixes positional entries (`Key::Index`) and named entries
//! (`Key::Name`) while keeping insertion order. It is the payload of every message
//! and the container behind persistent and transient storage.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::RandomState;
use indexmap::IndexMap;
use relay_core::fast_hasher;

use super::value::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    Name(Rc<str>),
}

/// Borrowed lookup key. Variant order matches `Key` so both hash identically.
#[derive(Hash)]
enum KeyRef<'a> {
    Index(usize),
    Name(&'a str),
}

impl indexmap::Equivalent<Key> for KeyRef<'_> {
    fn equivalent(&self, key: &Key) -> bool {
        match (self, key) {
            (KeyRef::Index(a), Key::Index(b)) => a == b,
            (KeyRef::Name(a), Key::Name(b)) => *a == &**b,
            _ => false,
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(Rc::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(Rc::from(s))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(n) => f.write_str(n),
        }
    }
}

#[derive(Clone)]
pub struct ParamList {
    entries: IndexMap<Key, Value, RandomState>,
    next_index: usize,
}

/// Shared mutable storage container.
pub type Storage = Rc<RefCell<ParamList>>;

pub fn new_storage() -> Storage {
    Rc::new(RefCell::new(ParamList::new()))
}

impl ParamList {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::with_hasher(fast_hasher()),
            next_index: 0,
        }
    }

    /// Builds a list of positional entries.
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut list = Self::new();
        for v in values {
            list.push(v);
        }
        list
    }

    /// Builder form of [`ParamList::set`].
    pub fn with(mut self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Appends a value at the next free positional index.
    pub fn push(&mut self, value: impl Into<Value>) {
        let idx = self.next_index;
        self.entries.insert(Key::Index(idx), value.into());
        self.next_index = idx.saturating_add(1);
    }

    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        if let Key::Index(i) = key {
            if i >= self.next_index {
                self.next_index = i.saturating_add(1);
            }
        }
        self.entries.insert(key, value.into())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&KeyRef::Name(name))
    }

    pub fn at(&self, index: usize) -> Option<&Value> {
        self.entries.get(&KeyRef::Index(index))
    }

    /// Named entry first, positional entry as fallback.
    pub fn get_either(&self, name: &str, index: usize) -> Option<&Value> {
        self.get(name).or_else(|| self.at(index))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.entries.iter()
    }
}

impl Default for ParamList {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ParamList {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .zip(other.entries.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Debug for ParamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl fmt::Display for ParamList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match k {
                Key::Index(_) => write!(f, "{v}")?,
                Key::Name(n) => write!(f, "{n}={v}")?,
            }
        }
        f.write_str("]")
    }
}
