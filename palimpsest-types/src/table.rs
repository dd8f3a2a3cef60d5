//! Id-keyed owning collections.

use std::collections::btree_map::{self, BTreeMap};

use crate::WideId;

/// Anything stored in an [`EntityTable`].
pub trait Entity {
    /// Human-readable kind, used in error messages.
    const KIND: &'static str;

    fn id(&self) -> WideId;
}

/// Canonical store for one entity kind. Owns its values; removal hands the
/// value back to the caller.
#[derive(Debug, Clone)]
pub struct EntityTable<T> {
    rows: BTreeMap<WideId, T>,
}

impl<T> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
        }
    }
}

impl<T: Entity> EntityTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under its own id, returning the value it replaced.
    pub fn insert(&mut self, value: T) -> Option<T> {
        self.rows.insert(value.id(), value)
    }

    pub fn remove(&mut self, id: &WideId) -> Option<T> {
        self.rows.remove(id)
    }

    pub fn get(&self, id: &WideId) -> Option<&T> {
        self.rows.get(id)
    }

    pub fn get_mut(&mut self, id: &WideId) -> Option<&mut T> {
        self.rows.get_mut(id)
    }

    pub fn contains(&self, id: &WideId) -> bool {
        self.rows.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &WideId> {
        self.rows.keys()
    }

    /// Values in id order.
    pub fn iter(&self) -> btree_map::Values<'_, WideId, T> {
        self.rows.values()
    }
}

impl<'a, T> IntoIterator for &'a EntityTable<T> {
    type Item = &'a T;
    type IntoIter = btree_map::Values<'a, WideId, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.values()
    }
}

impl<T: PartialEq> PartialEq for EntityTable<T> {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows
    }
}
