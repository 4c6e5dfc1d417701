//! Index-keyed cache of menu node projections.
//!
//! Keys are [`MenuIndex`] paths, so any insertion or removal in a folder
//! changes the keys of its later siblings and everything below them. The
//! tree resource calls [`MenuItemCache::shift`] after every such change to
//! re-key those entries. For a change at path `P` of depth `d`, an entry `I`
//! is shifted when `I[..d] == P[..d]` and `I[d] >= P[d]`.

use std::collections::BTreeMap;

use crate::index::MenuIndex;

/// A cached value that knows its own index.
pub trait Indexed {
    fn set_index(&mut self, index: MenuIndex);
}

/// Cache entries taken out of the tree while a node moves, keyed relative to
/// the moved node.
#[derive(Debug)]
pub struct DetachedSubtree<V> {
    entries: Vec<(Vec<usize>, V)>,
}

#[derive(Debug)]
pub struct MenuItemCache<V> {
    entries: BTreeMap<MenuIndex, V>,
}

impl<V> Default for MenuItemCache<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V: Indexed> MenuItemCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cache `value` at `index`, returning what was there before.
    pub fn insert(&mut self, index: MenuIndex, mut value: V) -> Option<V> {
        value.set_index(index.clone());
        self.entries.insert(index, value)
    }

    pub fn get(&self, index: &MenuIndex) -> Option<&V> {
        self.entries.get(index)
    }

    pub fn remove(&mut self, index: &MenuIndex) -> Option<V> {
        self.entries.remove(index)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn keys(&self) -> impl Iterator<Item = &MenuIndex> {
        self.entries.keys()
    }

    /// Drop the entry at `index` and every entry below it.
    pub fn evict_subtree(&mut self, index: &MenuIndex) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.is_within(index));
        before - self.entries.len()
    }

    /// Drop the children of `folder` at position `first` or later, with
    /// everything below them.
    pub fn evict_children_from(&mut self, folder: &MenuIndex, first: usize) -> usize {
        let depth = folder.as_slice().len();
        let before = self.entries.len();
        self.entries.retain(|key, _| {
            !(key.as_slice().starts_with(folder.as_slice())
                && key.index_at_depth(depth).is_some_and(|i| i >= first))
        });
        before - self.entries.len()
    }

    /// Keep only the entries for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&V) -> bool) {
        self.entries.retain(|_, value| keep(value));
    }

    /// Re-key every entry at or after `changed` in the same folder, including
    /// their descendants, by `offset` at `changed`'s depth. Entries that would
    /// move to a negative position are dropped.
    pub fn shift(&mut self, changed: &MenuIndex, offset: isize) {
        let Some(depth) = changed.depth() else {
            return;
        };
        let prefix = &changed.as_slice()[..depth];
        let start = changed.as_slice()[depth];
        let affected: Vec<MenuIndex> = self
            .entries
            .keys()
            .filter(|key| {
                key.as_slice().starts_with(prefix)
                    && key.index_at_depth(depth).is_some_and(|i| i >= start)
            })
            .cloned()
            .collect();
        if affected.is_empty() {
            return;
        }
        let mut moved = Vec::with_capacity(affected.len());
        for key in affected {
            if let Some(value) = self.entries.remove(&key) {
                moved.push((key, value));
            }
        }
        for (mut key, mut value) in moved {
            if !key.move_index(depth, offset) {
                log::warn!("Dropping cached menu item {key}: cannot shift by {offset}");
                continue;
            }
            value.set_index(key.clone());
            self.entries.insert(key, value);
        }
    }

    /// Take `index` and its descendants out of the cache.
    pub fn detach_subtree(&mut self, index: &MenuIndex) -> DetachedSubtree<V> {
        let keys: Vec<MenuIndex> = self
            .entries
            .keys()
            .filter(|key| key.is_within(index))
            .cloned()
            .collect();
        let base = index.as_slice().len();
        let entries = keys
            .into_iter()
            .filter_map(|key| {
                let value = self.entries.remove(&key)?;
                Some((key.as_slice()[base..].to_vec(), value))
            })
            .collect();
        DetachedSubtree { entries }
    }

    /// Put detached entries back below a new index.
    pub fn attach_subtree(&mut self, index: &MenuIndex, subtree: DetachedSubtree<V>) {
        for (relative, value) in subtree.entries {
            let mut path = index.as_slice().to_vec();
            path.extend(relative);
            self.insert(MenuIndex::from(path), value);
        }
    }
}
