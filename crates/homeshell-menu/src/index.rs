//! Path addressing for menu tree nodes.

use std::fmt;

use crate::app_json::FOLDER_ITEMS_KEY;

/// Location of a node in the menu tree: the child offset at each level,
/// starting below the root folder. The empty path is the root folder itself.
///
/// Ordering is lexicographic with a path sorting before its descendants, which
/// matches the order nodes appear in the menu.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MenuIndex(Vec<usize>);

impl MenuIndex {
    /// The root folder.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(path: impl Into<Vec<usize>>) -> Self {
        Self(path.into())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// Index of child `n` of this node. Not bounds checked.
    pub fn child_index(&self, n: usize) -> Self {
        let mut path = self.0.clone();
        path.push(n);
        Self(path)
    }

    /// Index of the folder holding this node. The root is its own parent.
    pub fn parent_index(&self) -> Self {
        let mut path = self.0.clone();
        path.pop();
        Self(path)
    }

    /// Position within the parent folder, or `None` for the root.
    pub fn folder_index(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// Path element at `depth`, or `None` if the path is shorter.
    pub fn index_at_depth(&self, depth: usize) -> Option<usize> {
        self.0.get(depth).copied()
    }

    /// Depth below the root folder: 0 for the root's children, `None` for the
    /// root itself.
    pub fn depth(&self) -> Option<usize> {
        self.0.len().checked_sub(1)
    }

    /// Shift the element at `depth` by `offset`. Does nothing (and returns
    /// false) if `depth` is out of range or the result would be negative.
    pub fn move_index(&mut self, depth: usize, offset: isize) -> bool {
        let Some(element) = self.0.get_mut(depth) else {
            return false;
        };
        match element.checked_add_signed(offset) {
            Some(moved) => {
                *element = moved;
                true
            },
            None => false,
        }
    }

    /// Whether `self` is `ancestor` or lies somewhere below it.
    pub fn is_within(&self, ancestor: &MenuIndex) -> bool {
        self.0.starts_with(&ancestor.0)
    }

    /// Listener key for changes to the contents of the folder at this index.
    /// The root folder uses [`FOLDER_ITEMS_KEY`] itself.
    pub fn listener_key(&self) -> String {
        if self.is_root() {
            FOLDER_ITEMS_KEY.to_string()
        } else {
            format!("{FOLDER_ITEMS_KEY}{self}")
        }
    }
}

impl From<Vec<usize>> for MenuIndex {
    fn from(path: Vec<usize>) -> Self {
        Self(path)
    }
}

impl From<&[usize]> for MenuIndex {
    fn from(path: &[usize]) -> Self {
        Self(path.to_vec())
    }
}

impl fmt::Display for MenuIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for element in &self.0 {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_conventions() {
        let root = MenuIndex::root();
        assert!(root.is_root());
        assert_eq!(root.depth(), None);
        assert_eq!(root.folder_index(), None);
        assert_eq!(root.parent_index(), root);
        assert_eq!(root.to_string(), "/");
        assert_eq!(root.listener_key(), "folder items");
    }

    #[test]
    fn child_and_parent() {
        let index = MenuIndex::root().child_index(1).child_index(4);
        assert_eq!(index.as_slice(), &[1, 4]);
        assert_eq!(index.depth(), Some(1));
        assert_eq!(index.folder_index(), Some(4));
        assert_eq!(index.parent_index(), MenuIndex::new([1]));
        assert_eq!(index.index_at_depth(0), Some(1));
        assert_eq!(index.index_at_depth(2), None);
        assert_eq!(index.to_string(), "/1/4");
        assert_eq!(index.listener_key(), "folder items/1/4");
    }

    #[test]
    fn move_index_bounds() {
        let mut index = MenuIndex::new([2, 0]);
        assert!(index.move_index(0, -2));
        assert_eq!(index, MenuIndex::new([0, 0]));
        assert!(!index.move_index(1, -1));
        assert!(!index.move_index(5, 1));
        assert_eq!(index, MenuIndex::new([0, 0]));
        assert!(index.move_index(1, 3));
        assert_eq!(index, MenuIndex::new([0, 3]));
    }

    #[test]
    fn ordering_puts_prefix_first() {
        let mut indices = vec![
            MenuIndex::new([1]),
            MenuIndex::new([0, 2]),
            MenuIndex::root(),
            MenuIndex::new([0]),
            MenuIndex::new([1, 0]),
        ];
        indices.sort();
        assert_eq!(
            indices,
            vec![
                MenuIndex::root(),
                MenuIndex::new([0]),
                MenuIndex::new([0, 2]),
                MenuIndex::new([1]),
                MenuIndex::new([1, 0]),
            ]
        );
    }

    #[test]
    fn within() {
        let folder = MenuIndex::new([3]);
        assert!(MenuIndex::new([3]).is_within(&folder));
        assert!(MenuIndex::new([3, 1, 0]).is_within(&folder));
        assert!(!MenuIndex::new([4, 3]).is_within(&folder));
        assert!(folder.is_within(&MenuIndex::root()));
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        fn arb_index() -> impl Strategy<Value = MenuIndex> {
            proptest::collection::vec(0usize..8, 0..5).prop_map(MenuIndex::from)
        }

        proptest! {
            #[test]
            fn parent_sorts_before_child(index in arb_index(), n in 0usize..8) {
                let child = index.child_index(n);
                prop_assert!(index < child);
                prop_assert_eq!(child.parent_index(), index);
            }

            #[test]
            fn move_and_back_is_identity(
                index in arb_index(),
                depth in 0usize..5,
                offset in 0isize..4,
            ) {
                let mut moved = index.clone();
                if moved.move_index(depth, offset) {
                    prop_assert!(moved.move_index(depth, -offset));
                }
                prop_assert_eq!(moved, index);
            }

            #[test]
            fn ordering_matches_slices(a in arb_index(), b in arb_index()) {
                prop_assert_eq!(a.cmp(&b), a.as_slice().cmp(b.as_slice()));
            }
        }
    }
}
