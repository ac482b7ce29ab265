//! Tree - Index-Addressed Ownership Hierarchy
//!
//! The tree owns its nodes in a slot arena. A node is addressed by a
//! [`Position`] (slot index + generation), so positions stay cheap to copy and
//! a position that outlived its node never resolves to a newer occupant of the
//! same slot.
//!
//! Nodes are located by a caller-supplied equality predicate, because the
//! values stored here (flows) are not value-comparable.
//!
//! The tree performs no locking. It assumes a single writer.

use std::fmt;

/// Stable address of a node inside a [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    index: usize,
    generation: u64,
}

impl Position {
    /// Raw slot index (for diagnostics).
    pub fn index(&self) -> usize {
        self.index
    }
}

struct Entry<T> {
    value: T,
    parent: Option<usize>,
    children: Vec<usize>,
}

struct Slot<T> {
    generation: u64,
    entry: Option<Entry<T>>,
}

/// Predicate deciding whether a stored node matches a probe.
pub type Equals<T, Q> = Box<dyn Fn(&T, &Q) -> bool + Send + Sync>;

/// Rooted hierarchy with one parent per non-root node.
///
/// `Q` is the probe type used by [`Tree::search`]; it defaults to `T`.
pub struct Tree<T, Q: ?Sized = T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    root: Position,
    len: usize,
    equals: Equals<T, Q>,
}

impl<T, Q: ?Sized> Tree<T, Q> {
    /// Create a tree holding only `root`.
    pub fn new<F>(root: T, equals: F) -> Self
    where
        F: Fn(&T, &Q) -> bool + Send + Sync + 'static,
    {
        Tree {
            slots: vec![Slot {
                generation: 0,
                entry: Some(Entry {
                    value: root,
                    parent: None,
                    children: Vec::new(),
                }),
            }],
            free: Vec::new(),
            root: Position {
                index: 0,
                generation: 0,
            },
            len: 1,
            equals: Box::new(equals),
        }
    }

    /// Position of the root node.
    pub fn root(&self) -> Position {
        self.root
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// A tree always holds its root, so it is never empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn entry(&self, pos: Position) -> Option<&Entry<T>> {
        self.slots
            .get(pos.index)
            .filter(|slot| slot.generation == pos.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    fn position_of(&self, index: usize) -> Position {
        Position {
            index,
            generation: self.slots[index].generation,
        }
    }

    /// Check whether `pos` still addresses a live node.
    pub fn contains(&self, pos: Position) -> bool {
        self.entry(pos).is_some()
    }

    /// Borrow the value at `pos`.
    pub fn get(&self, pos: Position) -> Option<&T> {
        self.entry(pos).map(|entry| &entry.value)
    }

    /// Mutably borrow the value at `pos`.
    pub fn get_mut(&mut self, pos: Position) -> Option<&mut T> {
        self.slots
            .get_mut(pos.index)
            .filter(|slot| slot.generation == pos.generation)
            .and_then(|slot| slot.entry.as_mut())
            .map(|entry| &mut entry.value)
    }

    /// Parent of `pos`; `None` for the root or a stale position.
    pub fn parent(&self, pos: Position) -> Option<Position> {
        let parent = self.entry(pos)?.parent?;
        Some(self.position_of(parent))
    }

    /// Children of `pos` in insertion order.
    pub fn children(&self, pos: Position) -> Vec<Position> {
        self.entry(pos)
            .map(|entry| {
                entry
                    .children
                    .iter()
                    .map(|&child| self.position_of(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distance from the root (root = 0).
    pub fn depth(&self, pos: Position) -> Option<usize> {
        let mut entry = self.entry(pos)?;
        let mut depth = 0;
        while let Some(parent) = entry.parent {
            depth += 1;
            entry = self.slots[parent].entry.as_ref()?;
        }
        Some(depth)
    }

    /// Attach `child` under `parent`.
    ///
    /// Returns `None` (and drops nothing but the child) when `parent` is not a
    /// live node.
    pub fn add(&mut self, parent: Position, child: T) -> Option<Position> {
        if !self.contains(parent) {
            return None;
        }

        let entry = Entry {
            value: child,
            parent: Some(parent.index),
            children: Vec::new(),
        };

        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index].entry = Some(entry);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                self.slots.len() - 1
            }
        };

        if let Some(parent_entry) = self.slots[parent.index].entry.as_mut() {
            parent_entry.children.push(index);
        }
        self.len += 1;
        Some(self.position_of(index))
    }

    /// Remove the node at `pos` together with its entire subtree.
    ///
    /// Returns the removed values in depth-first order. The root cannot be
    /// removed; asking for it (or for a stale position) returns an empty list.
    pub fn remove(&mut self, pos: Position) -> Vec<T> {
        if pos == self.root || !self.contains(pos) {
            return Vec::new();
        }

        if let Some(parent) = self.entry(pos).and_then(|entry| entry.parent) {
            if let Some(parent_entry) = self.slots[parent].entry.as_mut() {
                parent_entry.children.retain(|&child| child != pos.index);
            }
        }

        let mut removed = Vec::new();
        let mut stack = vec![pos.index];
        while let Some(index) = stack.pop() {
            let slot = &mut self.slots[index];
            let Some(entry) = slot.entry.take() else {
                continue;
            };
            slot.generation += 1;
            self.free.push(index);
            self.len -= 1;
            stack.extend(entry.children.iter().rev());
            removed.push(entry.value);
        }
        removed
    }

    /// Locate the first node (depth-first) matching `probe`.
    pub fn search(&self, probe: &Q) -> Option<Position> {
        self.iter()
            .find(|(_, value)| (self.equals)(*value, probe))
            .map(|(pos, _)| pos)
    }

    /// Visit every node depth-first (pre-order, children in insertion order).
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(Position, &T),
    {
        for (pos, value) in self.iter() {
            visit(pos, value);
        }
    }

    /// Depth-first iterator over `(Position, &T)`.
    pub fn iter(&self) -> DepthFirst<'_, T, Q> {
        DepthFirst {
            tree: self,
            stack: vec![self.root.index],
        }
    }
}

/// Depth-first pre-order iterator returned by [`Tree::iter`].
pub struct DepthFirst<'a, T, Q: ?Sized> {
    tree: &'a Tree<T, Q>,
    stack: Vec<usize>,
}

impl<'a, T, Q: ?Sized> Iterator for DepthFirst<'a, T, Q> {
    type Item = (Position, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some(index) = self.stack.pop() {
            let Some(entry) = tree.slots[index].entry.as_ref() else {
                continue;
            };
            self.stack.extend(entry.children.iter().rev());
            return Some((tree.position_of(index), &entry.value));
        }
        None
    }
}

impl<T: fmt::Debug, Q: ?Sized> fmt::Debug for Tree<T, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|(_, value)| value)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Tree<&'static str> {
        Tree::new("root", |a: &&str, b: &&str| a == b)
    }

    fn order(tree: &Tree<&'static str>) -> Vec<&'static str> {
        let mut seen = Vec::new();
        tree.for_each(|_, value| seen.push(*value));
        seen
    }

    #[test]
    fn test_add_and_depth_first_order() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.add(root, "a").unwrap();
        let b = tree.add(root, "b").unwrap();
        tree.add(a, "a1").unwrap();
        tree.add(a, "a2").unwrap();
        tree.add(b, "b1").unwrap();

        assert_eq!(order(&tree), vec!["root", "a", "a1", "a2", "b", "b1"]);
        assert_eq!(tree.len(), 6);
        assert_eq!(tree.parent(a), Some(root));
        assert_eq!(tree.children(root), vec![a, b]);
    }

    #[test]
    fn test_search_uses_equality_predicate() {
        let mut tree = tree();
        let a = tree.add(tree.root(), "a").unwrap();
        let a1 = tree.add(a, "a1").unwrap();

        assert_eq!(tree.search(&"a1"), Some(a1));
        assert_eq!(tree.depth(a1), Some(2));
        assert_eq!(tree.search(&"missing"), None);
    }

    #[test]
    fn test_remove_takes_whole_subtree() {
        let mut tree = tree();
        let root = tree.root();
        let a = tree.add(root, "a").unwrap();
        let a1 = tree.add(a, "a1").unwrap();
        tree.add(a1, "a1x").unwrap();
        tree.add(root, "b").unwrap();

        let removed = tree.remove(a);
        assert_eq!(removed, vec!["a", "a1", "a1x"]);
        assert_eq!(order(&tree), vec!["root", "b"]);
        assert_eq!(tree.len(), 2);
        assert!(!tree.contains(a1));
        assert!(tree.search(&"a1x").is_none());
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut tree = tree();
        tree.add(tree.root(), "a").unwrap();
        assert!(tree.remove(tree.root()).is_empty());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_stale_position_never_resolves_to_new_occupant() {
        let mut tree = tree();
        let root = tree.root();
        let old = tree.add(root, "old").unwrap();
        tree.remove(old);

        let new = tree.add(root, "new").unwrap();
        assert_eq!(new.index(), old.index());
        assert_ne!(new, old);
        assert!(tree.get(old).is_none());
        assert!(tree.add(old, "orphan").is_none());
        assert_eq!(tree.get(new), Some(&"new"));
    }

    #[test]
    fn test_probe_type_differs_from_value_type() {
        let mut tree: Tree<(u32, &str), u32> = Tree::new((1, "root"), |node, id| node.0 == *id);
        let child = tree.add(tree.root(), (7, "child")).unwrap();
        assert_eq!(tree.search(&7), Some(child));
        if let Some(node) = tree.get_mut(child) {
            node.1 = "renamed";
        }
        assert_eq!(tree.get(child), Some(&(7, "renamed")));
    }
}
