//! Generic n-ary tree with path-addressable nodes.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Every node also
//! records its `index`: its parent's index followed by its insertion ordinal
//! among its siblings (the root is `[0]`). Until something is removed this is
//! exactly the path of child positions. The index is bookkeeping only; lookups
//! go through [`Tree::flatten`] and are O(n).
//!
//! All lookups are tolerant. An invalid path or a stale id yields `None` or
//! `false` and leaves the tree untouched.

use std::fmt;

/// Handle to a node of a [`Tree`]. Only meaningful for the tree that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub const fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

const ROOT: NodeId = NodeId(0);

/// A tree element.
#[derive(Clone, Debug)]
pub struct Node<T> {
    value: T,
    parent: Option<NodeId>,
    index: Vec<usize>,
    children: Vec<NodeId>,
    // Children ever added, removed ones included.
    inserted: usize,
}

impl<T> Node<T> {
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Path from the root recorded at insertion time.
    ///
    /// Each step is the insertion ordinal among siblings. Ordinals are never
    /// reused, so live siblings always have distinct indices; once a sibling
    /// has been removed the index no longer matches the current child
    /// positions used by [`Tree::node_at`].
    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of hops from the root.
    pub fn depth(&self) -> usize {
        self.index.len() - 1
    }
}

/// Mutable ordered tree with a traversal cursor.
///
/// # Example
///
/// ```rust
/// use statenest::core::Tree;
///
/// let mut tree = Tree::new("root");
/// tree.add_node("a", &[]);
/// tree.add_node("b", &[]);
/// tree.add_node("c", &[0]);
/// tree.add_node("d", &[0]);
///
/// assert_eq!(tree.flatten_values(), vec![&"a", &"b", &"c", &"d"]);
/// assert_eq!(tree.value_at(&[0, 1]), Some(&"d"));
/// assert_eq!(tree.value_at(&[5]), None);
/// ```
#[derive(Clone, Debug)]
pub struct Tree<T> {
    nodes: Vec<Option<Node<T>>>,
    current: NodeId,
    live: usize,
}

impl<T> Tree<T> {
    /// Create a tree whose root holds `value`. The cursor starts on the root.
    pub fn new(value: T) -> Self {
        let root = Node {
            value,
            parent: None,
            index: vec![0],
            children: Vec::new(),
            inserted: 0,
        };
        Self {
            nodes: vec![Some(root)],
            current: ROOT,
            live: 1,
        }
    }

    pub const fn root(&self) -> NodeId {
        ROOT
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn value(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(Node::value)
    }

    pub fn value_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id).map(Node::value_mut)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    /// Children of `id` in insertion order. Empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    /// Iterate the parents of `id`, nearest first, ending at the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&parent| self.parent(parent))
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Always `false`: the root cannot be removed.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn resolve(&self, path: &[usize]) -> Option<NodeId> {
        path.iter().try_fold(ROOT, |id, &position| {
            self.node(id)?.children.get(position).copied()
        })
    }

    /// Node reached by following child positions from the root.
    /// The empty path names the root.
    pub fn node_at(&self, path: &[usize]) -> Option<NodeId> {
        self.resolve(path)
    }

    pub fn value_at(&self, path: &[usize]) -> Option<&T> {
        self.resolve(path).and_then(|id| self.value(id))
    }

    pub fn value_at_mut(&mut self, path: &[usize]) -> Option<&mut T> {
        let id = self.resolve(path)?;
        self.value_mut(id)
    }

    /// Replace the value at `path`. Returns `false` and does nothing when the
    /// path does not resolve.
    pub fn set_value_at(&mut self, path: &[usize], value: T) -> bool {
        match self.value_at_mut(path) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Append `value` under the node at `path`.
    ///
    /// If any hop of the path is missing nothing is inserted.
    pub fn add_node(&mut self, value: T, path: &[usize]) -> Option<NodeId> {
        let parent = self.resolve(path)?;
        self.add_child(parent, value)
    }

    /// Append `value` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, value: T) -> Option<NodeId> {
        let parent_node = self.node_mut(parent)?;
        let mut index = parent_node.index.clone();
        index.push(parent_node.inserted);
        parent_node.inserted += 1;

        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            value,
            parent: Some(parent),
            index,
            children: Vec::new(),
            inserted: 0,
        }));
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(id);
        }
        self.live += 1;
        Some(id)
    }

    /// Every node except the root.
    ///
    /// For each node, all of its children are emitted first, then the rule is
    /// applied to each child in order. With root `R[A[C, D], B]` this yields
    /// `[A, B, C, D]`.
    pub fn flatten(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.live.saturating_sub(1));
        self.flatten_into(ROOT, &mut out);
        out
    }

    fn flatten_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let children = self.children(id);
        out.extend_from_slice(children);
        for &child in children {
            self.flatten_into(child, out);
        }
    }

    /// Values in [`flatten`](Self::flatten) order.
    pub fn flatten_values(&self) -> Vec<&T> {
        self.flatten()
            .into_iter()
            .filter_map(|id| self.value(id))
            .collect()
    }

    // Cursor

    pub fn current(&self) -> NodeId {
        self.current
    }

    pub fn current_value(&self) -> Option<&T> {
        self.value(self.current)
    }

    /// Move the cursor to `id`. Returns `false` for unknown ids.
    pub fn set_current(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.current = id;
        true
    }

    pub fn move_to_parent(&mut self) -> bool {
        match self.parent(self.current) {
            Some(parent) => {
                self.current = parent;
                true
            }
            None => false,
        }
    }

    pub fn move_to_child(&mut self, position: usize) -> bool {
        match self.children(self.current).get(position).copied() {
            Some(child) => {
                self.current = child;
                true
            }
            None => false,
        }
    }
}

impl<T: PartialEq> Tree<T> {
    /// First node in flatten order whose value equals `value`. O(n).
    pub fn find(&self, value: &T) -> Option<NodeId> {
        self.flatten()
            .into_iter()
            .find(|&id| self.value(id) == Some(value))
    }

    /// Remove the first node below the root whose value equals `value`,
    /// together with its whole subtree.
    ///
    /// Children are searched in order, each child being checked before its
    /// own descendants. Only the first match is removed.
    pub fn remove(&mut self, value: &T) -> bool {
        match self.find_preorder(ROOT, value) {
            Some(id) => {
                self.detach(id);
                true
            }
            None => false,
        }
    }

    fn find_preorder(&self, id: NodeId, value: &T) -> Option<NodeId> {
        for &child in self.children(id) {
            if self.value(child) == Some(value) {
                return Some(child);
            }
            if let Some(found) = self.find_preorder(child, value) {
                return Some(found);
            }
        }
        None
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Some(parent_node) = self.node_mut(parent) {
                parent_node.children.retain(|&child| child != id);
            }
        }

        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(next.0).and_then(Option::take) {
                stack.extend(node.children);
                self.live -= 1;
                if next == self.current {
                    self.current = ROOT;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree<&'static str> {
        // R
        // ├── A
        // │   ├── C
        // │   └── D
        // └── B
        let mut tree = Tree::new("R");
        tree.add_node("A", &[]);
        tree.add_node("B", &[]);
        tree.add_node("C", &[0]);
        tree.add_node("D", &[0]);
        tree
    }

    #[test]
    fn new_tree_has_root_with_index_zero() {
        let tree = Tree::new(1);
        let root = tree.node(tree.root()).unwrap();

        assert_eq!(root.index(), &[0]);
        assert!(root.is_root());
        assert_eq!(tree.current(), tree.root());
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_empty());
    }

    #[test]
    fn flatten_emits_siblings_before_descendants() {
        let tree = sample();
        assert_eq!(tree.flatten_values(), vec![&"A", &"B", &"C", &"D"]);
    }

    #[test]
    fn flatten_recurses_per_branch() {
        // R[A[C[E]], B[D]] -> A, B, C, E, D
        let mut tree = Tree::new("R");
        tree.add_node("A", &[]);
        tree.add_node("B", &[]);
        tree.add_node("C", &[0]);
        tree.add_node("D", &[1]);
        tree.add_node("E", &[0, 0]);

        assert_eq!(tree.flatten_values(), vec![&"A", &"B", &"C", &"E", &"D"]);
    }

    #[test]
    fn child_index_extends_parent_index() {
        let tree = sample();
        let d = tree.node_at(&[0, 1]).unwrap();

        assert_eq!(tree.node(d).unwrap().index(), &[0, 0, 1]);
        assert_eq!(tree.node(d).unwrap().depth(), 2);
    }

    #[test]
    fn invalid_paths_are_neutral() {
        let mut tree = sample();

        assert_eq!(tree.value_at(&[3]), None);
        assert_eq!(tree.value_at(&[1, 0]), None);
        assert!(!tree.set_value_at(&[0, 9], "X"));
        assert_eq!(tree.add_node("X", &[1, 0]), None);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn set_value_at_replaces_payload() {
        let mut tree = sample();

        assert!(tree.set_value_at(&[1], "B2"));
        assert_eq!(tree.value_at(&[1]), Some(&"B2"));
        assert!(tree.set_value_at(&[], "root"));
        assert_eq!(tree.value(tree.root()), Some(&"root"));
    }

    #[test]
    fn find_returns_first_match() {
        let tree = sample();

        let c = tree.find(&"C").unwrap();
        assert_eq!(tree.parent(c), tree.node_at(&[0]));
        assert_eq!(tree.find(&"Z"), None);
    }

    #[test]
    fn remove_discards_subtree() {
        let mut tree = sample();

        assert!(tree.remove(&"A"));
        assert_eq!(tree.flatten_values(), vec![&"B"]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.find(&"C"), None);
    }

    #[test]
    fn remove_stops_at_first_match() {
        let mut tree = Tree::new("R");
        tree.add_node("X", &[]);
        tree.add_node("Y", &[]);
        tree.add_node("X", &[1]);

        assert!(tree.remove(&"X"));
        assert_eq!(tree.flatten_values(), vec![&"Y", &"X"]);
        assert!(!tree.remove(&"missing"));
    }

    #[test]
    fn remove_never_touches_root() {
        let mut tree = Tree::new("R");
        assert!(!tree.remove(&"R"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn cursor_moves_and_falls_back_to_root() {
        let mut tree = sample();

        assert!(tree.move_to_child(0));
        assert!(tree.move_to_child(1));
        assert_eq!(tree.current_value(), Some(&"D"));
        assert!(!tree.move_to_child(0));

        assert!(tree.move_to_parent());
        assert_eq!(tree.current_value(), Some(&"A"));

        assert!(tree.move_to_child(0));
        tree.remove(&"A");
        assert_eq!(tree.current(), tree.root());
        assert!(!tree.move_to_parent());
    }

    #[test]
    fn set_current_rejects_removed_nodes() {
        let mut tree = sample();
        let c = tree.find(&"C").unwrap();
        tree.remove(&"C");

        assert!(!tree.set_current(c));
        assert!(!tree.contains(c));
    }

    #[test]
    fn ancestors_walk_to_root() {
        let tree = sample();
        let d = tree.node_at(&[0, 1]).unwrap();

        let path: Vec<_> = tree
            .ancestors(d)
            .filter_map(|id| tree.value(id))
            .collect();
        assert_eq!(path, vec![&"A", &"R"]);
    }

    #[test]
    fn indices_stay_unique_after_removal() {
        let mut tree = Tree::new("R");
        tree.add_node("X", &[]);
        let y = tree.add_node("Y", &[]).unwrap();
        assert!(tree.remove(&"X"));
        let z = tree.add_node("Z", &[]).unwrap();

        assert_eq!(tree.node(y).unwrap().index(), &[0, 1]);
        assert_eq!(tree.node(z).unwrap().index(), &[0, 2]);
        assert_eq!(tree.node_at(&[1]), Some(z));
    }
}
