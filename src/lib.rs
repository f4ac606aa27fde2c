//! An order-statistics AVL tree.
//!
//! [`AvlMultiset`] keeps its values in a height-balanced binary search tree whose nodes also
//! record the size of the subtree below them. On top of the usual ordered-set operations this
//! gives _O(log(n))_ rank and select queries:
//!
//! - [`order`](AvlMultiset::order) counts the stored values strictly less than a key,
//! - [`get_nth`](AvlMultiset::get_nth) returns the `k`-th smallest value (1-indexed),
//! - [`range_query`](AvlMultiset::range_query) counts the values inside a closed interval.
//!
//! ```
//! use avl_rank::AvlMultiset;
//!
//! let set: AvlMultiset<i32> = [1, 2, 3, 5, 6].into_iter().collect();
//!
//! assert_eq!(set.order(&4), 3);
//! assert_eq!(set.get_nth(4).map(|n| *n.value()), Some(5));
//! assert_eq!(set.range_query(&1, &4), Ok(3));
//! assert_eq!(set.lower_bound(&4).map(|n| *n.value()), Some(5));
//! ```
//!
//! Equal values may be stored more than once; the collection is an ordered multiset.

// Conventions used in comments:
// - The balance factor of a node is `height(left) - height(right)`; positive means left-heavy.
// - A subtree "grew" or "shrank" when its height changed by one level.
//
// Invariants between public operations:
// 1. An in-order walk is non-decreasing.
// 2. Every balance factor is -1, 0 or 1, and matches the actual subtree heights.
// 3. `size(x) = 1 + size(left(x)) + size(right(x))`.
// 4. `parent(child(x)) = x`, and the root has no parent.
//
// Nodes live in an arena and refer to each other by `NodeId`; the root is held by the owning
// container and threaded through the structural operations, which hand back the new root.

use core::{borrow::Borrow, cmp::Ordering, mem, ops::Not};

use tracing::trace;

mod arena;
mod balance;
mod debug;
mod error;
mod iter;
mod multiset;
mod node;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use balance::Balance;
pub use error::QueryError;
pub use iter::Iter;
pub use multiset::AvlMultiset;
pub use node::NodeRef;

use arena::{Arena, NodeId};
use node::Node;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

pub(crate) type Link = Option<NodeId>;

/// Node storage plus the tree algorithms operating on it.
pub(crate) struct AvlTree<T> {
    nodes: Arena<Node<T>>,
}

impl<T> AvlTree<T> {
    pub(crate) const fn new() -> AvlTree<T> {
        AvlTree {
            nodes: Arena::new(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> AvlTree<T> {
        AvlTree {
            nodes: Arena::with_capacity(capacity),
        }
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<T> {
        self.nodes.get(id)
    }

    #[inline]
    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        self.nodes.get_mut(id)
    }

    #[inline]
    pub(crate) fn size_of(&self, link: Link) -> usize {
        link.map_or(0, |id| self.node(id).size)
    }

    #[inline]
    fn set_child(&mut self, parent: NodeId, dir: Dir, child: Link) {
        self.node_mut(parent).children[dir as usize] = child;
    }

    #[inline]
    fn maybe_set_parent(&mut self, opt_node: Link, parent: Link) {
        if let Some(node) = opt_node {
            self.node_mut(node).parent = parent;
        }
    }

    pub(crate) fn which_child(&self, parent: NodeId, child: NodeId) -> Dir {
        if self.node(parent).left() == Some(child) {
            Dir::Left
        } else {
            debug_assert_eq!(
                self.node(parent).right(),
                Some(child),
                "`child` must be a child of `parent`"
            );
            Dir::Right
        }
    }

    // Points whatever referenced `old_child` (a child slot of `parent`, or the root handle) at
    // `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    #[inline]
    fn replace_child_or_set_root(
        &mut self,
        root: &mut Link,
        parent: Link,
        old_child: NodeId,
        new_child: Link,
    ) {
        match parent {
            Some(parent) => {
                let dir = self.which_child(parent, old_child);
                self.set_child(parent, dir, new_child);
            }
            None => *root = new_child,
        }
    }

    /// Returns the leftmost node of the subtree rooted at `node`.
    pub(crate) fn min_in_subtree(&self, mut node: NodeId) -> NodeId {
        while let Some(left) = self.node(node).left() {
            node = left;
        }
        node
    }

    /// Returns the rightmost node of the subtree rooted at `node`.
    pub(crate) fn max_in_subtree(&self, mut node: NodeId) -> NodeId {
        while let Some(right) = self.node(node).right() {
            node = right;
        }
        node
    }

    /// Returns the in-order successor of `node`.
    pub(crate) fn next(&self, node: NodeId) -> Link {
        if let Some(right) = self.node(node).right() {
            return Some(self.min_in_subtree(right));
        }

        // Climb until arriving from a left edge.
        let mut cur = node;
        while let Some(parent) = self.node(cur).parent {
            if self.node(parent).left() == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }

        None
    }

    /// Returns the in-order predecessor of `node`.
    pub(crate) fn prev(&self, node: NodeId) -> Link {
        if let Some(left) = self.node(node).left() {
            return Some(self.max_in_subtree(left));
        }

        let mut cur = node;
        while let Some(parent) = self.node(cur).parent {
            if self.node(parent).right() == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }

        None
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // Balance factors are not updated; subtree sizes are.
    fn rotate_at(&mut self, root: &mut Link, down: NodeId, up: NodeId) {
        // - `down` becomes the `dir` child of `up`.
        // - `across` goes from the `dir` child of `up` to the `!dir` child of `down`.
        let dir = if self.node(down).right() == Some(up) {
            Dir::Left
        } else {
            Dir::Right
        };

        let across = self.node(up).child(dir);
        self.set_child(down, !dir, across);
        self.maybe_set_parent(across, Some(down));

        self.set_child(up, dir, Some(down));
        let parent = mem::replace(&mut self.node_mut(down).parent, Some(up));
        self.node_mut(up).parent = parent;

        self.replace_child_or_set_root(root, parent, down, Some(up));

        // `up` now spans exactly what `down` used to.
        let spanned = self.node(down).size;
        self.node_mut(up).size = spanned;
        let down_node = self.node(down);
        let size = 1 + self.size_of(down_node.left()) + self.size_of(down_node.right());
        self.node_mut(down).size = size;
    }

    // Restores balance at `z`, which is two levels heavy on `heavy`. Returns the node that took
    // `z`'s place.
    //
    // The resulting top is `Even` unless `z`'s heavy child was itself `Even`, which only happens
    // after a removal; in that case the subtree height is unchanged.
    fn rebalance(&mut self, root: &mut Link, z: NodeId, heavy: Dir) -> NodeId {
        let y = self
            .node(z)
            .child(heavy)
            .expect("heavy side of an unbalanced node must be populated");
        let y_balance = self.node(y).balance;

        if y_balance == Balance::heavy(!heavy) {
            let x = self
                .node(y)
                .child(!heavy)
                .expect("inner grandchild of a double rotation must be populated");

            let (z_balance, y_balance) = match self.node(x).balance {
                b if b == Balance::heavy(heavy) => (Balance::heavy(!heavy), Balance::Even),
                Balance::Even => (Balance::Even, Balance::Even),
                _ => (Balance::Even, Balance::heavy(heavy)),
            };

            self.node_mut(z).balance = z_balance;
            self.node_mut(y).balance = y_balance;
            self.node_mut(x).balance = Balance::Even;

            trace!(node = z.to_index(), ?heavy, "double rotation");
            self.rotate_at(root, y, x);
            self.rotate_at(root, z, x);
            x
        } else {
            let (z_balance, y_balance) = if y_balance == Balance::Even {
                (Balance::heavy(heavy), Balance::heavy(!heavy))
            } else {
                (Balance::Even, Balance::Even)
            };

            self.node_mut(z).balance = z_balance;
            self.node_mut(y).balance = y_balance;

            trace!(node = z.to_index(), ?heavy, "single rotation");
            self.rotate_at(root, z, y);
            y
        }
    }

    /// Inserts `value` into the tree rooted at `root` and returns the new root.
    ///
    /// Equal values are placed to the right of existing ones.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub(crate) fn insert(&mut self, root: Link, value: T) -> Link
    where
        T: Ord,
    {
        let Some(mut parent) = root else {
            // Tree is empty. The new node is the root.
            return Some(self.nodes.alloc(Node::leaf(value, None)));
        };

        // Descend to an empty slot, counting the new node into every subtree on the way.
        let dir = loop {
            let node = self.node_mut(parent);
            node.size += 1;

            let dir = if value < node.value {
                Dir::Left
            } else {
                Dir::Right
            };

            match node.child(dir) {
                Some(child) => parent = child,
                None => break dir,
            }
        };

        let leaf = self.nodes.alloc(Node::leaf(value, Some(parent)));
        self.set_child(parent, dir, Some(leaf));

        let mut root = root;
        self.rebalance_inserted(&mut root, leaf);
        root
    }

    // Walks up from a freshly attached leaf, updating balance factors until the subtree height
    // stops changing.
    fn rebalance_inserted(&mut self, root: &mut Link, leaf: NodeId) {
        let mut child = leaf;

        while let Some(parent) = self.node(child).parent {
            let dir = self.which_child(parent, child);

            match self.node(parent).balance.tilt(dir) {
                // The shorter side caught up; the height of `parent` is unchanged.
                Some(Balance::Even) => {
                    self.node_mut(parent).balance = Balance::Even;
                    return;
                }

                // `parent` grew by one level.
                Some(heavy) => {
                    self.node_mut(parent).balance = heavy;
                    child = parent;
                }

                // A rotation after insertion always restores the pre-insert height.
                None => {
                    self.rebalance(root, parent, dir);
                    return;
                }
            }
        }
    }

    /// Removes `node` from the tree rooted at `root`. Returns the new root and the removed value.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub(crate) fn remove(&mut self, root: Link, node: NodeId) -> (Link, T) {
        let mut root = root;

        // A node with two children keeps its slot and takes its successor's value; the successor,
        // which has no left child, is unlinked in its place.
        let target = match (self.node(node).left(), self.node(node).right()) {
            (Some(_), Some(right)) => {
                let successor = self.min_in_subtree(right);
                let (node, successor_node) = self.nodes.get_pair_mut(node, successor);
                mem::swap(&mut node.value, &mut successor_node.value);
                successor
            }
            _ => node,
        };

        let target_node = self.node(target);
        let child = target_node.left().or(target_node.right());
        let parent = target_node.parent;

        self.maybe_set_parent(child, parent);

        match parent {
            Some(parent) => {
                let dir = self.which_child(parent, target);
                self.set_child(parent, dir, child);

                let mut opt_cur = Some(parent);
                while let Some(cur) = opt_cur {
                    let cur = self.node_mut(cur);
                    cur.size -= 1;
                    opt_cur = cur.parent;
                }

                self.rebalance_removed(&mut root, parent, dir);
            }
            None => root = child,
        }

        let removed = self.nodes.take(target);
        (root, removed.value)
    }

    // Walks up from the parent of an unlinked node whose `dir` subtree shrank, updating balance
    // factors until the subtree height stops changing.
    fn rebalance_removed(&mut self, root: &mut Link, mut parent: NodeId, mut dir: Dir) {
        loop {
            let top = match self.node(parent).balance.tilt(!dir) {
                // The taller side lost its level; `parent` shrank too.
                Some(Balance::Even) => {
                    self.node_mut(parent).balance = Balance::Even;
                    parent
                }

                // `parent` was even and keeps its height.
                Some(heavy) => {
                    self.node_mut(parent).balance = heavy;
                    return;
                }

                None => {
                    let top = self.rebalance(root, parent, !dir);
                    if self.node(top).balance != Balance::Even {
                        return;
                    }
                    top
                }
            };

            let Some(grandparent) = self.node(top).parent else {
                return;
            };

            dir = self.which_child(grandparent, top);
            parent = grandparent;
        }
    }

    /// Frees every node of the tree rooted at `root`, returning how many were freed.
    ///
    /// Leaves are peeled off one at a time with an explicit stack of ancestors, so the walk never
    /// recurses.
    pub(crate) fn delete_tree(&mut self, root: Link) -> usize {
        let mut freed = 0;
        let mut ancestors = Vec::new();
        let mut opt_cur = root;

        while let Some(cur) = opt_cur {
            let node = self.node(cur);

            match node.left().or(node.right()) {
                Some(child) => {
                    ancestors.push(cur);
                    opt_cur = Some(child);
                }
                None => {
                    if let Some(&parent) = ancestors.last() {
                        let dir = self.which_child(parent, cur);
                        self.set_child(parent, dir, None);
                    }

                    self.nodes.free(cur);
                    freed += 1;
                    opt_cur = ancestors.pop();
                }
            }
        }

        debug_assert_eq!(self.nodes.len(), 0, "arena must only hold one tree");
        self.nodes.clear();
        freed
    }

    /// Returns the `k`-th smallest node (1-indexed), or `None` if `k` is out of range.
    pub(crate) fn get_nth(&self, root: Link, mut k: usize) -> Link {
        if k == 0 || k > self.size_of(root) {
            return None;
        }

        let mut opt_cur = root;
        while let Some(cur) = opt_cur {
            let node = self.node(cur);
            let here = 1 + self.size_of(node.left());

            match k.cmp(&here) {
                Ordering::Less => opt_cur = node.left(),
                Ordering::Equal => return Some(cur),
                Ordering::Greater => {
                    k -= here;
                    opt_cur = node.right();
                }
            }
        }

        unreachable!("subtree sizes must cover every rank up to the root size")
    }
}

impl<T> AvlTree<T> {
    /// Returns a node equal to `value`, if any.
    pub(crate) fn search<Q>(&self, root: Link, value: &Q) -> Link
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = root;

        loop {
            let cur = opt_cur?;
            let node = self.node(cur);

            match value.cmp(node.value.borrow()) {
                Ordering::Less => opt_cur = node.left(),
                Ordering::Equal => return Some(cur),
                Ordering::Greater => opt_cur = node.right(),
            }
        }
    }

    /// Returns the first node in order whose value is `>= value`.
    pub(crate) fn lower_bound<Q>(&self, root: Link, value: &Q) -> Link
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut best = None;
        let mut opt_cur = root;

        while let Some(cur) = opt_cur {
            let node = self.node(cur);

            if value.cmp(node.value.borrow()) != Ordering::Greater {
                best = Some(cur);
                opt_cur = node.left();
            } else {
                opt_cur = node.right();
            }
        }

        best
    }

    /// Returns the first node in order whose value is `> value`.
    pub(crate) fn upper_bound<Q>(&self, root: Link, value: &Q) -> Link
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut best = None;
        let mut opt_cur = root;

        while let Some(cur) = opt_cur {
            let node = self.node(cur);

            if value.cmp(node.value.borrow()) == Ordering::Less {
                best = Some(cur);
                opt_cur = node.left();
            } else {
                opt_cur = node.right();
            }
        }

        best
    }

    /// Counts the stored values strictly less than `value`.
    pub(crate) fn order<Q>(&self, root: Link, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.count_below(root, |v: &Q| v < value)
    }

    /// Counts the stored values less than or equal to `value`.
    pub(crate) fn order_inclusive<Q>(&self, root: Link, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.count_below(root, |v: &Q| v <= value)
    }

    // `below` must hold for a prefix of the in-order sequence.
    fn count_below<Q, F>(&self, root: Link, below: F) -> usize
    where
        T: Borrow<Q>,
        Q: ?Sized,
        F: Fn(&Q) -> bool,
    {
        let mut count = 0;
        let mut opt_cur = root;

        while let Some(cur) = opt_cur {
            let node = self.node(cur);

            if below(node.value.borrow()) {
                count += 1 + self.size_of(node.left());
                opt_cur = node.right();
            } else {
                opt_cur = node.left();
            }
        }

        count
    }

    /// Checks every structural invariant of the tree rooted at `root`, panicking on violation.
    pub(crate) fn assert_invariants(&self, root: Link)
    where
        T: Ord,
    {
        let Some(root) = root else {
            assert_eq!(self.nodes.len(), 0, "an empty tree must not hold nodes");
            return;
        };

        assert!(
            self.node(root).parent.is_none(),
            "root must not have a parent"
        );
        self.assert_invariants_at(root);
        assert_eq!(
            self.node(root).size,
            self.nodes.len(),
            "every allocated node must be reachable from the root"
        );

        // Ensure the in-order walk is sorted.
        let mut cur = self.min_in_subtree(root);
        while let Some(next) = self.next(cur) {
            assert!(
                self.node(cur).value <= self.node(next).value,
                "in-order walk must be non-decreasing"
            );
            cur = next;
        }
    }

    // Returns the height of the subtree rooted at `node`.
    fn assert_invariants_at(&self, node: NodeId) -> usize {
        let mut heights = [0; 2];

        for dir in [Dir::Left, Dir::Right] {
            if let Some(child) = self.node(node).child(dir) {
                // Ensure child's parent link points to this node.
                assert_eq!(
                    self.node(child).parent,
                    Some(node),
                    "child's parent link must point at its parent"
                );

                heights[dir as usize] = self.assert_invariants_at(child);
            }
        }

        let node_ref = self.node(node);

        let factor = match heights[0].cmp(&heights[1]) {
            Ordering::Greater if heights[0] - heights[1] == 1 => 1,
            Ordering::Equal => 0,
            Ordering::Less if heights[1] - heights[0] == 1 => -1,
            _ => panic!("subtree heights {heights:?} differ by more than one"),
        };
        assert_eq!(
            node_ref.balance.factor(),
            factor,
            "stored balance must match subtree heights"
        );

        assert_eq!(
            node_ref.size,
            1 + self.size_of(node_ref.left()) + self.size_of(node_ref.right()),
            "subtree size must count both children and the node"
        );

        1 + heights[0].max(heights[1])
    }
}
