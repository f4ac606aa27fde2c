use core::{fmt, ptr};

use crate::{arena::NodeId, AvlTree, Balance, Dir, Link};

pub(crate) struct Node<T> {
    pub(crate) value: T,
    pub(crate) parent: Link,
    pub(crate) children: [Link; 2],
    pub(crate) balance: Balance,
    pub(crate) size: usize,
}

impl<T> Node<T> {
    #[inline]
    pub(crate) const fn leaf(value: T, parent: Link) -> Self {
        Node {
            value,
            parent,
            children: [None; 2],
            balance: Balance::Even,
            size: 1,
        }
    }

    #[inline]
    pub(crate) fn child(&self, dir: Dir) -> Link {
        self.children[dir as usize]
    }

    #[inline]
    pub(crate) fn left(&self) -> Link {
        self.child(Dir::Left)
    }

    #[inline]
    pub(crate) fn right(&self) -> Link {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }
}

/// A read-only handle to one stored value and its position in the tree.
///
/// Handles borrow the container, so they cannot outlive it or observe it mid-mutation.
pub struct NodeRef<'tree, T> {
    tree: &'tree AvlTree<T>,
    id: NodeId,
}

impl<'tree, T> NodeRef<'tree, T> {
    #[inline]
    pub(crate) fn new(tree: &'tree AvlTree<T>, id: NodeId) -> Self {
        NodeRef { tree, id }
    }

    #[inline]
    pub(crate) fn from_link(tree: &'tree AvlTree<T>, link: Link) -> Option<Self> {
        link.map(|id| NodeRef::new(tree, id))
    }

    #[inline]
    fn node(&self) -> &'tree Node<T> {
        self.tree.node(self.id)
    }

    /// Returns the stored value.
    #[inline]
    pub fn value(&self) -> &'tree T {
        &self.node().value
    }

    /// Returns the in-order successor, or `None` at the end of the sequence.
    pub fn next(&self) -> Option<NodeRef<'tree, T>> {
        NodeRef::from_link(self.tree, self.tree.next(self.id))
    }

    /// Returns the in-order predecessor, or `None` at the start of the sequence.
    pub fn prev(&self) -> Option<NodeRef<'tree, T>> {
        NodeRef::from_link(self.tree, self.tree.prev(self.id))
    }

    pub fn left(&self) -> Option<NodeRef<'tree, T>> {
        NodeRef::from_link(self.tree, self.node().left())
    }

    pub fn right(&self) -> Option<NodeRef<'tree, T>> {
        NodeRef::from_link(self.tree, self.node().right())
    }

    pub fn parent(&self) -> Option<NodeRef<'tree, T>> {
        NodeRef::from_link(self.tree, self.node().parent)
    }

    /// Number of nodes in the subtree rooted here, this node included.
    #[inline]
    pub fn size(&self) -> usize {
        self.node().size
    }

    /// Diagnostic balance factor, `height(left) - height(right)`.
    #[inline]
    pub fn balance(&self) -> i8 {
        self.node().balance.factor()
    }

    #[inline]
    pub fn tilt(&self) -> Balance {
        self.node().balance
    }
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<T> PartialEq for NodeRef<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<T> Eq for NodeRef<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for NodeRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("value", self.value())
            .field("balance", &self.balance())
            .field("size", &self.size())
            .finish()
    }
}
