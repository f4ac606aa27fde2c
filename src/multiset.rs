use core::{borrow::Borrow, fmt, mem};
use std::collections::VecDeque;

use tracing::debug;

use crate::{iter::Iter, AvlTree, Link, NodeRef, QueryError};

/// An ordered multiset backed by an order-statistics AVL tree.
///
/// Besides membership and ordered traversal, every value knows its rank: [`order`] and
/// [`get_nth`] run in _O(log(n))_, and so does counting the values in a closed interval with
/// [`range_query`].
///
/// Equal values are kept side by side; [`erase`] removes one of them at a time.
///
/// [`order`]: AvlMultiset::order
/// [`get_nth`]: AvlMultiset::get_nth
/// [`range_query`]: AvlMultiset::range_query
/// [`erase`]: AvlMultiset::erase
pub struct AvlMultiset<T> {
    pub(crate) tree: AvlTree<T>,
    pub(crate) root: Link,
}

impl<T> AvlMultiset<T> {
    /// Creates a new, empty `AvlMultiset`.
    pub const fn new() -> Self {
        AvlMultiset {
            tree: AvlTree::new(),
            root: None,
        }
    }

    /// Creates an empty `AvlMultiset` with room for `capacity` values before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        AvlMultiset {
            tree: AvlTree::with_capacity(capacity),
            root: None,
        }
    }

    /// Returns `true` if the multiset contains no values.
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of stored values, counting repeats.
    pub fn len(&self) -> usize {
        self.tree.size_of(self.root)
    }

    /// Returns a handle to the root node, for diagnostics.
    pub fn root(&self) -> Option<NodeRef<'_, T>> {
        NodeRef::from_link(&self.tree, self.root)
    }

    /// Returns a handle to the smallest value.
    pub fn min(&self) -> Option<NodeRef<'_, T>> {
        let min = self.root.map(|root| self.tree.min_in_subtree(root));
        NodeRef::from_link(&self.tree, min)
    }

    /// Returns a handle to the largest value.
    pub fn max(&self) -> Option<NodeRef<'_, T>> {
        let max = self.root.map(|root| self.tree.max_in_subtree(root));
        NodeRef::from_link(&self.tree, max)
    }

    /// Returns a handle to the `k`-th smallest value, counting from 1.
    ///
    /// Returns `None` when `k` is zero or greater than [`len`](Self::len).
    pub fn get_nth(&self, k: usize) -> Option<NodeRef<'_, T>> {
        NodeRef::from_link(&self.tree, self.tree.get_nth(self.root, k))
    }

    /// Returns an iterator over the values in non-decreasing order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.tree, self.root)
    }

    /// Moves the contents out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Removes and drops every value.
    pub fn clear(&mut self) {
        let root = self.root.take();
        if root.is_some() {
            let freed = self.tree.delete_tree(root);
            debug!(freed, "tree torn down");
        }
    }
}

impl<T: Ord> AvlMultiset<T> {
    /// Inserts `value`, keeping any equal values already present.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, value: T) {
        self.root = self.tree.insert(self.root, value);
    }

    /// Removes one value equal to `value`, returning it.
    ///
    /// Erasing a value that is not present does nothing and returns `None`.
    pub fn erase<Q>(&mut self, value: &Q) -> Option<T>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.tree.search(self.root, value)?;
        let (root, removed) = self.tree.remove(self.root, node);
        self.root = root;
        Some(removed)
    }

    /// Returns a handle to a node equal to `value`.
    pub fn search<Q>(&self, value: &Q) -> Option<NodeRef<'_, T>>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        NodeRef::from_link(&self.tree, self.tree.search(self.root, value))
    }

    /// Returns `true` if some stored value equals `value`.
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.search(self.root, value).is_some()
    }

    /// Returns a handle to the first value in order that is `>= value`.
    pub fn lower_bound<Q>(&self, value: &Q) -> Option<NodeRef<'_, T>>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        NodeRef::from_link(&self.tree, self.tree.lower_bound(self.root, value))
    }

    /// Returns a handle to the first value in order that is `> value`.
    pub fn upper_bound<Q>(&self, value: &Q) -> Option<NodeRef<'_, T>>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        NodeRef::from_link(&self.tree, self.tree.upper_bound(self.root, value))
    }

    /// Returns the number of stored values strictly less than `value`.
    pub fn order<Q>(&self, value: &Q) -> usize
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.order(self.root, value)
    }

    /// Returns the number of stored values `v` with `lo <= v <= hi`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvertedRange`] if `lo > hi`.
    pub fn range_query<Q>(&self, lo: &Q, hi: &Q) -> Result<usize, QueryError>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        if lo > hi {
            return Err(QueryError::InvertedRange);
        }

        // Every copy of `hi` is counted, not just the one `search` would find.
        Ok(self.tree.order_inclusive(self.root, hi) - self.tree.order(self.root, lo))
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants(self.root);
    }

    // Reinserts every value of `other` in breadth-first order.
    fn copy_from(&mut self, other: &Self)
    where
        T: Clone,
    {
        let mut queue = VecDeque::new();
        queue.extend(other.root);

        while let Some(id) = queue.pop_front() {
            let node = other.tree.node(id);
            self.insert(node.value.clone());
            queue.extend(node.left());
            queue.extend(node.right());
        }

        debug!(len = self.len(), "tree copied");
    }
}

impl<T> Default for AvlMultiset<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AvlMultiset<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Ord + Clone> Clone for AvlMultiset<T> {
    fn clone(&self) -> Self {
        let mut copy = AvlMultiset::with_capacity(self.len());
        copy.copy_from(self);
        copy
    }

    fn clone_from(&mut self, source: &Self) {
        self.clear();
        self.copy_from(source);
    }
}

impl<T: Ord> FromIterator<T> for AvlMultiset<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = AvlMultiset::new();
        set.extend(iter);
        set
    }
}

impl<T: Ord> Extend<T> for AvlMultiset<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T> IntoIterator for &'a AvlMultiset<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for AvlMultiset<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for AvlMultiset<T> {}

impl<T: fmt::Debug> fmt::Debug for AvlMultiset<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
