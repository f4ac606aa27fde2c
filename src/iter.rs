use core::iter::FusedIterator;

use crate::{AvlTree, Dir, Link};

enum CameFrom {
    Parent,
    LeftChild,
    Here,
    RightChild,
}

/// An in-order iterator over the values of an [`AvlMultiset`](crate::AvlMultiset).
pub struct Iter<'tree, T> {
    tree: &'tree AvlTree<T>,

    front_cur: Link,
    front_from: CameFrom,

    len: usize,
}

impl<'tree, T> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>, root: Link) -> Self {
        Iter {
            tree,

            front_cur: root,
            front_from: CameFrom::Parent,
            len: tree.size_of(root),
        }
    }
}

impl<'tree, T> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let mut cur = self.front_cur?;

        loop {
            let node = self.tree.node(cur);

            match self.front_from {
                CameFrom::Parent => {
                    // Upon entering a new subtree, find the minimum element.
                    cur = self.tree.min_in_subtree(cur);

                    // Its (empty) left subtree has been exhausted.
                    self.front_from = CameFrom::LeftChild;
                }

                CameFrom::LeftChild => {
                    // The left subtree has been exhausted, so this node is up next.
                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::Here;
                    self.len -= 1;

                    return Some(&node.value);
                }

                CameFrom::Here => {
                    if let Some(right) = node.right() {
                        self.front_from = CameFrom::Parent;
                        cur = right;
                    } else if let Some(parent) = node.parent {
                        self.front_from = match self.tree.which_child(parent, cur) {
                            Dir::Left => CameFrom::LeftChild,
                            Dir::Right => CameFrom::RightChild,
                        };
                        cur = parent;
                    } else {
                        unreachable!("iterator ran past the last node with items remaining")
                    }
                }

                CameFrom::RightChild => {
                    // Ascend until we find the successor element.
                    while let Some(parent) = self.tree.node(cur).parent {
                        match self.tree.which_child(parent, cur) {
                            Dir::Left => {
                                cur = parent;
                                break;
                            }
                            Dir::Right => cur = parent,
                        }
                    }

                    self.front_cur = Some(cur);
                    self.front_from = CameFrom::LeftChild;
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}
