use core::fmt::{self, Write};
use std::collections::VecDeque;

use crate::{arena::NodeId, AvlMultiset, AvlTree, Link};

impl<T> AvlTree<T> {
    // Nodes are keyed by arena index, so repeated values render as distinct vertices.
    fn dotgraph<W>(&self, root: Link, name: &str, mut w: W) -> fmt::Result
    where
        W: Write,
        T: fmt::Display,
    {
        let root = match root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item {
            Node(NodeId),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        while !queue.is_empty() {
            let remaining = queue.len();

            write!(w, "{{rank=same; ")?;

            for _ in 0..remaining {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let id = match item {
                    Item::Node(id) => id,
                    Item::Missing(m) => {
                        write!(w, "\"graph{name}-missing{m}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let node = self.node(id);
                let index = id.to_index();
                write!(
                    w,
                    "\"graph{name}-{index}\" [label=\"{}:{}:{}\"]; ",
                    node.value,
                    node.balance.factor(),
                    node.size
                )?;

                // Leaves get no placeholder children.
                if node.is_leaf() {
                    continue;
                }

                for child in [node.left(), node.right()] {
                    if let Some(child) = child {
                        let child_index = child.to_index();
                        queue.push_back(Item::Node(child));
                        writeln!(
                            links,
                            "\"graph{name}-{index}\" -> \"graph{name}-{child_index}\";"
                        )?;
                    } else {
                        queue.push_back(Item::Missing(missing));
                        writeln!(
                            links,
                            "\"graph{name}-{index}\" -> \"graph{name}-missing{missing}\";"
                        )?;
                        missing += 1;
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}

impl<T: fmt::Display> AvlMultiset<T> {
    /// Writes the tree as a Graphviz digraph, one rank per tree level.
    ///
    /// Each node is labelled `value:balance:size`.
    ///
    /// # Errors
    ///
    /// Propagates any error returned by `w`.
    pub fn dotgraph<W: Write>(&self, name: &str, w: W) -> fmt::Result {
        self.tree.dotgraph(self.root, name, w)
    }
}
