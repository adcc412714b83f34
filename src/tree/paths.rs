//! Traversals over the nodes of a set tree.

use crate::path::Path;
use crate::tree::SetNode;

/// A pre-order traversal over every node in a tree, yielding each node with
/// its path.
///
/// The traversal is lazy and finite. Asking the tree for a new traversal
/// restarts it from the beginning, while cloning one forks it at its current
/// position.
#[derive(Clone, Debug)]
pub struct Nodes<'a> {
    /// The nodes left to visit, with the next node on top.
    stack: Vec<(Path, &'a SetNode)>,
}

impl<'a> Nodes<'a> {
    /// Creates a traversal over the provided roots.
    pub(crate) fn new(roots: &'a [SetNode]) -> Self {
        let stack = roots
            .iter()
            .rev()
            .map(|node| (Path::root(node.name()), node))
            .collect();

        Self { stack }
    }
}

impl<'a> Iterator for Nodes<'a> {
    type Item = (Path, &'a SetNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;

        for child in node.children().iter().rev() {
            self.stack.push((path.child(child.name()), child));
        }

        Some((path, node))
    }
}

/// A pre-order traversal over the path of every node in a tree.
#[derive(Clone, Debug)]
pub struct Paths<'a>(Nodes<'a>);

impl<'a> Paths<'a> {
    /// Creates a traversal over the provided roots.
    pub(crate) fn new(roots: &'a [SetNode]) -> Self {
        Self(Nodes::new(roots))
    }
}

impl Iterator for Paths<'_> {
    type Item = Path;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(path, _)| path)
    }
}
