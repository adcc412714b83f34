//! Hierarchies of named, colored observation sets.
//!
//! A [`SetTree`] is an ordered list of root [`SetNode`]s. Two trees exist side
//! by side during a session: the _canonical_ tree supplied with a dataset,
//! which is read-only, and the _user-defined_ tree, which is built up from
//! interactive selections.

use serde::Deserialize;
use serde::Serialize;

use crate::color;
use crate::color::Color;
use crate::color::Theme;
use crate::path::Path;
use crate::path::normalize_segment;

pub mod algebra;
pub mod node;
pub mod paths;

pub use node::Kind;
pub use node::Member;
pub use node::ObsId;
pub use node::SetNode;
pub use paths::Nodes;
pub use paths::Paths;

/// An error related to editing a [`SetTree`].
#[derive(Debug)]
pub enum Error {
    /// No node exists at the path.
    NotFound(Path),

    /// A sibling with the same name already exists.
    DuplicateName(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound(path) => write!(f, "no set exists at path: {path}"),
            Error::DuplicateName(name) => {
                write!(f, "a sibling set is already named `{name}`")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// A hierarchy of observation sets.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(from = "RawTree", into = "RawTree")]
pub struct SetTree {
    /// The schema version reported by the data provider, if any.
    version: Option<String>,

    /// The type of the observations (e.g., `cell`), if reported.
    datatype: Option<String>,

    /// The root nodes.
    tree: Vec<SetNode>,
}

impl SetTree {
    /// Creates a tree from its root nodes.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::tree::SetNode;
    /// use cellsets::tree::SetTree;
    ///
    /// let tree = SetTree::new([SetNode::interior(
    ///     "Leiden",
    ///     [SetNode::leaf("1", ["a", "b"]), SetNode::leaf("2", ["c"])],
    /// )]);
    ///
    /// assert_eq!(tree.roots().len(), 1);
    /// assert_eq!(tree.paths().count(), 3);
    /// ```
    pub fn new(roots: impl IntoIterator<Item = SetNode>) -> Self {
        Self {
            version: None,
            datatype: None,
            tree: roots.into_iter().collect(),
        }
    }

    /// Gets the root nodes.
    pub fn roots(&self) -> &[SetNode] {
        &self.tree
    }

    /// Gets a mutable reference to the root nodes.
    pub fn roots_mut(&mut self) -> &mut Vec<SetNode> {
        &mut self.tree
    }

    /// Returns whether the tree has no roots.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Gets a pre-order traversal over every node and its path.
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes::new(&self.tree)
    }

    /// Gets a pre-order traversal over the path of every node.
    pub fn paths(&self) -> Paths<'_> {
        Paths::new(&self.tree)
    }

    /// Gets the [key](Path::key()) of every node in the tree.
    pub fn keys(&self) -> std::collections::HashSet<String> {
        self.paths().map(|path| path.key()).collect()
    }

    /// Finds the node at `path`, matching names in their normalized form.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::path::Path;
    /// use cellsets::tree::SetNode;
    /// use cellsets::tree::SetTree;
    ///
    /// let tree = SetTree::new([SetNode::interior(
    ///     "Leiden",
    ///     [SetNode::leaf("Cluster 1", ["a"])],
    /// )]);
    ///
    /// let node = tree.node(&Path::try_new(["leiden", "cluster 1"])?).unwrap();
    /// assert_eq!(node.name(), "Cluster 1");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn node(&self, path: &Path) -> Option<&SetNode> {
        let mut segments = path.segments();
        let first = normalize_segment(segments.next()?);

        let mut node = self
            .tree
            .iter()
            .find(|node| normalize_segment(node.name()) == first)?;

        for segment in segments {
            node = node.child(segment)?;
        }

        Some(node)
    }

    /// Finds the node at `path` mutably.
    pub fn node_mut(&mut self, path: &Path) -> Option<&mut SetNode> {
        let mut nodes = &mut self.tree;
        let mut segments = path.segments().peekable();

        while let Some(segment) = segments.next() {
            let segment = normalize_segment(segment);
            let position = nodes
                .iter()
                .position(|node| normalize_segment(node.name()) == segment)?;
            let node = nodes.get_mut(position)?;

            if segments.peek().is_none() {
                return Some(node);
            }

            nodes = node.children_mut();
        }

        None
    }

    /// Gets the siblings of the node at `path` (including the node itself).
    fn siblings_mut(&mut self, path: &Path) -> Option<&mut Vec<SetNode>> {
        match path.parent() {
            Some(parent) => self.node_mut(&parent).map(SetNode::children_mut),
            None => Some(&mut self.tree),
        }
    }

    /// Renames the node at `path`, returning the node's new path.
    pub fn rename(&mut self, path: &Path, name: impl Into<String>) -> Result<Path> {
        let name = name.into();
        let target = normalize_segment(path.name());
        let normalized = normalize_segment(&name);

        let siblings = self
            .siblings_mut(path)
            .ok_or_else(|| Error::NotFound(path.clone()))?;

        if siblings.iter().any(|node| {
            let sibling = normalize_segment(node.name());
            sibling != target && sibling == normalized
        }) {
            return Err(Error::DuplicateName(name));
        }

        let node = siblings
            .iter_mut()
            .find(|node| normalize_segment(node.name()) == target)
            .ok_or_else(|| Error::NotFound(path.clone()))?;

        node.set_name(name.clone());

        Ok(match path.parent() {
            Some(parent) => parent.child(name),
            None => Path::root(name),
        })
    }

    /// Removes and returns the node at `path`.
    pub fn remove(&mut self, path: &Path) -> Option<SetNode> {
        let target = normalize_segment(path.name());
        let siblings = self.siblings_mut(path)?;
        let position = siblings
            .iter()
            .position(|node| normalize_segment(node.name()) == target)?;

        Some(siblings.remove(position))
    }

    /// Sets the color carried by the node at `path`.
    pub fn recolor(&mut self, path: &Path, color: Color) -> Result<()> {
        self.node_mut(path)
            .ok_or_else(|| Error::NotFound(path.clone()))?
            .set_color(color);
        Ok(())
    }

    /// Creates a copy of the tree where every node carries the color resolved
    /// from `table`, falling back to the theme's default color.
    pub fn with_colors(&self, table: &color::Table, theme: Theme) -> SetTree {
        merge_colors(self, table, |_| theme.default_color())
    }
}

/// Creates a copy of `tree` where every node carries a resolved color.
///
/// The color for each node is the entry in `table` for the node's normalized
/// path if one exists. Otherwise, it is `default_color` called with the
/// node's path. The input tree is not modified.
///
/// # Examples
///
/// ```
/// use cellsets::color::Color;
/// use cellsets::color::Table;
/// use cellsets::path::Path;
/// use cellsets::tree::SetNode;
/// use cellsets::tree::SetTree;
/// use cellsets::tree::merge_colors;
///
/// let tree = SetTree::new([SetNode::interior("Leiden", [SetNode::leaf("1", ["a"])])]);
///
/// let mut table = Table::new();
/// table.insert(Path::try_new(["Leiden", "1"])?, Color::new(10, 20, 30));
///
/// let colored = merge_colors(&tree, &table, |path| match path.len() {
///     1 => Color::new(0, 0, 0),
///     _ => Color::new(255, 255, 255),
/// });
///
/// let root = &colored.roots()[0];
/// assert_eq!(root.color(), Some(Color::new(0, 0, 0)));
/// assert_eq!(root.children()[0].color(), Some(Color::new(10, 20, 30)));
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn merge_colors<F>(tree: &SetTree, table: &color::Table, default_color: F) -> SetTree
where
    F: Fn(&Path) -> Color,
{
    let color_for = |path: &Path| table.get(path).unwrap_or_else(|| default_color(path));

    SetTree {
        version: tree.version.clone(),
        datatype: tree.datatype.clone(),
        tree: tree
            .tree
            .iter()
            .map(|node| node.recolored(Path::root(node.name()), &color_for))
            .collect(),
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Serialization
////////////////////////////////////////////////////////////////////////////////////////

/// The on-the-wire shape of a tree.
#[derive(Debug, Default, Deserialize, Serialize)]
struct RawTree {
    /// The schema version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,

    /// The observation type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    datatype: Option<String>,

    /// The root nodes.
    #[serde(default)]
    tree: Vec<node::RawNode>,
}

impl From<RawTree> for SetTree {
    fn from(raw: RawTree) -> Self {
        Self {
            version: raw.version,
            datatype: raw.datatype,
            tree: node::from_raw_nodes(raw.tree),
        }
    }
}

impl From<SetTree> for RawTree {
    fn from(tree: SetTree) -> Self {
        Self {
            version: tree.version,
            datatype: tree.datatype,
            tree: tree.tree.into_iter().map(node::RawNode::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SetTree {
        SetTree::new([
            SetNode::interior(
                "Leiden",
                [SetNode::leaf("1", ["a", "b"]), SetNode::leaf("2", ["c"])],
            ),
            SetNode::interior("Louvain", [SetNode::leaf("1", ["a"])]),
        ])
    }

    #[test]
    fn explicit_colors_survive_the_merge() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut table = color::Table::new();
        table.insert(Path::try_new(["leiden", "1"])?, Color::new(10, 20, 30));

        let colored = tree().with_colors(&table, Theme::Light);

        let path = Path::try_new(["Leiden", "1"])?;
        assert_eq!(
            colored.node(&path).and_then(SetNode::color),
            Some(Color::new(10, 20, 30))
        );

        // A sibling and a node with the same name in another hierarchy both
        // fall back to the default.
        for other in [["Leiden", "2"], ["Louvain", "1"]] {
            assert_eq!(
                colored.node(&Path::try_new(other)?).and_then(SetNode::color),
                Some(Theme::Light.default_color())
            );
        }

        Ok(())
    }

    #[test]
    fn merging_does_not_mutate_the_input() {
        let original = tree();
        let _ = original.with_colors(&color::Table::new(), Theme::Dark);
        assert!(original.nodes().all(|(_, node)| node.color().is_none()));
    }

    #[test]
    fn nodes_can_be_renamed() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut tree = tree();

        let renamed = tree.rename(&Path::try_new(["Leiden", "2"])?, "Two")?;
        assert_eq!(renamed.key(), "Leiden___Two");
        assert!(tree.node(&renamed).is_some());

        let err = tree
            .rename(&Path::try_new(["Leiden", "Two"])?, " 1")
            .unwrap_err();
        assert_eq!(err.to_string(), "a sibling set is already named ` 1`");

        let err = tree.rename(&Path::try_new(["Nope"])?, "x").unwrap_err();
        assert_eq!(err.to_string(), "no set exists at path: Nope");

        Ok(())
    }

    #[test]
    fn nodes_can_be_removed() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut tree = tree();

        let removed = tree.remove(&Path::try_new(["Leiden", "1"])?);
        assert_eq!(removed.map(|node| node.name().to_string()), Some("1".into()));
        assert_eq!(tree.paths().count(), 4);
        assert!(tree.remove(&Path::try_new(["Leiden", "1"])?).is_none());

        Ok(())
    }

    #[test]
    fn trees_round_trip_the_obs_sets_shape() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let json = r#"{
            "version": "0.1.3",
            "datatype": "cell",
            "tree": [
                {"name": "Leiden", "children": [
                    {"name": "1", "color": [255, 0, 0], "set": [["a", null], ["b", null]]}
                ]},
                {"children": []}
            ]
        }"#;

        let tree = serde_json::from_str::<SetTree>(json)?;
        assert_eq!(tree.roots().len(), 1);

        let value = serde_json::to_value(&tree)?;
        assert_eq!(value["version"], "0.1.3");
        assert_eq!(value["tree"][0]["children"][0]["color"][0], 255);
        assert_eq!(serde_json::from_value::<SetTree>(value)?, tree);

        Ok(())
    }
}
