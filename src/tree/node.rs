//! Nodes within a set tree.

use serde::Deserialize;
use serde::Serialize;

use crate::color::Color;
use crate::path::Path;
use crate::path::normalize_segment;

/// An observation identifier (e.g., a cell barcode).
pub type ObsId = String;

/// An error related to a [`SetNode`].
#[derive(Debug)]
pub enum Error {
    /// A node was missing its name.
    MissingName,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MissingName => write!(f, "set node is missing a name"),
        }
    }
}

impl std::error::Error for Error {}

/// A member of a leaf set.
///
/// Members are serialized as `[id, value]` pairs. The value is reserved for
/// per-member metadata and is currently always `null`.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Member(ObsId, Option<f64>);

impl Member {
    /// Creates a new member with no auxiliary value.
    pub fn new(id: impl Into<ObsId>) -> Self {
        Self(id.into(), None)
    }

    /// Gets the observation identifier.
    pub fn id(&self) -> &str {
        &self.0
    }

    /// Gets the auxiliary value.
    pub fn value(&self) -> Option<f64> {
        self.1
    }
}

impl From<&str> for Member {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Member {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// The kind of a [`SetNode`].
#[derive(Clone, Debug, PartialEq)]
pub enum Kind {
    /// A node that groups other nodes.
    Interior(Vec<SetNode>),

    /// A node that directly holds a set of observations.
    Leaf {
        /// The members of the set.
        set: Vec<Member>,

        /// Nodes derived from this set (e.g., its intersections with other
        /// groups). These are displayed beneath the leaf but do not
        /// contribute to its set.
        derived: Vec<SetNode>,
    },
}

/// A named, colored node within a set tree.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct SetNode {
    /// The name, unique among siblings.
    name: String,

    /// The color, if one was assigned to the node itself.
    color: Option<Color>,

    /// The kind of the node.
    kind: Kind,
}

impl SetNode {
    /// Creates a new leaf node.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::tree::SetNode;
    ///
    /// let node = SetNode::leaf("T cells", ["cell_1", "cell_2"]);
    /// assert!(node.is_leaf());
    /// assert_eq!(node.flatten_leaf_set(), vec!["cell_1", "cell_2"]);
    /// ```
    pub fn leaf<I, M>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<Member>,
    {
        Self {
            name: name.into(),
            color: None,
            kind: Kind::Leaf {
                set: members.into_iter().map(Into::into).collect(),
                derived: Vec::new(),
            },
        }
    }

    /// Creates a new interior node.
    pub fn interior(name: impl Into<String>, children: impl IntoIterator<Item = SetNode>) -> Self {
        Self {
            name: name.into(),
            color: None,
            kind: Kind::Interior(children.into_iter().collect()),
        }
    }

    /// Sets the color of the node.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Gets the name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the name.
    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Gets the color assigned to the node itself, if any.
    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Sets the color assigned to the node itself.
    pub(crate) fn set_color(&mut self, color: Color) {
        self.color = Some(color);
    }

    /// Gets the kind.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Returns whether the node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, Kind::Leaf { .. })
    }

    /// Gets the members if this node is a leaf.
    pub fn set(&self) -> Option<&[Member]> {
        match &self.kind {
            Kind::Leaf { set, .. } => Some(set),
            Kind::Interior(_) => None,
        }
    }

    /// Gets the nodes displayed beneath this node: the children of an
    /// interior node or the derived nodes of a leaf.
    pub fn children(&self) -> &[SetNode] {
        match &self.kind {
            Kind::Interior(children) => children,
            Kind::Leaf { derived, .. } => derived,
        }
    }

    /// Gets a mutable reference to the nodes displayed beneath this node.
    pub fn children_mut(&mut self) -> &mut Vec<SetNode> {
        match &mut self.kind {
            Kind::Interior(children) => children,
            Kind::Leaf { derived, .. } => derived,
        }
    }

    /// Finds the direct child whose normalized name matches `name`.
    pub fn child(&self, name: &str) -> Option<&SetNode> {
        let name = normalize_segment(name);
        self.children()
            .iter()
            .find(|child| normalize_segment(&child.name) == name)
    }

    /// Creates a copy of this node and its descendants where each node
    /// carries the color `color_for` returns for its path.
    pub(crate) fn recolored<F>(&self, path: Path, color_for: &F) -> SetNode
    where
        F: Fn(&Path) -> Color,
    {
        let children = self
            .children()
            .iter()
            .map(|child| child.recolored(path.child(child.name()), color_for))
            .collect();

        let kind = match &self.kind {
            Kind::Interior(_) => Kind::Interior(children),
            Kind::Leaf { set, .. } => Kind::Leaf {
                set: set.clone(),
                derived: children,
            },
        };

        SetNode {
            name: self.name.clone(),
            color: Some(color_for(&path)),
            kind,
        }
    }

    /// Collects the observation identifiers denoted by this node.
    ///
    /// For a leaf, this is its own set. For an interior node, this is the
    /// concatenation of every descendant leaf's set in pre-order. Identifiers
    /// that appear in more than one descendant are repeated.
    pub fn flatten_leaf_set(&self) -> Vec<&str> {
        let mut result = Vec::new();
        collect(self, &mut result);
        result
    }

    /// Collects every observation identifier held anywhere beneath this node,
    /// including the node's own set.
    ///
    /// Unlike [`SetNode::flatten_leaf_set()`], the children of a leaf count
    /// toward the result. This is the set a canonical group stands for when a
    /// node in the supplied tree carries both a set and children.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::tree::SetNode;
    ///
    /// let mut node = SetNode::leaf("A", ["1"]);
    /// node.children_mut().push(SetNode::leaf("B", ["2"]));
    ///
    /// assert_eq!(node.flatten_leaf_set(), vec!["1"]);
    /// assert_eq!(node.flatten_group_set(), vec!["1", "2"]);
    /// ```
    pub fn flatten_group_set(&self) -> Vec<&str> {
        let mut result = Vec::new();
        collect_all(self, &mut result);
        result
    }
}

/// Recursively collects leaf members beneath `node`.
fn collect<'a>(node: &'a SetNode, into: &mut Vec<&'a str>) {
    match &node.kind {
        Kind::Leaf { set, .. } => into.extend(set.iter().map(Member::id)),
        Kind::Interior(children) => {
            for child in children {
                collect(child, into);
            }
        }
    }
}

/// Recursively collects the members of `node` and of every node beneath it.
fn collect_all<'a>(node: &'a SetNode, into: &mut Vec<&'a str>) {
    if let Some(set) = node.set() {
        into.extend(set.iter().map(Member::id));
    }

    for child in node.children() {
        collect_all(child, into);
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Serialization
////////////////////////////////////////////////////////////////////////////////////////

/// The on-the-wire shape of a node, where `children` and `set` are both
/// optional.
#[derive(Debug, Default, Deserialize, Serialize)]
pub(crate) struct RawNode {
    /// The name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,

    /// The color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<Color>,

    /// The children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<RawNode>>,

    /// The set members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    set: Option<Vec<Member>>,
}

/// Converts a list of raw nodes, dropping any that are missing a name.
pub(crate) fn from_raw_nodes(nodes: Vec<RawNode>) -> Vec<SetNode> {
    nodes
        .into_iter()
        .filter_map(|raw| match SetNode::try_from(raw) {
            Ok(node) => Some(node),
            Err(err) => {
                tracing::warn!("dropping malformed set node: {err}");
                None
            }
        })
        .collect()
}

impl TryFrom<RawNode> for SetNode {
    type Error = Error;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let name = raw.name.ok_or(Error::MissingName)?;

        // An explicit `children` list (even an empty one) marks a grouping
        // node unless the node also holds members of its own.
        let kind = match (raw.set, raw.children) {
            (Some(set), children) if !set.is_empty() => Kind::Leaf {
                set,
                derived: from_raw_nodes(children.unwrap_or_default()),
            },
            (_, Some(children)) => Kind::Interior(from_raw_nodes(children)),
            (_, None) => Kind::Leaf {
                set: Vec::new(),
                derived: Vec::new(),
            },
        };

        Ok(Self {
            name,
            color: raw.color,
            kind,
        })
    }
}

impl From<SetNode> for RawNode {
    fn from(node: SetNode) -> Self {
        let (children, set) = match node.kind {
            Kind::Interior(children) => (Some(children), None),
            Kind::Leaf { set, derived } => {
                let derived = match derived.is_empty() {
                    true => None,
                    false => Some(derived),
                };

                (derived, Some(set))
            }
        };

        RawNode {
            name: Some(node.name),
            color: node.color,
            children: children.map(|nodes| nodes.into_iter().map(RawNode::from).collect()),
            set,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_nodes_flatten_descendant_sets() {
        let node = SetNode::interior(
            "Root",
            [
                SetNode::leaf("A", ["1", "2"]),
                SetNode::interior("B", [SetNode::leaf("C", ["2", "3"])]),
                SetNode::interior("Empty", []),
            ],
        );

        assert_eq!(node.flatten_leaf_set(), vec!["1", "2", "2", "3"]);
    }

    #[test]
    fn derived_nodes_do_not_contribute_to_a_leaf_set() {
        let mut node = SetNode::leaf("Selection 1", ["1", "2"]);
        node.children_mut()
            .push(SetNode::leaf("Intersection with A", ["9"]));

        assert_eq!(node.flatten_leaf_set(), vec!["1", "2"]);
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn nodes_deserialize_into_the_right_kind() -> Result<(), Box<dyn std::error::Error>> {
        let leaf = serde_json::from_str::<SetNode>(r#"{"name":"A","set":[["1",null]]}"#)?;
        assert!(leaf.is_leaf());
        assert_eq!(leaf.set().map(|s| s.len()), Some(1));

        let interior = serde_json::from_str::<SetNode>(
            r#"{"name":"R","color":[1,2,3],"children":[{"name":"A","set":[]}]}"#,
        )?;
        assert!(!interior.is_leaf());
        assert_eq!(interior.color(), Some(Color::new(1, 2, 3)));

        let empty = serde_json::from_str::<SetNode>(r#"{"name":"E"}"#)?;
        assert!(empty.is_leaf());
        assert!(empty.flatten_leaf_set().is_empty());

        Ok(())
    }

    #[test]
    fn leaves_with_children_keep_them_as_derived_nodes() -> Result<(), Box<dyn std::error::Error>> {
        let node = serde_json::from_str::<SetNode>(
            r#"{"name":"S","set":[["1",null]],"children":[{"name":"I","set":[["1",null]]}]}"#,
        )?;

        assert!(node.is_leaf());
        assert_eq!(node.children()[0].name(), "I");

        let value = serde_json::to_value(&node)?;
        assert_eq!(value["children"][0]["name"], "I");
        assert_eq!(value["set"][0][0], "1");
        assert!(value["set"][0][1].is_null());

        Ok(())
    }

    #[test]
    fn empty_interior_nodes_stay_interior() -> Result<(), Box<dyn std::error::Error>> {
        let node = SetNode::interior("My Selections", Vec::new());
        let value = serde_json::to_value(&node)?;
        assert_eq!(value["children"], serde_json::json!([]));

        let node = serde_json::from_value::<SetNode>(value)?;
        assert!(!node.is_leaf());
        assert!(node.children().is_empty());

        let node = serde_json::from_str::<SetNode>(r#"{"name":"G","set":[],"children":[]}"#)?;
        assert!(!node.is_leaf());

        Ok(())
    }

    #[test]
    fn group_sets_include_children_of_mixed_nodes() -> Result<(), Box<dyn std::error::Error>> {
        let node = serde_json::from_str::<SetNode>(
            r#"{"name":"A","set":[["1",null]],"children":[{"name":"B","set":[["2",null]]}]}"#,
        )?;

        assert_eq!(node.flatten_leaf_set(), vec!["1"]);
        assert_eq!(node.flatten_group_set(), vec!["1", "2"]);

        let interior = SetNode::interior("R", [node, SetNode::leaf("C", ["3"])]);
        assert_eq!(interior.flatten_group_set(), vec!["1", "2", "3"]);

        Ok(())
    }

    #[test]
    fn nameless_children_are_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let node = serde_json::from_str::<SetNode>(
            r#"{"name":"R","children":[{"set":[["1",null]]},{"name":"B","set":[["2",null]]}]}"#,
        )?;

        assert_eq!(node.children().len(), 1);
        assert_eq!(node.flatten_leaf_set(), vec!["2"]);

        let err = serde_json::from_str::<SetNode>(r#"{"set":[]}"#).unwrap_err();
        assert!(err.to_string().contains("set node is missing a name"));

        Ok(())
    }
}
