//! Resolution of selection paths to observation identifiers.
//!
//! A selection path may point into either the canonical tree or the
//! user-defined tree, and the path alone does not say which. Resolution
//! therefore searches both:
//!
//! 1. The canonical tree is searched through its [`Membership`] index. Every
//!    observation whose flattened, normalized group segments _contain_ the
//!    normalized path is included. This is a substring match rather than a
//!    hierarchical prefix match, so a path can also match groups whose labels
//!    merely contain it.
//! 2. The user-defined tree is walked depth-first, and the members of the
//!    leaf whose normalized path is exactly equal to the normalized path are
//!    included. Interior nodes contribute nothing, even on an exact match.
//!
//! The results of (1) followed by (2) are concatenated without removing
//! duplicates.

use crate::membership::Membership;
use crate::path;
use crate::path::NORMALIZED_SEPARATOR;
use crate::path::Path;
use crate::tree::ObsId;
use crate::tree::SetNode;
use crate::tree::SetTree;

/// Resolves selection paths against a canonical membership index and a
/// user-defined tree.
#[derive(Clone, Copy, Debug, Default)]
pub struct Resolver<'a> {
    /// The membership index of the canonical tree.
    membership: Option<&'a Membership>,

    /// The user-defined tree.
    user: Option<&'a SetTree>,
}

impl<'a> Resolver<'a> {
    /// Creates a new resolver.
    ///
    /// Without a membership index, every path resolves to nothing. Without a
    /// user-defined tree, only the canonical tree is searched.
    pub fn new(membership: Option<&'a Membership>, user: Option<&'a SetTree>) -> Self {
        Self { membership, user }
    }

    /// Resolves `path` to the observation identifiers it denotes.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::membership::Membership;
    /// use cellsets::resolve::Resolver;
    /// use cellsets::tree::SetNode;
    /// use cellsets::tree::SetTree;
    ///
    /// let canonical = SetTree::new([SetNode::interior(
    ///     "Cluster A",
    ///     [SetNode::leaf("Subcluster 1", ["cell_7"])],
    /// )]);
    /// let user = SetTree::new([SetNode::interior(
    ///     "My Selections",
    ///     [SetNode::leaf("Selection 1", ["cell_9"])],
    /// )]);
    ///
    /// let membership = Membership::from_tree(&canonical);
    /// let resolver = Resolver::new(Some(&membership), Some(&user));
    ///
    /// assert_eq!(resolver.resolve(&["cluster a"]), vec!["cell_7"]);
    /// assert_eq!(resolver.resolve(&["My Selections", "Selection 1"]), vec!["cell_9"]);
    /// assert!(resolver.resolve::<&str>(&[]).is_empty());
    /// ```
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Vec<ObsId> {
        let membership = match (path.is_empty(), self.membership) {
            (false, Some(membership)) => membership,
            _ => return Vec::new(),
        };

        let key = path::normalize(path);

        let mut result = membership
            .containing(&key)
            .map(String::from)
            .collect::<Vec<_>>();

        if let Some(user) = self.user {
            for node in user.roots() {
                collect_exact(node, "", &key, &mut result);
            }
        }

        result
    }

    /// Resolves a [`Path`].
    pub fn resolve_path(&self, path: &Path) -> Vec<ObsId> {
        let segments = path.segments().collect::<Vec<_>>();
        self.resolve(segments.as_slice())
    }

    /// Resolves each of `paths` in turn.
    pub fn resolve_all(&self, paths: &[Path]) -> Vec<Vec<ObsId>> {
        paths.iter().map(|path| self.resolve_path(path)).collect()
    }
}

/// Walks `node` and its descendants looking for the leaf at exactly `key`.
fn collect_exact(node: &SetNode, prefix: &str, key: &str, into: &mut Vec<ObsId>) {
    let name = path::normalize_segment(node.name());
    let full = match prefix.is_empty() {
        true => name,
        false => format!("{prefix}{NORMALIZED_SEPARATOR}{name}"),
    };

    if full == key {
        if let Some(set) = node.set() {
            into.extend(set.iter().map(|member| member.id().to_string()));
        }

        return;
    }

    // No descendant can match once the walk is past the key's depth.
    if !key.starts_with(&full) {
        return;
    }

    for child in node.children() {
        collect_exact(child, &full, key, into);
    }
}
