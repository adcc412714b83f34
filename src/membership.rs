//! A reverse index from observations to the canonical groups containing them.

use std::collections::HashMap;

use crate::path;
use crate::path::Path;
use crate::tree::ObsId;
use crate::tree::SetTree;

/// The groups a single observation belongs to.
#[derive(Clone, Debug)]
struct Entry {
    /// The observation identifier.
    id: ObsId,

    /// The path of every leaf group containing the observation, in tree
    /// order.
    groups: Vec<Path>,

    /// Every segment of every group path, normalized and joined by `/`.
    normalized: String,
}

/// A mapping from each observation to the groups that contain it.
///
/// The index is built once per canonical tree. Observations are kept in the
/// order in which they are first encountered during a pre-order traversal of
/// the tree so that lookups are deterministic.
#[derive(Clone, Debug, Default)]
pub struct Membership {
    /// The entries, in first-encountered order.
    entries: Vec<Entry>,

    /// A lookup from observation identifier to position in `entries`.
    lookup: HashMap<ObsId, usize>,
}

impl Membership {
    /// Builds the membership index for a tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::membership::Membership;
    /// use cellsets::tree::SetNode;
    /// use cellsets::tree::SetTree;
    ///
    /// let tree = SetTree::new([SetNode::interior(
    ///     "Cluster A",
    ///     [SetNode::leaf("Subcluster 1", ["cell_7"])],
    /// )]);
    ///
    /// let membership = Membership::from_tree(&tree);
    /// let groups = membership.groups("cell_7").unwrap();
    /// assert_eq!(groups[0].key(), "Cluster A___Subcluster 1");
    /// ```
    pub fn from_tree(tree: &SetTree) -> Self {
        let mut result = Self::default();

        for (group, node) in tree.nodes() {
            let set = match node.set() {
                Some(set) => set,
                None => continue,
            };

            for member in set {
                let i = match result.lookup.get(member.id()) {
                    Some(&i) => i,
                    None => {
                        result.entries.push(Entry {
                            id: member.id().to_string(),
                            groups: Vec::new(),
                            normalized: String::new(),
                        });

                        let i = result.entries.len() - 1;
                        result.lookup.insert(member.id().to_string(), i);
                        i
                    }
                };

                result.entries[i].groups.push(group.clone());
            }
        }

        for entry in result.entries.iter_mut() {
            let segments = entry
                .groups
                .iter()
                .flat_map(|group| group.segments())
                .collect::<Vec<_>>();
            entry.normalized = path::normalize(&segments);
        }

        result
    }

    /// Gets the groups containing the observation.
    pub fn groups(&self, id: &str) -> Option<&[Path]> {
        self.lookup
            .get(id)
            .map(|&i| self.entries[i].groups.as_slice())
    }

    /// Gets the observations whose flattened, normalized group segments
    /// contain `key` as a substring.
    ///
    /// This is a containment match, so a key may match a group whose label
    /// merely contains it (e.g., `cluster 1` also matches `cluster 10`).
    pub fn containing<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.normalized.contains(key))
            .map(|entry| entry.id.as_str())
    }

    /// Gets every observation in the index, in first-encountered order.
    pub fn observations(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.id.as_str())
    }

    /// Gets the number of observations in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SetNode;

    #[test]
    fn observations_in_several_groups_record_each() {
        let tree = SetTree::new([
            SetNode::interior("Leiden", [SetNode::leaf("1", ["a", "b"])]),
            SetNode::interior("Louvain", [SetNode::leaf("7", ["b"])]),
        ]);

        let membership = Membership::from_tree(&tree);
        assert_eq!(membership.len(), 2);
        assert_eq!(membership.observations().collect::<Vec<_>>(), vec!["a", "b"]);

        let keys = membership
            .groups("b")
            .unwrap()
            .iter()
            .map(Path::key)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["Leiden___1", "Louvain___7"]);
        assert!(membership.groups("z").is_none());
    }

    #[test]
    fn containment_spans_group_boundaries() {
        let tree = SetTree::new([
            SetNode::interior("Leiden", [SetNode::leaf("1", ["a"])]),
            SetNode::interior("Louvain", [SetNode::leaf("7", ["a"])]),
        ]);

        let membership = Membership::from_tree(&tree);
        assert_eq!(membership.containing("1/louvain").count(), 1);
        assert_eq!(membership.containing("leiden/7").count(), 0);
    }
}
