//! Selection state shared by linked views.
//!
//! The selection holds three independent lists of paths:
//!
//! - the _selected_ paths, which drive the analytic views (in order),
//! - the _checked_ paths, which feed set operations, and
//! - the _expanded_ paths, which control which tree nodes are open.
//!
//! Each list holds at most one path per normalized form, keeping the first
//! occurrence. Paths may point into either the canonical tree or the
//! user-defined tree, so the lists can be [partitioned](Selection::partition)
//! before being handed to each tree's widget.

use std::collections::HashSet;

use crate::path::Path;
use crate::tree::SetTree;

/// Removes later duplicates (by normalized form) from `paths`.
fn dedup(paths: impl IntoIterator<Item = Path>) -> Vec<Path> {
    let mut seen = HashSet::new();

    paths
        .into_iter()
        .filter(|path| seen.insert(path.normalized()))
        .collect()
}

/// Returns whether two lists hold the same paths in the same order after
/// normalization.
fn same(a: &[Path], b: &[Path]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b.iter())
            .all(|(a, b)| a.normalized() == b.normalized())
}

/// The selection state.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    /// The selected paths.
    selected: Vec<Path>,

    /// The checked paths.
    checked: Vec<Path>,

    /// The expanded paths.
    expanded: Vec<Path>,
}

impl Selection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets the selected paths.
    pub fn selected(&self) -> &[Path] {
        &self.selected
    }

    /// Gets the checked paths.
    pub fn checked(&self) -> &[Path] {
        &self.checked
    }

    /// Gets the expanded paths.
    pub fn expanded(&self) -> &[Path] {
        &self.expanded
    }

    /// Replaces the selected paths, returning whether they changed.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::path::Path;
    /// use cellsets::selection::Selection;
    ///
    /// let mut selection = Selection::new();
    ///
    /// let a = Path::try_new(["Leiden", "1"])?;
    /// let b = Path::try_new(["leiden", "1 "])?;
    ///
    /// assert!(selection.select([a.clone(), b.clone()]));
    /// assert_eq!(selection.selected(), &[a]);
    ///
    /// // Selecting an equivalent path is not a change.
    /// assert!(!selection.select([b]));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn select(&mut self, paths: impl IntoIterator<Item = Path>) -> bool {
        replace(&mut self.selected, paths)
    }

    /// Replaces the checked paths, returning whether they changed.
    pub fn check(&mut self, paths: impl IntoIterator<Item = Path>) -> bool {
        replace(&mut self.checked, paths)
    }

    /// Replaces the expanded paths, returning whether they changed.
    pub fn expand(&mut self, paths: impl IntoIterator<Item = Path>) -> bool {
        replace(&mut self.expanded, paths)
    }

    /// Drops `path` and every path beneath it from each list, returning
    /// whether the selected paths changed.
    pub fn forget(&mut self, path: &Path) -> bool {
        let before = self.selected.len();

        for paths in [&mut self.selected, &mut self.checked, &mut self.expanded] {
            paths.retain(|p| !p.starts_with(path));
        }

        self.selected.len() != before
    }

    /// Rewrites `from` and every path beneath it to live under `to`,
    /// returning whether the selected paths changed.
    pub fn rename(&mut self, from: &Path, to: &Path) -> bool {
        let mut changed = false;

        for (i, paths) in [&mut self.selected, &mut self.checked, &mut self.expanded]
            .into_iter()
            .enumerate()
        {
            let rebased = paths
                .iter()
                .map(|p| match p.rebase(from, to) {
                    Some(rebased) => {
                        changed |= i == 0;
                        rebased
                    }
                    None => p.clone(),
                })
                .collect::<Vec<_>>();

            *paths = dedup(rebased);
        }

        changed
    }

    /// Clears every list.
    pub fn clear(&mut self) {
        self.selected.clear();
        self.checked.clear();
        self.expanded.clear();
    }

    /// Splits the selection into the keys that belong to the user-defined
    /// tree and the keys that belong to the canonical tree.
    ///
    /// A key belongs to the user-defined tree if and only if the user-defined
    /// tree contains a node with exactly that key. Every other key is assigned
    /// to the canonical tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::path::Path;
    /// use cellsets::selection::Selection;
    /// use cellsets::tree::SetNode;
    /// use cellsets::tree::SetTree;
    ///
    /// let user = SetTree::new([SetNode::interior(
    ///     "My Selections",
    ///     [SetNode::leaf("Selection 1", ["a"])],
    /// )]);
    ///
    /// let mut selection = Selection::new();
    /// selection.select([
    ///     Path::try_new(["Leiden", "1"])?,
    ///     Path::try_new(["My Selections", "Selection 1"])?,
    /// ]);
    ///
    /// let partition = selection.partition(&user);
    /// assert_eq!(partition.canonical.selected, vec!["Leiden___1"]);
    /// assert_eq!(partition.user.selected, vec!["My Selections___Selection 1"]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn partition(&self, user: &SetTree) -> Partition {
        let user_keys = user.keys();
        let mut result = Partition::default();

        for (paths, into_canonical, into_user) in [
            (
                &self.selected,
                &mut result.canonical.selected,
                &mut result.user.selected,
            ),
            (
                &self.checked,
                &mut result.canonical.checked,
                &mut result.user.checked,
            ),
            (
                &self.expanded,
                &mut result.canonical.expanded,
                &mut result.user.expanded,
            ),
        ] {
            for key in paths.iter().map(Path::key) {
                match user_keys.contains(&key) {
                    true => into_user.push(key),
                    false => into_canonical.push(key),
                }
            }
        }

        result
    }
}

/// Replaces `target` with the deduplicated `paths`, returning whether the
/// list changed.
fn replace(target: &mut Vec<Path>, paths: impl IntoIterator<Item = Path>) -> bool {
    let paths = dedup(paths);

    if same(target, &paths) {
        return false;
    }

    *target = paths;
    true
}

/// The keys of a selection that belong to a single tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Keys {
    /// The keys of the selected paths.
    pub selected: Vec<String>,

    /// The keys of the checked paths.
    pub checked: Vec<String>,

    /// The keys of the expanded paths.
    pub expanded: Vec<String>,
}

/// A selection split between the canonical and user-defined trees.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    /// The keys belonging to the canonical tree.
    pub canonical: Keys,

    /// The keys belonging to the user-defined tree.
    pub user: Keys,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::SetNode;

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    #[test]
    fn partitions_never_overlap() {
        let user = SetTree::new([SetNode::interior(
            "My Selections",
            [SetNode::leaf("Selection 1", ["a"])],
        )]);

        let mut selection = Selection::new();
        selection.check([path("Leiden/1"), path("My Selections/Selection 1")]);
        selection.expand([path("Leiden"), path("My Selections")]);

        let partition = selection.partition(&user);

        assert_eq!(partition.canonical.checked, vec!["Leiden___1"]);
        assert_eq!(partition.user.checked, vec!["My Selections___Selection 1"]);
        assert_eq!(partition.canonical.expanded, vec!["Leiden"]);
        assert_eq!(partition.user.expanded, vec!["My Selections"]);
        assert!(partition.canonical.selected.is_empty());
        assert!(partition.user.selected.is_empty());
    }

    #[test]
    fn forgetting_a_path_drops_descendants() {
        let mut selection = Selection::new();
        selection.select([path("Mine/A"), path("Leiden/1")]);
        selection.expand([path("Mine"), path("Mine/A")]);

        assert!(selection.forget(&path("mine")));
        assert_eq!(selection.selected(), &[path("Leiden/1")]);
        assert!(selection.expanded().is_empty());

        assert!(!selection.forget(&path("Other")));
    }

    #[test]
    fn renaming_rebases_descendants() {
        let mut selection = Selection::new();
        selection.select([path("Mine/A/Intersection with 1"), path("Leiden/1")]);
        selection.check([path("Mine/A")]);

        assert!(selection.rename(&path("Mine/A"), &path("Mine/B")));
        assert_eq!(
            selection.selected(),
            &[path("Mine/B/Intersection with 1"), path("Leiden/1")]
        );
        assert_eq!(selection.checked(), &[path("Mine/B")]);

        assert!(!selection.rename(&path("Mine/Z"), &path("Mine/Y")));
    }
}
