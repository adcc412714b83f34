//! Intersections between user-defined selections and canonical groups.
//!
//! When a selection is added to the user-defined tree, it is intersected with
//! the groups beneath every canonical root. Each non-empty intersection is
//! attached to the new leaf as a derived node named `Intersection with
//! <group>` that carries the canonical group's color. Derived nodes are
//! copied by value, so the user-defined tree never references the canonical
//! tree.

use std::collections::HashSet;

use crate::color::Color;
use crate::path::Path;
use crate::path::normalize_segment;
use crate::tree::Member;
use crate::tree::SetNode;
use crate::tree::SetTree;

/// The name of the root beneath which new selections are placed when the
/// user-defined tree has no roots.
pub const USER_ROOT: &str = "My Selections";

/// The prefix of the default name given to new selections.
pub const SELECTION_PREFIX: &str = "Selection";

/// The prefix of the name given to derived intersection nodes.
pub const INTERSECTION_PREFIX: &str = "Intersection with";

/// Computes the intersections of `leaf` with the children of every root in
/// `canonical`.
///
/// For each child group of each canonical root, the identifiers shared by
/// `leaf`'s own set and everything held beneath the group (see
/// [`SetNode::flatten_group_set()`]) are collected in the group's order.
/// Derived nodes that would share both a name and a color are merged, and
/// identifiers are never repeated within a derived node.
///
/// # Examples
///
/// ```
/// use cellsets::intersection::compute_intersections;
/// use cellsets::tree::SetNode;
///
/// let root = SetNode::interior(
///     "R",
///     [
///         SetNode::leaf("C1", ["1", "2", "3"]),
///         SetNode::leaf("C2", ["3", "4"]),
///     ],
/// );
/// let selection = SetNode::leaf("U", ["2", "3", "4"]);
///
/// let derived = compute_intersections(&selection, &[root]);
/// assert_eq!(derived.len(), 2);
/// assert_eq!(derived[0].name(), "Intersection with C1");
/// assert_eq!(derived[0].flatten_leaf_set(), vec!["2", "3"]);
/// assert_eq!(derived[1].name(), "Intersection with C2");
/// assert_eq!(derived[1].flatten_leaf_set(), vec!["3", "4"]);
/// ```
pub fn compute_intersections(leaf: &SetNode, canonical: &[SetNode]) -> Vec<SetNode> {
    let set = match leaf.set() {
        Some(set) if !set.is_empty() => set,
        _ => return Vec::new(),
    };

    let selected = set.iter().map(Member::id).collect::<HashSet<_>>();
    let mut results: Vec<(String, Option<Color>, Vec<&str>, HashSet<&str>)> = Vec::new();

    for group in canonical.iter().flat_map(|root| match root.is_leaf() {
        true => &[][..],
        false => root.children(),
    }) {
        let name = format!("{INTERSECTION_PREFIX} {}", group.name());
        let color = group.color();

        for id in group.flatten_group_set() {
            if !selected.contains(id) {
                continue;
            }

            let position = match results
                .iter()
                .position(|(n, c, _, _)| *n == name && *c == color)
            {
                Some(position) => position,
                None => {
                    results.push((name.clone(), color, Vec::new(), HashSet::new()));
                    results.len() - 1
                }
            };

            let (_, _, ids, seen) = &mut results[position];

            if seen.insert(id) {
                ids.push(id);
            }
        }
    }

    results
        .into_iter()
        .map(|(name, color, ids, _)| {
            let node = SetNode::leaf(name, ids);

            match color {
                Some(color) => node.with_color(color),
                None => node,
            }
        })
        .collect()
}

/// Chooses a default selection name not already used among `siblings`.
///
/// Names are `Selection N` where `N` starts at one more than the number of
/// siblings and counts upward until the name is free.
pub fn default_selection_name(siblings: &[SetNode]) -> String {
    let taken = siblings
        .iter()
        .map(|node| normalize_segment(node.name()))
        .collect::<HashSet<_>>();

    let mut n = siblings.len() + 1;

    loop {
        let name = format!("{SELECTION_PREFIX} {n}");

        if !taken.contains(&normalize_segment(&name)) {
            return name;
        }

        n += 1;
    }
}

/// Adds a new selection to `user` and intersects it with `canonical`.
///
/// The selection is appended beneath the first root of `user`, which is
/// created as [`USER_ROOT`] when `user` has no roots (or when the first root
/// is itself a leaf). If `name` is `None` or collides with an existing
/// sibling, a default name is chosen. Intersections are computed for the new
/// leaf only; earlier selections are left untouched.
///
/// Returns the path of the new selection.
///
/// # Examples
///
/// ```
/// use cellsets::intersection::add_selection;
/// use cellsets::tree::SetNode;
/// use cellsets::tree::SetTree;
///
/// let canonical = SetTree::new([SetNode::interior(
///     "Leiden",
///     [SetNode::leaf("1", ["a", "b"]), SetNode::leaf("2", ["c"])],
/// )]);
/// let mut user = SetTree::default();
///
/// let path = add_selection(&mut user, canonical.roots(), None, ["b", "c"], None);
/// assert_eq!(path.key(), "My Selections___Selection 1");
///
/// let node = user.node(&path).unwrap();
/// assert_eq!(node.flatten_leaf_set(), vec!["b", "c"]);
/// assert_eq!(node.children().len(), 2);
/// ```
pub fn add_selection<I, M>(
    user: &mut SetTree,
    canonical: &[SetNode],
    name: Option<String>,
    members: I,
    color: Option<Color>,
) -> Path
where
    I: IntoIterator<Item = M>,
    M: Into<Member>,
{
    let needs_root = user.roots().first().map_or(true, SetNode::is_leaf);

    if needs_root {
        user.roots_mut()
            .insert(0, SetNode::interior(USER_ROOT, Vec::new()));
    }

    let root = &mut user.roots_mut()[0];
    let root_path = Path::root(root.name());
    let siblings = root.children_mut();

    let name = match name {
        Some(name)
            if !siblings
                .iter()
                .any(|node| normalize_segment(node.name()) == normalize_segment(&name)) =>
        {
            name
        }
        _ => default_selection_name(siblings),
    };

    let mut leaf = SetNode::leaf(name.clone(), members);

    if let Some(color) = color {
        leaf = leaf.with_color(color);
    }

    let derived = compute_intersections(&leaf, canonical);
    leaf.children_mut().extend(derived);
    siblings.push(leaf);

    root_path.child(name)
}
