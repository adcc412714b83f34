//! Set operations over groups of observation identifiers.
//!
//! Each operation preserves the order in which identifiers are first
//! encountered and never yields the same identifier twice.

use std::collections::HashSet;

use crate::tree::ObsId;

/// Computes the union of `sets`.
///
/// # Examples
///
/// ```
/// use cellsets::tree::algebra::union;
///
/// let result = union(&[vec!["1", "2"], vec!["2", "3"]]);
/// assert_eq!(result, vec!["1", "2", "3"]);
/// ```
pub fn union<S, T>(sets: &[S]) -> Vec<ObsId>
where
    S: AsRef<[T]>,
    T: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut result = Vec::new();

    for id in sets.iter().flat_map(|set| set.as_ref()) {
        let id = id.as_ref();

        if seen.insert(id) {
            result.push(id.to_string());
        }
    }

    result
}

/// Computes the intersection of `sets`.
///
/// The intersection of no sets is empty.
///
/// # Examples
///
/// ```
/// use cellsets::tree::algebra::intersection;
///
/// let result = intersection(&[vec!["1", "2", "3"], vec!["3", "2"]]);
/// assert_eq!(result, vec!["2", "3"]);
/// ```
pub fn intersection<S, T>(sets: &[S]) -> Vec<ObsId>
where
    S: AsRef<[T]>,
    T: AsRef<str>,
{
    let (first, rest) = match sets.split_first() {
        Some(split) => split,
        None => return Vec::new(),
    };

    let rest = rest
        .iter()
        .map(|set| set.as_ref().iter().map(AsRef::as_ref).collect::<HashSet<&str>>())
        .collect::<Vec<_>>();

    let mut seen = HashSet::new();

    first
        .as_ref()
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| rest.iter().all(|set| set.contains(id)))
        .filter(|id| seen.insert(*id))
        .map(String::from)
        .collect()
}

/// Computes the complement of the union of `sets` within `universe`.
///
/// # Examples
///
/// ```
/// use cellsets::tree::algebra::complement;
///
/// let result = complement(&[vec!["1"], vec!["3"]], &["1", "2", "3", "4"]);
/// assert_eq!(result, vec!["2", "4"]);
/// ```
pub fn complement<S, T, U>(sets: &[S], universe: &[U]) -> Vec<ObsId>
where
    S: AsRef<[T]>,
    T: AsRef<str>,
    U: AsRef<str>,
{
    let excluded = sets
        .iter()
        .flat_map(|set| set.as_ref().iter().map(AsRef::as_ref))
        .collect::<HashSet<&str>>();

    let mut seen = HashSet::new();

    universe
        .iter()
        .map(AsRef::as_ref)
        .filter(|id| !excluded.contains(id))
        .filter(|id| seen.insert(*id))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_on_nothing_are_empty() {
        let none: &[Vec<&str>] = &[];

        assert!(union(none).is_empty());
        assert!(intersection(none).is_empty());
        assert_eq!(complement(none, &["1"]), vec!["1"]);
    }

    #[test]
    fn duplicates_are_collapsed() {
        assert_eq!(union(&[vec!["1", "1"], vec!["1"]]), vec!["1"]);
        assert_eq!(intersection(&[vec!["1", "1"], vec!["1"]]), vec!["1"]);
        assert_eq!(complement(&[vec!["2"]], &["1", "1", "2"]), vec!["1"]);
    }

    #[test]
    fn disjoint_sets_have_no_intersection() {
        assert!(intersection(&[vec!["1"], vec!["2"]]).is_empty());
    }
}
