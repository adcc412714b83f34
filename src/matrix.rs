//! Read-only snapshots of per-observation data supplied with a dataset.
//!
//! Two snapshots are used by the analysis pipeline:
//!
//! - an [`ObsFeatureMatrix`], which holds one row of feature values per
//!   observation, and
//! - [`ObsLocations`], which holds the spatial centroid of each observation.
//!
//! Both are indexed by observation identifier. Lookups for identifiers that
//! are not in the index are skipped rather than treated as errors, as
//! user-defined sets commonly reference observations outside the loaded
//! index.

use std::collections::HashMap;

use serde::Deserialize;

use crate::tree::ObsId;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to the shape of a snapshot.
#[derive(Debug)]
pub enum Error {
    /// The number of values did not match the index dimensions.
    Shape {
        /// The number of values that were expected.
        expected: usize,

        /// The number of values that were found.
        found: usize,
    },

    /// The coordinate arrays did not have exactly two dimensions.
    Dimensions(usize),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Shape { expected, found } => {
                write!(f, "expected {expected} values but found {found}")
            }
            Error::Dimensions(n) => {
                write!(f, "expected two coordinate dimensions but found {n}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// Builds a lookup from identifier to the position of its first occurrence.
fn index(ids: &[ObsId]) -> HashMap<ObsId, usize> {
    let mut lookup = HashMap::with_capacity(ids.len());

    for (i, id) in ids.iter().enumerate() {
        lookup.entry(id.clone()).or_insert(i);
    }

    lookup
}

////////////////////////////////////////////////////////////////////////////////////////
// Observation by feature matrix
////////////////////////////////////////////////////////////////////////////////////////

/// A dense, row-major observation by feature matrix.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct ObsFeatureMatrix {
    /// The observation identifier of each row.
    obs_index: Vec<ObsId>,

    /// The feature identifier of each column.
    feature_index: Vec<String>,

    /// The values, one row after another.
    data: Vec<f64>,

    /// A lookup from observation identifier to row.
    lookup: HashMap<ObsId, usize>,
}

impl ObsFeatureMatrix {
    /// Attempts to create a new matrix.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::matrix::ObsFeatureMatrix;
    ///
    /// let matrix = ObsFeatureMatrix::try_new(
    ///     vec![String::from("a"), String::from("b")],
    ///     vec![String::from("CD3E"), String::from("MS4A1")],
    ///     vec![1.0, 0.0, 0.0, 2.0],
    /// )?;
    ///
    /// assert_eq!(matrix.row_of("b"), Some(&[0.0, 2.0][..]));
    /// assert!(ObsFeatureMatrix::try_new(vec![], vec![String::from("CD3E")], vec![1.0]).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(
        obs_index: Vec<ObsId>,
        feature_index: Vec<String>,
        data: Vec<f64>,
    ) -> Result<Self> {
        let expected = obs_index.len() * feature_index.len();

        if data.len() != expected {
            return Err(Error::Shape {
                expected,
                found: data.len(),
            });
        }

        let lookup = index(&obs_index);

        Ok(Self {
            obs_index,
            feature_index,
            data,
            lookup,
        })
    }

    /// Gets the observation identifiers, one per row.
    pub fn obs_index(&self) -> &[ObsId] {
        &self.obs_index
    }

    /// Gets the feature identifiers, one per column.
    pub fn feature_index(&self) -> &[String] {
        &self.feature_index
    }

    /// Gets the row for an observation, if it is in the index.
    pub fn row_of(&self, id: &str) -> Option<&[f64]> {
        let width = self.feature_index.len();
        let row = *self.lookup.get(id)?;
        self.data.get(row * width..(row + 1) * width)
    }

    /// Gets the rows for each of `ids` that are in the index, in the order
    /// given. Identifiers that are not in the index are skipped.
    pub fn rows_for<S: AsRef<str>>(&self, ids: &[S]) -> Vec<Vec<f64>> {
        ids.iter()
            .filter_map(|id| self.row_of(id.as_ref()))
            .map(<[f64]>::to_vec)
            .collect()
    }
}

/// The on-the-wire shape of a matrix.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatrix {
    /// The observation identifiers.
    obs_index: Vec<ObsId>,

    /// The feature identifiers.
    feature_index: Vec<String>,

    /// The row-major values.
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for ObsFeatureMatrix {
    type Error = Error;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Self::try_new(raw.obs_index, raw.feature_index, raw.data)
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Observation locations
////////////////////////////////////////////////////////////////////////////////////////

/// The spatial centroid of each observation.
#[derive(Clone, Debug, Deserialize)]
#[serde(try_from = "RawLocations")]
pub struct ObsLocations {
    /// The observation identifiers.
    obs_index: Vec<ObsId>,

    /// The x coordinates.
    x: Vec<f64>,

    /// The y coordinates.
    y: Vec<f64>,

    /// A lookup from observation identifier to position.
    lookup: HashMap<ObsId, usize>,
}

impl ObsLocations {
    /// Attempts to create a new set of locations.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::matrix::ObsLocations;
    ///
    /// let locations = ObsLocations::try_new(
    ///     vec![String::from("a"), String::from("b")],
    ///     vec![1.0, 2.0],
    ///     vec![10.0, 20.0],
    /// )?;
    ///
    /// assert_eq!(locations.centroid("b"), Some([2.0, 20.0]));
    /// assert_eq!(locations.centroid("z"), None);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(obs_index: Vec<ObsId>, x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        for found in [x.len(), y.len()] {
            if found != obs_index.len() {
                return Err(Error::Shape {
                    expected: obs_index.len(),
                    found,
                });
            }
        }

        let lookup = index(&obs_index);

        Ok(Self {
            obs_index,
            x,
            y,
            lookup,
        })
    }

    /// Gets the observation identifiers.
    pub fn obs_index(&self) -> &[ObsId] {
        &self.obs_index
    }

    /// Gets the centroid of an observation, if it is in the index.
    pub fn centroid(&self, id: &str) -> Option<[f64; 2]> {
        let i = *self.lookup.get(id)?;
        Some([*self.x.get(i)?, *self.y.get(i)?])
    }
}

/// The on-the-wire shape of a set of locations, where `data` holds the x
/// coordinates followed by the y coordinates.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLocations {
    /// The observation identifiers.
    obs_index: Vec<ObsId>,

    /// The coordinate arrays.
    data: Vec<Vec<f64>>,
}

impl TryFrom<RawLocations> for ObsLocations {
    type Error = Error;

    fn try_from(raw: RawLocations) -> Result<Self> {
        let n = raw.data.len();
        let mut data = raw.data.into_iter();

        match (data.next(), data.next(), data.next()) {
            (Some(x), Some(y), None) => Self::try_new(raw.obs_index, x, y),
            _ => Err(Error::Dimensions(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(ids: &[&str]) -> Vec<ObsId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn misses_are_skipped() -> Result<()> {
        let matrix = ObsFeatureMatrix::try_new(
            ids(&["a", "b", "c"]),
            ids(&["g1", "g2"]),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )?;

        assert_eq!(
            matrix.rows_for(&["c", "missing", "a"]),
            vec![vec![5.0, 6.0], vec![1.0, 2.0]]
        );
        assert!(matrix.rows_for::<&str>(&[]).is_empty());

        Ok(())
    }

    #[test]
    fn duplicate_identifiers_use_the_first_row() -> Result<()> {
        let matrix = ObsFeatureMatrix::try_new(ids(&["a", "a"]), ids(&["g"]), vec![1.0, 2.0])?;
        assert_eq!(matrix.row_of("a"), Some(&[1.0][..]));
        Ok(())
    }

    #[test]
    fn snapshots_deserialize() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let matrix = serde_json::from_str::<ObsFeatureMatrix>(
            r#"{"obsIndex":["a"],"featureIndex":["g1","g2"],"data":[0.5,1.5]}"#,
        )?;
        assert_eq!(matrix.feature_index(), &["g1", "g2"]);

        let locations = serde_json::from_str::<ObsLocations>(
            r#"{"obsIndex":["a","b"],"data":[[1,2],[3,4]]}"#,
        )?;
        assert_eq!(locations.centroid("a"), Some([1.0, 3.0]));

        let err = serde_json::from_str::<ObsLocations>(r#"{"obsIndex":["a"],"data":[[1]]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("two coordinate dimensions"));

        let err = serde_json::from_str::<ObsFeatureMatrix>(
            r#"{"obsIndex":["a"],"featureIndex":["g"],"data":[]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("expected 1 values but found 0"));

        Ok(())
    }
}
