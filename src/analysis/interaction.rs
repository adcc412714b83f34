//! Spatial interaction scoring between groups of observations.

use std::collections::HashSet;

use serde::Serialize;

use crate::color;
use crate::color::Color;
use crate::matrix::ObsLocations;
use crate::path::Path;
use crate::tree::ObsId;

/// A request to score the interactions between groups.
///
/// Each located observation contributes one entry to `cell_type` (its group
/// label) and one to `spatial` (its centroid). `cell_type_colors` holds one
/// color per distinct label, in order of first occurrence.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct InteractionRequest {
    /// The group label of each observation.
    pub cell_type: Vec<String>,

    /// The centroid of each observation.
    pub spatial: Vec<[f64; 2]>,

    /// The color of each distinct label as `#rrggbb`.
    pub cell_type_colors: Vec<String>,
}

impl InteractionRequest {
    /// Builds a request from resolved groups.
    ///
    /// Each group is labeled with its path below the root (see
    /// [`Path::label()`]) and colored with its entry in `colors`, or black if
    /// it has none. Observations without a known centroid are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::analysis::InteractionRequest;
    /// use cellsets::color::Table;
    /// use cellsets::matrix::ObsLocations;
    /// use cellsets::path::Path;
    ///
    /// let locations = ObsLocations::try_new(
    ///     vec![String::from("a"), String::from("b")],
    ///     vec![0.0, 1.0],
    ///     vec![0.0, 1.0],
    /// )?;
    ///
    /// let groups = vec![
    ///     (Path::try_new(["Leiden", "1"])?, vec![String::from("a"), String::from("z")]),
    ///     (Path::try_new(["Leiden", "2"])?, vec![String::from("b")]),
    /// ];
    ///
    /// let request = InteractionRequest::from_groups(&locations, &groups, &Table::new());
    /// assert_eq!(request.cell_type, vec!["1", "2"]);
    /// assert_eq!(request.spatial, vec![[0.0, 0.0], [1.0, 1.0]]);
    /// assert_eq!(request.cell_type_colors, vec!["#000000", "#000000"]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_groups(
        locations: &ObsLocations,
        groups: &[(Path, Vec<ObsId>)],
        colors: &color::Table,
    ) -> Self {
        let mut request = Self {
            cell_type: Vec::new(),
            spatial: Vec::new(),
            cell_type_colors: Vec::new(),
        };

        let mut labels = HashSet::new();

        for (path, ids) in groups {
            let label = path.label();
            let before = request.cell_type.len();

            for centroid in ids.iter().filter_map(|id| locations.centroid(id)) {
                request.cell_type.push(label.clone());
                request.spatial.push(centroid);
            }

            if request.cell_type.len() > before && labels.insert(label) {
                let color = colors.get(path).unwrap_or(Color::BLACK);
                request.cell_type_colors.push(color.to_hex());
            }
        }

        request
    }

    /// Gets the distinct labels in order of first occurrence.
    pub fn labels(&self) -> Vec<&str> {
        let mut seen = HashSet::new();

        self.cell_type
            .iter()
            .map(String::as_str)
            .filter(|label| seen.insert(*label))
            .collect()
    }
}

/// A single heatmap cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatmapCell {
    /// The column label.
    pub x: String,

    /// The score.
    pub y: f64,
}

/// A single heatmap row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeatmapRow {
    /// The row label.
    pub id: String,

    /// The cells, one per column.
    pub data: Vec<HeatmapCell>,
}

/// The data handed to a heatmap renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Heatmap {
    /// The rows, one per distinct label.
    pub rows: Vec<HeatmapRow>,

    /// The color of each label as `#rrggbb`.
    pub colors: Vec<String>,
}

impl Heatmap {
    /// Arranges a score matrix for display.
    ///
    /// The cell at row `r` and column `c` holds `matrix[c][r]`. Returns `None`
    /// if the request names fewer than two distinct labels or if `matrix` is
    /// not square with one row per label.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::analysis::InteractionRequest;
    /// use cellsets::analysis::interaction::Heatmap;
    ///
    /// let request = InteractionRequest {
    ///     cell_type: vec![String::from("A"), String::from("B")],
    ///     spatial: vec![[0.0, 0.0], [1.0, 1.0]],
    ///     cell_type_colors: vec![String::from("#ff0000"), String::from("#0000ff")],
    /// };
    ///
    /// let heatmap = Heatmap::new(&request, &[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
    /// assert_eq!(heatmap.rows[0].id, "A");
    /// assert_eq!(heatmap.rows[0].data[1].x, "B");
    /// assert_eq!(heatmap.rows[0].data[1].y, 3.0);
    ///
    /// assert!(Heatmap::new(&request, &[vec![1.0]]).is_none());
    /// ```
    pub fn new(request: &InteractionRequest, matrix: &[Vec<f64>]) -> Option<Self> {
        let labels = request.labels();
        let n = labels.len();

        if n < 2 || matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
            return None;
        }

        let rows = labels
            .iter()
            .enumerate()
            .map(|(r, id)| HeatmapRow {
                id: id.to_string(),
                data: labels
                    .iter()
                    .enumerate()
                    .map(|(c, x)| HeatmapCell {
                        x: x.to_string(),
                        y: matrix[c][r],
                    })
                    .collect(),
            })
            .collect();

        Some(Self {
            rows,
            colors: request.cell_type_colors.clone(),
        })
    }
}
