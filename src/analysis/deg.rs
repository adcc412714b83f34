//! Differential expression between two groups of observations.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::analysis::Error;
use crate::analysis::Result;
use crate::matrix::ObsFeatureMatrix;
use crate::path::Path;

/// The p-value below which a feature is considered significant.
pub const P_VALUE_THRESHOLD: f64 = 0.05;

/// The absolute log2 fold change above which a feature is considered
/// regulated.
pub const FOLD_CHANGE_THRESHOLD: f64 = 1.0;

/// The padding added to each side of the plot's axis domains.
pub const DOMAIN_PADDING: f64 = 0.5;

////////////////////////////////////////////////////////////////////////////////////////
// Request
////////////////////////////////////////////////////////////////////////////////////////

/// A request to compare two groups of observations.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegRequest {
    /// The expression rows of the first group.
    pub group1: Vec<Vec<f64>>,

    /// The expression rows of the second group.
    pub group2: Vec<Vec<f64>>,

    /// The feature of each column.
    pub feature_index: Vec<String>,
}

impl DegRequest {
    /// Builds a request from the observations in each group.
    ///
    /// Observations missing from `matrix` are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::analysis::DegRequest;
    /// use cellsets::matrix::ObsFeatureMatrix;
    ///
    /// let matrix = ObsFeatureMatrix::try_new(
    ///     vec![String::from("a"), String::from("b")],
    ///     vec![String::from("CD3E")],
    ///     vec![1.0, 2.0],
    /// )?;
    ///
    /// let request = DegRequest::from_groups(&matrix, &["a", "missing"], &["b"]);
    /// assert_eq!(request.group1, vec![vec![1.0]]);
    /// assert_eq!(request.group2, vec![vec![2.0]]);
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_groups<A, B>(matrix: &ObsFeatureMatrix, a: &[A], b: &[B]) -> Self
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        Self {
            group1: matrix.rows_for(a),
            group2: matrix.rows_for(b),
            feature_index: matrix.feature_index().to_vec(),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Response
////////////////////////////////////////////////////////////////////////////////////////

/// The comparison result for a single feature.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegRecord {
    /// The feature.
    #[serde(alias = "gene")]
    pub feature: String,

    /// The log2 fold change of the first group over the second.
    pub log2_fold_change: f64,

    /// The p-value.
    pub p_value: f64,

    /// The negated log10 of the p-value.
    pub neg_log_p_value: f64,
}

/// Parses a comparison response.
///
/// The service may respond with either an array of records or an object whose
/// values are records. Either way, records are returned in the order the
/// service sent them. Anything else (including the service's error envelope,
/// an object whose value is a message) is rejected.
///
/// # Examples
///
/// ```
/// use cellsets::analysis::deg::parse_response;
/// use serde_json::json;
///
/// let records = parse_response(json!({
///     "CD3E": { "gene": "CD3E", "log2FoldChange": 2.0, "pValue": 0.01, "negLogPValue": 2.0 }
/// }))?;
/// assert_eq!(records[0].feature, "CD3E");
///
/// assert!(parse_response(json!({ "error in deg analysis": "boom" })).is_err());
///
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn parse_response(value: Value) -> Result<Vec<DegRecord>> {
    let values = match value {
        Value::Array(values) => values,
        Value::Object(map) => map.into_iter().map(|(_, value)| value).collect(),
        other => {
            return Err(Error::Malformed(format!(
                "expected an array or object of records, found `{other}`"
            )));
        }
    };

    values
        .into_iter()
        .map(|value| {
            serde_json::from_value::<DegRecord>(value)
                .map_err(|err| Error::Malformed(format!("invalid record: {err}")))
        })
        .collect()
}

////////////////////////////////////////////////////////////////////////////////////////
// Volcano plot
////////////////////////////////////////////////////////////////////////////////////////

/// The direction in which a feature is regulated.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Regulation {
    /// Significantly higher in the first group.
    Up,

    /// Significantly lower in the first group.
    Down,

    /// Neither.
    Neutral,
}

impl Regulation {
    /// Classifies a record.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::analysis::DegRecord;
    /// use cellsets::analysis::deg::Regulation;
    ///
    /// let record = DegRecord {
    ///     feature: String::from("CD3E"),
    ///     log2_fold_change: -1.5,
    ///     p_value: 0.01,
    ///     neg_log_p_value: 2.0,
    /// };
    ///
    /// assert_eq!(Regulation::classify(&record), Regulation::Down);
    /// ```
    pub fn classify(record: &DegRecord) -> Self {
        if record.p_value >= P_VALUE_THRESHOLD {
            return Regulation::Neutral;
        }

        if record.log2_fold_change > FOLD_CHANGE_THRESHOLD {
            Regulation::Up
        } else if record.log2_fold_change < -FOLD_CHANGE_THRESHOLD {
            Regulation::Down
        } else {
            Regulation::Neutral
        }
    }
}

impl std::fmt::Display for Regulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Regulation::Up => write!(f, "up"),
            Regulation::Down => write!(f, "down"),
            Regulation::Neutral => write!(f, "neutral"),
        }
    }
}

/// A single point on a volcano plot.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolcanoPoint {
    /// The comparison result.
    #[serde(flatten)]
    pub record: DegRecord,

    /// The regulation class.
    pub regulation: Regulation,

    /// Whether the feature is selected or highlighted.
    pub is_highlighted: bool,
}

/// The data handed to a volcano plot renderer.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Volcano {
    /// The points, in the order the service returned them.
    pub points: Vec<VolcanoPoint>,

    /// The padded domain of the log2 fold change axis.
    pub x_domain: [f64; 2],

    /// The padded domain of the negated log10 p-value axis.
    pub y_domain: [f64; 2],

    /// The display names of the two groups.
    pub groups: [String; 2],
}

impl Volcano {
    /// Builds the plot data for a comparison between `groups`.
    ///
    /// A feature is highlighted when it appears in `highlighted`. Returns
    /// `None` if there are no records.
    pub fn new<S: AsRef<str>>(
        records: Vec<DegRecord>,
        groups: [&Path; 2],
        highlighted: &[S],
    ) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let x_domain = padded_domain(records.iter().map(|r| r.log2_fold_change));
        let y_domain = padded_domain(records.iter().map(|r| r.neg_log_p_value));

        let points = records
            .into_iter()
            .map(|record| VolcanoPoint {
                regulation: Regulation::classify(&record),
                is_highlighted: highlighted
                    .iter()
                    .any(|feature| feature.as_ref() == record.feature),
                record,
            })
            .collect();

        Some(Self {
            points,
            x_domain,
            y_domain,
            groups: groups.map(|path| path.name().to_string()),
        })
    }
}

/// Computes the range of the finite `values`, padded on each side.
fn padded_domain(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (min, max) = values
        .filter(|value| value.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), value| {
            (min.min(value), max.max(value))
        });

    match min <= max {
        true => [min - DOMAIN_PADDING, max + DOMAIN_PADDING],
        false => [-DOMAIN_PADDING, DOMAIN_PADDING],
    }
}
