//! Requests to an external analysis service.
//!
//! Two analyses are supported:
//!
//! - a differential expression comparison between exactly two groups of
//!   observations (see [`deg`]), and
//! - pairwise interaction scoring between two or more groups based on their
//!   spatial centroids (see [`interaction`]).
//!
//! The service itself is abstracted behind the [`AnalysisService`] trait. The
//! [`HttpService`] implementation talks to the service over HTTP/JSON, but any
//! implementation may be substituted (e.g., for testing).
//!
//! The pipeline functions in this module ([`request_comparison()`] and
//! [`request_interaction_scores()`]) never fail: transport and service errors
//! are logged and reported as an empty result so that a single failing view
//! does not disturb the others.

use async_trait::async_trait;
use tracing::warn;

pub mod config;
pub mod deg;
pub mod http;
pub mod interaction;

pub use config::Config;
pub use deg::DegRecord;
pub use deg::DegRequest;
pub use http::HttpService;
pub use interaction::InteractionRequest;

////////////////////////////////////////////////////////////////////////////////////////
// Errors
////////////////////////////////////////////////////////////////////////////////////////

/// An error related to the analysis service.
#[derive(Debug)]
pub enum Error {
    /// The HTTP client could not be built.
    Client(reqwest::Error),

    /// The service could not be reached or the exchange failed midway.
    Transport(reqwest::Error),

    /// The service responded with a non-success status.
    Status {
        /// The status code.
        status: u16,

        /// The response body.
        body: String,
    },

    /// The service responded with something other than the expected shape.
    Malformed(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Client(err) => write!(f, "unable to build client: {err}"),
            Error::Transport(err) => write!(f, "transport error: {err}"),
            Error::Status { status, body } => {
                write!(f, "service responded with status {status}: {body}")
            }
            Error::Malformed(reason) => write!(f, "malformed response: {reason}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Service
////////////////////////////////////////////////////////////////////////////////////////

/// An external service that performs analyses on groups of observations.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Compares the expression of two groups of observations.
    async fn deg_analysis(&self, request: &DegRequest) -> Result<Vec<DegRecord>>;

    /// Scores the interactions between groups of observations.
    ///
    /// The result is a square matrix with one row and one column per distinct
    /// group label, in order of first occurrence.
    async fn cell_interaction(&self, request: &InteractionRequest) -> Result<Vec<Vec<f64>>>;
}

////////////////////////////////////////////////////////////////////////////////////////
// Pipeline
////////////////////////////////////////////////////////////////////////////////////////

/// Requests a differential expression comparison.
///
/// If either group has no rows, the service is not called. Any failure is
/// logged and yields an empty result.
pub async fn request_comparison<S>(service: &S, request: &DegRequest) -> Vec<DegRecord>
where
    S: AnalysisService + ?Sized,
{
    if request.group1.is_empty() || request.group2.is_empty() {
        return Vec::new();
    }

    match service.deg_analysis(request).await {
        Ok(records) => records,
        Err(err) => {
            warn!("differential expression request failed: {err}");
            Vec::new()
        }
    }
}

/// Requests interaction scores.
///
/// If the request names fewer than two distinct groups, the service is not
/// called. Any failure is logged and yields an empty result.
pub async fn request_interaction_scores<S>(
    service: &S,
    request: &InteractionRequest,
) -> Vec<Vec<f64>>
where
    S: AnalysisService + ?Sized,
{
    if request.labels().len() < 2 {
        return Vec::new();
    }

    match service.cell_interaction(request).await {
        Ok(matrix) => matrix,
        Err(err) => {
            warn!("interaction request failed: {err}");
            Vec::new()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;

    /// A service that answers from fixed results and counts its calls.
    #[derive(Debug, Default)]
    pub(crate) struct FixedService {
        /// The records returned for comparisons, or `None` to fail.
        pub(crate) records: Option<Vec<DegRecord>>,

        /// The matrix returned for interactions, or `None` to fail.
        pub(crate) matrix: Option<Vec<Vec<f64>>>,

        /// The number of calls made.
        pub(crate) calls: AtomicUsize,
    }

    #[async_trait]
    impl AnalysisService for FixedService {
        async fn deg_analysis(&self, _: &DegRequest) -> Result<Vec<DegRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.records
                .clone()
                .ok_or_else(|| Error::Malformed(String::from("unavailable")))
        }

        async fn cell_interaction(&self, _: &InteractionRequest) -> Result<Vec<Vec<f64>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.matrix
                .clone()
                .ok_or_else(|| Error::Malformed(String::from("unavailable")))
        }
    }

    pub(crate) fn record(feature: &str, log2_fold_change: f64, p_value: f64) -> DegRecord {
        DegRecord {
            feature: feature.to_string(),
            log2_fold_change,
            p_value,
            neg_log_p_value: -p_value.log10(),
        }
    }

    fn comparison(group1: Vec<Vec<f64>>, group2: Vec<Vec<f64>>) -> DegRequest {
        DegRequest {
            group1,
            group2,
            feature_index: vec![String::from("g")],
        }
    }

    #[tokio::test]
    async fn empty_groups_skip_the_service() {
        let service = FixedService {
            records: Some(vec![record("g", 1.0, 0.5)]),
            ..Default::default()
        };

        let result = request_comparison(&service, &comparison(vec![], vec![])).await;
        assert!(result.is_empty());

        let result = request_comparison(&service, &comparison(vec![vec![1.0]], vec![])).await;
        assert!(result.is_empty());

        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_yield_empty_results() {
        let service = FixedService::default();

        let result =
            request_comparison(&service, &comparison(vec![vec![1.0]], vec![vec![2.0]])).await;
        assert!(result.is_empty());

        let request = InteractionRequest {
            cell_type: vec![String::from("A"), String::from("B")],
            spatial: vec![[0.0, 0.0], [1.0, 1.0]],
            cell_type_colors: vec![String::from("#000000"), String::from("#ffffff")],
        };
        assert!(request_interaction_scores(&service, &request).await.is_empty());

        assert_eq!(service.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn single_labels_skip_the_service() {
        let service = FixedService {
            matrix: Some(vec![vec![1.0]]),
            ..Default::default()
        };

        let request = InteractionRequest {
            cell_type: vec![String::from("A"), String::from("A")],
            spatial: vec![[0.0, 0.0], [1.0, 1.0]],
            cell_type_colors: vec![String::from("#000000")],
        };

        assert!(request_interaction_scores(&service, &request).await.is_empty());
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }
}
