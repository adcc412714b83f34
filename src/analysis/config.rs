//! Configuration for reaching the analysis service.

use std::time::Duration;

/// The default base URL of the analysis service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// The default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// The default timeout for a complete request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The default path of the differential expression endpoint.
pub const DEFAULT_DEG_ANALYSIS_PATH: &str = "/deg_analysis";

/// The default path of the interaction endpoint.
pub const DEFAULT_CELL_INTERACTION_PATH: &str = "/cell_interaction";

/// Configuration for the analysis service.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use cellsets::analysis::Config;
///
/// let config = Config::default()
///     .with_base_url("http://analysis.internal:8080/")
///     .with_request_timeout(Duration::from_secs(5));
///
/// assert_eq!(
///     config.deg_analysis_url(),
///     "http://analysis.internal:8080/deg_analysis"
/// );
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// The base URL of the service.
    base_url: String,

    /// The connection timeout.
    connect_timeout: Duration,

    /// The timeout for a complete request.
    request_timeout: Duration,

    /// The path of the differential expression endpoint.
    deg_analysis_path: String,

    /// The path of the interaction endpoint.
    cell_interaction_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            deg_analysis_path: DEFAULT_DEG_ANALYSIS_PATH.to_string(),
            cell_interaction_path: DEFAULT_CELL_INTERACTION_PATH.to_string(),
        }
    }
}

impl Config {
    /// Sets the base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the timeout for a complete request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the path of the differential expression endpoint.
    pub fn with_deg_analysis_path(mut self, path: impl Into<String>) -> Self {
        self.deg_analysis_path = path.into();
        self
    }

    /// Sets the path of the interaction endpoint.
    pub fn with_cell_interaction_path(mut self, path: impl Into<String>) -> Self {
        self.cell_interaction_path = path.into();
        self
    }

    /// Gets the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Gets the connection timeout.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Gets the timeout for a complete request.
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Gets the full URL of the differential expression endpoint.
    pub fn deg_analysis_url(&self) -> String {
        join(&self.base_url, &self.deg_analysis_path)
    }

    /// Gets the full URL of the interaction endpoint.
    pub fn cell_interaction_url(&self) -> String {
        join(&self.base_url, &self.cell_interaction_path)
    }
}

/// Joins a base URL and a path with exactly one `/` between them.
fn join(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_a_local_service() {
        let config = Config::default();

        assert_eq!(config.base_url(), "http://127.0.0.1:5000");
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(
            config.cell_interaction_url(),
            "http://127.0.0.1:5000/cell_interaction"
        );
    }

    #[test]
    fn endpoint_paths_can_be_overridden() {
        let config = Config::default()
            .with_base_url("http://host")
            .with_deg_analysis_path("v2/deg");

        assert_eq!(config.deg_analysis_url(), "http://host/v2/deg");
    }
}
