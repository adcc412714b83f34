//! An analysis service reached over HTTP/JSON.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::analysis::AnalysisService;
use crate::analysis::Config;
use crate::analysis::DegRecord;
use crate::analysis::DegRequest;
use crate::analysis::Error;
use crate::analysis::InteractionRequest;
use crate::analysis::Result;
use crate::analysis::deg;

/// An [`AnalysisService`] that posts JSON requests to a remote service.
#[derive(Clone, Debug)]
pub struct HttpService {
    /// The HTTP client.
    client: Client,

    /// The configuration.
    config: Config,
}

impl HttpService {
    /// Attempts to create a new service from its configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::analysis::Config;
    /// use cellsets::analysis::HttpService;
    ///
    /// let service = HttpService::try_new(Config::default())?;
    /// assert_eq!(service.config().base_url(), "http://127.0.0.1:5000");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new(config: Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(Error::Client)?;

        Ok(Self { client, config })
    }

    /// Gets the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Posts `body` to `url` and decodes the JSON response.
    async fn post<B, T>(&self, url: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("posting analysis request to {url}");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(Error::Transport)?;
        serde_json::from_slice(&bytes).map_err(|err| Error::Malformed(err.to_string()))
    }
}

#[async_trait]
impl AnalysisService for HttpService {
    async fn deg_analysis(&self, request: &DegRequest) -> Result<Vec<DegRecord>> {
        let value = self
            .post::<_, serde_json::Value>(&self.config.deg_analysis_url(), request)
            .await?;
        deg::parse_response(value)
    }

    async fn cell_interaction(&self, request: &InteractionRequest) -> Result<Vec<Vec<f64>>> {
        self.post(&self.config.cell_interaction_url(), request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_json;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    use super::*;

    fn service(server: &MockServer) -> HttpService {
        HttpService::try_new(Config::default().with_base_url(server.uri())).unwrap()
    }

    fn comparison() -> DegRequest {
        DegRequest {
            group1: vec![vec![1.0, 0.0]],
            group2: vec![vec![0.0, 1.0]],
            feature_index: vec![String::from("CD3E"), String::from("MS4A1")],
        }
    }

    #[tokio::test]
    async fn comparisons_post_the_expected_payload() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/deg_analysis"))
            .and(body_json(json!({
                "group1": [[1.0, 0.0]],
                "group2": [[0.0, 1.0]],
                "featureIndex": ["CD3E", "MS4A1"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "gene": "CD3E", "log2FoldChange": 2.5, "pValue": 0.001, "negLogPValue": 3.0 },
                { "gene": "MS4A1", "log2FoldChange": -2.5, "pValue": 0.001, "negLogPValue": 3.0 },
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let records = service(&server).deg_analysis(&comparison()).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].feature, "MS4A1");
        assert_eq!(records[1].log2_fold_change, -2.5);
    }

    #[tokio::test]
    async fn error_envelopes_are_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/deg_analysis"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "error in deg analysis": "too few cells" })),
            )
            .mount(&server)
            .await;

        let err = service(&server)
            .deg_analysis(&comparison())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Malformed(_)));
    }

    #[tokio::test]
    async fn non_success_statuses_are_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/cell_interaction"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let request = InteractionRequest {
            cell_type: vec![String::from("A"), String::from("B")],
            spatial: vec![[0.0, 0.0], [1.0, 1.0]],
            cell_type_colors: vec![String::from("#000000"), String::from("#ffffff")],
        };

        match service(&server).cell_interaction(&request).await {
            Err(Error::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected a status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn interaction_matrices_are_decoded() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/cell_interaction"))
            .and(body_json(json!({
                "cell_type": ["A", "B"],
                "spatial": [[0.0, 0.0], [1.0, 1.0]],
                "cell_type_colors": ["#000000", "#ffffff"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[0, 1], [1, 0]])))
            .mount(&server)
            .await;

        let request = InteractionRequest {
            cell_type: vec![String::from("A"), String::from("B")],
            spatial: vec![[0.0, 0.0], [1.0, 1.0]],
            cell_type_colors: vec![String::from("#000000"), String::from("#ffffff")],
        };

        let matrix = service(&server).cell_interaction(&request).await.unwrap();
        assert_eq!(matrix, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
    }

    #[tokio::test]
    async fn unreachable_services_are_transport_errors() {
        let config = Config::default().with_base_url("http://127.0.0.1:9");
        let service = HttpService::try_new(config).unwrap();

        let err = service.deg_analysis(&comparison()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
