//! HTTP client for the remote training service.
//!
//! The service trains a classifier on a stored measurement and answers
//! with a JSON [`ModelArtifact`]:
//!
//! ```text
//! GET {server}/measurements/{measurement}/classifiers/{type}.json
//!     ?_sensors=Accelerometer-X,Accelerometer-Y,Accelerometer-Z
//!     &_labels=STILL,WALKING
//!     &_preprocessor=median&_window=1000
//!     &max_depth=2
//! ```

use crate::trainer::{ModelArtifact, Predictor, Trainer, TrainingError, TrainingRequest};
use reqwest::Url;
use std::time::Duration;

/// Trainer backed by the remote training service.
pub struct HttpTrainer {
    client: reqwest::Client,
}

impl HttpTrainer {
    /// Create a trainer whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TrainingError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TrainingError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Full URL of the training endpoint for a request.
    pub fn url(request: &TrainingRequest) -> Result<Url, TrainingError> {
        let mut url = Url::parse(&request.server).map_err(|e| {
            TrainingError::InvalidRequest(format!("bad server URL '{}': {e}", request.server))
        })?;

        url.path_segments_mut()
            .map_err(|_| {
                TrainingError::InvalidRequest(format!(
                    "server URL '{}' cannot be a base",
                    request.server
                ))
            })?
            .pop_if_empty()
            .extend(request.path_segments());

        url.query_pairs_mut().extend_pairs(request.query_pairs());

        Ok(url)
    }
}

impl Trainer for HttpTrainer {
    async fn train(&self, request: &TrainingRequest) -> Result<Box<dyn Predictor>, TrainingError> {
        let url = Self::url(request)?;
        tracing::info!("Requesting {} from {}", request.classifier, url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TrainingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TrainingError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let artifact: ModelArtifact = response
            .json()
            .await
            .map_err(|e| TrainingError::Serialization(e.to_string()))?;

        tracing::info!(
            "Received {} artifact ({} features, {} classes)",
            artifact.kind_name(),
            artifact.n_features(),
            artifact.n_classes()
        );
        artifact.into_predictor_for(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn request(server: &str) -> TrainingRequest {
        TrainingRequest {
            server: server.to_string(),
            measurement: "devicemotion".to_string(),
            sensors: vec!["Accelerometer-X".to_string(), "Accelerometer-Y".to_string()],
            labels: vec!["STILL".to_string(), "WALKING".to_string()],
            preprocessor: Some((crate::core::ReducerKind::Median, Duration::from_secs(1))),
            classifier: "DecisionTreeClassifier".to_string(),
            hyperparameters: BTreeMap::from([("max_depth".to_string(), serde_json::json!(2))]),
        }
    }

    #[test]
    fn test_training_url() {
        let url = HttpTrainer::url(&request("http://localhost:5000")).unwrap();
        assert_eq!(
            url.path(),
            "/measurements/devicemotion/classifiers/DecisionTreeClassifier.json"
        );

        let query = url.query().unwrap();
        assert!(query.contains("_sensors=Accelerometer-X%2CAccelerometer-Y"));
        assert!(query.contains("_labels=STILL%2CWALKING"));
        assert!(query.contains("_preprocessor=median"));
        assert!(query.contains("_window=1000"));
        assert!(query.contains("max_depth=2"));
        assert!(!query.contains("type="));
    }

    #[test]
    fn test_training_url_with_trailing_slash_and_prefix() {
        let url = HttpTrainer::url(&request("http://localhost:5000/api/")).unwrap();
        assert_eq!(
            url.path(),
            "/api/measurements/devicemotion/classifiers/DecisionTreeClassifier.json"
        );
    }

    #[test]
    fn test_invalid_server_url() {
        assert!(matches!(
            HttpTrainer::url(&request("not a url")),
            Err(TrainingError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let trainer = HttpTrainer::new(Duration::from_millis(500)).unwrap();
        let err = trainer
            .train(&request("http://127.0.0.1:9"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, TrainingError::Network(_)));
    }
}
