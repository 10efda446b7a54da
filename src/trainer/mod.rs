//! Training capability and trained predictors.
//!
//! A [`Trainer`] turns a [`TrainingRequest`] into a [`Predictor`]. The
//! classifier only depends on these traits; the crate ships a trainer that
//! loads model artifacts from disk and, with the `remote` feature, one that
//! trains on a remote service over HTTP.

pub mod model;

#[cfg(feature = "remote")]
pub mod http;

pub use model::{DecisionTree, ModelArtifact, RandomForest, TreeNode};

#[cfg(feature = "remote")]
pub use http::HttpTrainer;

use crate::config::ClassifierConfig;
use crate::core::reducer::ReducerKind;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// Label index returned by a predictor that cannot classify its input.
pub const NO_PREDICTION: i64 = -1;

/// A trained model mapping a feature vector to a label index.
pub trait Predictor: Send + Sync {
    /// Predict a label index, or [`NO_PREDICTION`].
    fn predict(&self, features: &[f64]) -> i64;
}

impl<F> Predictor for F
where
    F: Fn(&[f64]) -> i64 + Send + Sync,
{
    fn predict(&self, features: &[f64]) -> i64 {
        self(features)
    }
}

/// Something that can produce a predictor for a training request.
pub trait Trainer: Send + Sync + 'static {
    fn train(
        &self,
        request: &TrainingRequest,
    ) -> impl Future<Output = Result<Box<dyn Predictor>, TrainingError>> + Send;
}

/// Everything the training side needs to build a classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRequest {
    /// Base URL of the training service
    pub server: String,
    /// Dataset identifier
    pub measurement: String,
    pub sensors: Vec<String>,
    pub labels: Vec<String>,
    /// Reduction and window length, if predictions are windowed
    pub preprocessor: Option<(ReducerKind, Duration)>,
    /// Classifier type discriminator
    pub classifier: String,
    /// Hyperparameters, without the type discriminator
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
}

impl TrainingRequest {
    /// Build a request from a classifier configuration.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let mut hyperparameters = config.classifier.hyperparameters.clone();
        hyperparameters.remove("type");

        Self {
            server: config.server.clone(),
            measurement: config.measurement.clone(),
            sensors: config.sensors.clone(),
            labels: config.labels.clone(),
            preprocessor: config
                .preprocessor
                .as_ref()
                .map(|p| (p.kind, p.window)),
            classifier: config.classifier.kind.clone(),
            hyperparameters,
        }
    }

    /// Query parameters understood by the training service.
    ///
    /// Sensor and label lists are comma-joined; hyperparameters are passed
    /// through under their own names. Null hyperparameters are omitted so
    /// the service falls back to its defaults.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("_sensors".to_string(), self.sensors.join(",")),
            ("_labels".to_string(), self.labels.join(",")),
        ];

        if let Some((kind, window)) = self.preprocessor {
            pairs.push(("_preprocessor".to_string(), kind.as_str().to_string()));
            pairs.push(("_window".to_string(), window.as_millis().to_string()));
        }

        for (key, value) in &self.hyperparameters {
            let rendered = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            pairs.push((key.clone(), rendered));
        }

        pairs
    }

    /// Path segments of the training endpoint, relative to the server.
    pub fn path_segments(&self) -> [String; 4] {
        [
            "measurements".to_string(),
            self.measurement.clone(),
            "classifiers".to_string(),
            format!("{}.json", self.classifier),
        ]
    }
}

/// Trainer that loads a pre-trained model artifact from a JSON file.
#[derive(Debug, Clone)]
pub struct ArtifactTrainer {
    path: PathBuf,
}

impl ArtifactTrainer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Trainer for ArtifactTrainer {
    async fn train(&self, request: &TrainingRequest) -> Result<Box<dyn Predictor>, TrainingError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| TrainingError::Io(format!("{}: {e}", self.path.display())))?;
        let artifact: ModelArtifact = serde_json::from_str(&content)
            .map_err(|e| TrainingError::Serialization(e.to_string()))?;

        tracing::info!(
            "Loaded {} artifact from {}",
            artifact.kind_name(),
            self.path.display()
        );
        artifact.into_predictor_for(request)
    }
}

/// Training error types.
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingError {
    /// The request could not be built
    InvalidRequest(String),
    /// Network/HTTP error
    Network(String),
    /// Training service returned an error response
    Server { status: u16, message: String },
    /// Artifact could not be decoded
    Serialization(String),
    /// Artifact decoded but is unusable
    InvalidArtifact(String),
    /// Local artifact could not be read
    Io(String),
}

impl std::fmt::Display for TrainingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainingError::InvalidRequest(msg) => write!(f, "Invalid training request: {msg}"),
            TrainingError::Network(msg) => write!(f, "Trainer network error: {msg}"),
            TrainingError::Server { status, message } => {
                write!(f, "Trainer server error ({status}): {message}")
            }
            TrainingError::Serialization(msg) => write!(f, "Artifact decode error: {msg}"),
            TrainingError::InvalidArtifact(msg) => write!(f, "Invalid model artifact: {msg}"),
            TrainingError::Io(msg) => write!(f, "Artifact read error: {msg}"),
        }
    }
}

impl std::error::Error for TrainingError {}
