//! Errors surfaced by the classifier.

use crate::config::ConfigError;
use crate::core::reducer::ReduceError;
use crate::sensor::SensorError;
use crate::trainer::TrainingError;

/// Errors raised by training, ingestion or a prediction cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierError {
    /// Invalid configuration or an unreducible window
    Configuration(String),
    /// The trainer failed; the classifier stays untrained
    Training(TrainingError),
    /// A required sensor capability is missing; ends the session
    FatalSensor(SensorError),
    /// The predictor could not classify this feature vector
    InvalidInput { features: Vec<f64> },
    /// The predictor returned an index outside the label set
    Protocol { index: i64, labels: usize },
    /// A prediction was requested before training finished
    NotTrained,
    /// A prediction session is already active
    AlreadyRunning,
    /// A session task panicked or was aborted
    TaskFailed(String),
}

impl ClassifierError {
    /// Whether the next prediction cycle can proceed normally.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ClassifierError::InvalidInput { .. })
    }
}

impl std::fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            ClassifierError::Training(e) => write!(f, "Training failed: {e}"),
            ClassifierError::FatalSensor(e) => write!(f, "Fatal sensor error: {e}"),
            ClassifierError::InvalidInput { features } => {
                write!(f, "Invalid input used for prediction: {features:?}")
            }
            ClassifierError::Protocol { index, labels } => write!(
                f,
                "Predictor returned label index {index}, but only {labels} labels are configured"
            ),
            ClassifierError::NotTrained => write!(f, "Classifier has not been trained"),
            ClassifierError::AlreadyRunning => write!(f, "Prediction is already running"),
            ClassifierError::TaskFailed(msg) => write!(f, "Prediction task failed: {msg}"),
        }
    }
}

impl std::error::Error for ClassifierError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClassifierError::Training(e) => Some(e),
            ClassifierError::FatalSensor(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TrainingError> for ClassifierError {
    fn from(e: TrainingError) -> Self {
        ClassifierError::Training(e)
    }
}

impl From<SensorError> for ClassifierError {
    fn from(e: SensorError) -> Self {
        ClassifierError::FatalSensor(e)
    }
}

impl From<ReduceError> for ClassifierError {
    fn from(e: ReduceError) -> Self {
        ClassifierError::Configuration(e.to_string())
    }
}

impl From<ConfigError> for ClassifierError {
    fn from(e: ConfigError) -> Self {
        ClassifierError::Configuration(e.to_string())
    }
}

/// What the cadence does after a failed prediction cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    Continue,
    Stop,
}

impl ErrorAction {
    /// Continue after recoverable errors, stop after everything else.
    pub fn default_for(error: &ClassifierError) -> Self {
        if error.is_recoverable() {
            ErrorAction::Continue
        } else {
            ErrorAction::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let invalid = ClassifierError::InvalidInput {
            features: vec![1.0],
        };
        assert_eq!(ErrorAction::default_for(&invalid), ErrorAction::Continue);

        let protocol = ClassifierError::Protocol {
            index: 7,
            labels: 2,
        };
        assert_eq!(ErrorAction::default_for(&protocol), ErrorAction::Stop);
        assert!(protocol.to_string().contains("index 7"));
    }

    #[test]
    fn test_conversions() {
        let err: ClassifierError = SensorError::Unavailable("acceleration".into()).into();
        assert!(matches!(err, ClassifierError::FatalSensor(_)));
        assert!(err.to_string().contains("acceleration"));

        let err: ClassifierError = ReduceError::EmptyWindow.into();
        assert!(matches!(err, ClassifierError::Configuration(_)));
    }
}
