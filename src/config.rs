//! Configuration for the motion activity classifier.

use crate::core::reducer::{ReducerKind, StdDevConvention};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration of a classifier instance.
///
/// Immutable once a [`Classifier`](crate::core::Classifier) is built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Base URL of the training service
    pub server: String,

    /// Dataset (measurement) the classifier is trained on
    pub measurement: String,

    /// Ordered sensor axes; determines feature vector column order
    pub sensors: Vec<String>,

    /// Ordered label names; predictions index into this list
    pub labels: Vec<String>,

    /// Window reduction, if any. Without it every frame predicts on the latest sample.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessor: Option<PreprocessorConfig>,

    /// Classifier type and hyperparameters forwarded to the trainer
    pub classifier: ClassifierSpec,

    /// Local runtime tuning
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// Window reduction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorConfig {
    /// Reduction applied to each axis of a window
    #[serde(rename = "type")]
    pub kind: ReducerKind,

    /// Window duration, in milliseconds on the wire
    #[serde(with = "duration_millis")]
    pub window: Duration,

    /// Standard deviation convention; must match the one used at training time
    #[serde(default)]
    pub std_dev: StdDevConvention,
}

/// Classifier type plus free-form hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(flatten)]
    pub hyperparameters: BTreeMap<String, serde_json::Value>,
}

/// Runtime knobs that are not part of the training request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Emulated display refresh rate for unwindowed prediction
    pub frame_rate_hz: u32,

    /// Upper bound on buffered readings if the flush cadence stalls
    pub max_buffered_readings: usize,

    /// Timeout for a single training request
    pub trainer_timeout_secs: u64,

    /// Path for persisted session statistics
    pub data_path: PathBuf,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motion-activity");

        Self {
            frame_rate_hz: 60,
            max_buffered_readings: 10_000,
            trainer_timeout_secs: 10,
            data_path: data_dir,
        }
    }
}

impl ClassifierConfig {
    /// Parse and validate a configuration from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClassifierConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Load configuration from the default location.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&Self::config_path())
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the default configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motion-activity")
            .join("config.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.runtime.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sensors.is_empty() {
            return Err(ConfigError::Invalid("at least one sensor axis is required".into()));
        }
        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if !seen.insert(sensor.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate sensor axis '{sensor}'")));
            }
        }
        if self.labels.is_empty() {
            return Err(ConfigError::Invalid("at least one label is required".into()));
        }
        if self.classifier.kind.trim().is_empty() {
            return Err(ConfigError::Invalid("classifier type must not be empty".into()));
        }
        if let Some(ref preprocessor) = self.preprocessor {
            if preprocessor.window.is_zero() {
                return Err(ConfigError::Invalid("preprocessor window must be positive".into()));
            }
        }
        if self.runtime.frame_rate_hz == 0 {
            return Err(ConfigError::Invalid("frame rate must be positive".into()));
        }
        if self.runtime.max_buffered_readings == 0 {
            return Err(ConfigError::Invalid("buffer capacity must be positive".into()));
        }
        Ok(())
    }

    /// Whether predictions run on fixed windows rather than every frame.
    pub fn is_windowed(&self) -> bool {
        self.preprocessor.is_some()
    }

    /// Interval between emulated display frames.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.runtime.frame_rate_hz.max(1)))
    }

    /// Interval between two flushes for the configured mode.
    pub fn flush_interval(&self) -> Duration {
        match self.preprocessor {
            Some(ref preprocessor) => preprocessor.window,
            None => self.frame_interval(),
        }
    }

    /// Path of the persisted statistics file.
    pub fn stats_path(&self) -> PathBuf {
        self.runtime.data_path.join("stats.json")
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    NotFound(PathBuf),
    Invalid(String),
    UnknownPreprocessor(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::NotFound(path) => write!(f, "Config file not found: {}", path.display()),
            ConfigError::Invalid(e) => write!(f, "Invalid config: {e}"),
            ConfigError::UnknownPreprocessor(name) => {
                write!(f, "Illegal preprocessor: {name} (expected min, max, median or stddev)")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"{
        "server": "http://localhost:5000",
        "measurement": "devicemotion",
        "sensors": ["Accelerometer-X", "Accelerometer-Y", "Accelerometer-Z"],
        "labels": ["STILL", "WALKING"],
        "preprocessor": { "type": "median", "window": 1000 },
        "classifier": { "type": "DecisionTreeClassifier", "max_depth": 2 }
    }"#;

    #[test]
    fn test_parse_example_config() {
        let config = ClassifierConfig::from_json_str(EXAMPLE).unwrap();
        assert_eq!(config.sensors.len(), 3);
        assert_eq!(config.labels, vec!["STILL", "WALKING"]);

        let preprocessor = config.preprocessor.as_ref().unwrap();
        assert_eq!(preprocessor.kind, ReducerKind::Median);
        assert_eq!(preprocessor.window, Duration::from_millis(1000));
        assert_eq!(preprocessor.std_dev, StdDevConvention::Sample);

        assert_eq!(config.classifier.kind, "DecisionTreeClassifier");
        assert_eq!(config.classifier.hyperparameters["max_depth"], 2);
        assert!(config.is_windowed());
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_unknown_preprocessor_rejected_at_parse() {
        let content = EXAMPLE.replace("\"median\"", "\"fft\"");
        let err = ClassifierConfig::from_json_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
        assert!(err.to_string().contains("Illegal preprocessor: fft"));
    }

    #[test]
    fn test_unwindowed_uses_frame_rate() {
        let content = EXAMPLE.replace(r#""preprocessor": { "type": "median", "window": 1000 },"#, "");
        let config = ClassifierConfig::from_json_str(&content).unwrap();
        assert!(!config.is_windowed());
        assert_eq!(config.runtime.frame_rate_hz, 60);
        assert!(config.flush_interval() < Duration::from_millis(20));
    }

    #[test]
    fn test_validation_failures() {
        let content = EXAMPLE.replace(r#""labels": ["STILL", "WALKING"]"#, r#""labels": []"#);
        assert!(matches!(
            ClassifierConfig::from_json_str(&content),
            Err(ConfigError::Invalid(_))
        ));

        let content = EXAMPLE.replace("\"Accelerometer-Z\"", "\"Accelerometer-X\"");
        assert!(matches!(
            ClassifierConfig::from_json_str(&content),
            Err(ConfigError::Invalid(_))
        ));

        let content = EXAMPLE.replace("\"window\": 1000", "\"window\": 0");
        assert!(matches!(
            ClassifierConfig::from_json_str(&content),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let config = ClassifierConfig::from_json_str(EXAMPLE).unwrap();
        let path = std::env::temp_dir()
            .join(format!("motion-activity-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");

        config.save(&path).unwrap();
        let loaded = ClassifierConfig::load(&path).unwrap();
        assert_eq!(loaded.sensors, config.sensors);
        assert_eq!(loaded.classifier.hyperparameters, config.classifier.hyperparameters);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_file() {
        let err = ClassifierConfig::load(Path::new("/nonexistent/motion-activity.json"));
        assert!(matches!(err, Err(ConfigError::NotFound(_))));
    }
}
