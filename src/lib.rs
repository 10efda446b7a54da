//! Motion Activity - on-device activity classification from motion sensors.
//!
//! This library trains a classifier once through a pluggable trainer, then
//! continuously turns accelerometer readings into activity labels.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Motion Activity Runtime                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Sensor    │──▶│  Windowing  │──▶│   Reducer   │       │
//! │  │   Source    │   │  (buffer)   │   │ (min/max/..)│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           ▲                  │              │
//! │                     cadence tick             ▼              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │    Stats    │◀──│  Callback   │◀──│  Predictor  │◀─ Trainer
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use motion_activity::{ArtifactTrainer, ChannelSource, Classifier, ClassifierConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClassifierConfig::load_default()?;
//! let trainer = ArtifactTrainer::new("model.json");
//! let classifier = Arc::new(Classifier::new(config, trainer, |label: &str| {
//!     println!("activity: {label}");
//! })?);
//!
//! let (source, feed) = ChannelSource::new();
//! let handle = classifier.start_prediction(source).await?;
//! // Push readings through `feed` from the platform sensor callback.
//! # drop(feed);
//! handle.wait().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod sensor;
pub mod stats;
pub mod trainer;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{ClassifierConfig, ConfigError, PreprocessorConfig, RuntimeConfig};
pub use core::{
    CadenceDriver, Classifier, ClassifierState, FrameCadence, FrameTicker,
    IntervalCadence, PredictionHandle, ReducerKind, StatusReport, StdDevConvention, StopHandle,
};
pub use error::{ClassifierError, ErrorAction};
pub use sensor::{
    ChannelSource, MotionEvent, ReplaySource, SensorError, SensorEvent, SensorFeed, SensorReading,
    SensorSource,
};
pub use stats::{PredictionStats, SharedStats, StatsSnapshot};
pub use trainer::{
    ArtifactTrainer, ModelArtifact, Predictor, Trainer, TrainingError, TrainingRequest,
    NO_PREDICTION,
};

#[cfg(feature = "remote")]
pub use trainer::HttpTrainer;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
