//! Demonstration of the motion activity classifier.
//!
//! This example shows how to:
//! 1. Build a classifier from a configuration
//! 2. Train it from an inline decision tree artifact
//! 3. Feed synthetic accelerometer readings through a channel source
//! 4. Receive one label per window
//!
//! Run with: cargo run --example replay_demo

use std::sync::Arc;
use std::time::Duration;

use motion_activity::{
    trainer::{ModelArtifact, Predictor, Trainer, TrainingError, TrainingRequest},
    ChannelSource, Classifier, ClassifierConfig, MotionEvent,
};

/// Serves a fixed artifact instead of calling a training service.
struct InlineTrainer(ModelArtifact);

impl Trainer for InlineTrainer {
    async fn train(&self, request: &TrainingRequest) -> Result<Box<dyn Predictor>, TrainingError> {
        self.0.clone().into_predictor_for(request)
    }
}

const CONFIG: &str = r#"{
    "server": "http://localhost:5000",
    "measurement": "demo",
    "sensors": ["Accelerometer-X", "Accelerometer-Y", "Accelerometer-Z"],
    "labels": ["STILL", "WALKING"],
    "preprocessor": {"type": "stddev", "window": 500},
    "classifier": {"type": "DecisionTreeClassifier", "max_depth": 1}
}"#;

/// Walking shows up as variance on the vertical axis.
const MODEL: &str = r#"{
    "kind": "decision_tree",
    "n_features": 3,
    "n_classes": 2,
    "nodes": [
        {"type": "split", "feature": 2, "threshold": 0.5, "left": 1, "right": 2},
        {"type": "leaf", "class": 0},
        {"type": "leaf", "class": 1}
    ]
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Motion Activity - Replay Demo");
    println!("=============================");
    println!();

    let config = ClassifierConfig::from_json_str(CONFIG)?;
    let artifact: ModelArtifact = serde_json::from_str(MODEL)?;

    let classifier = Arc::new(Classifier::new(
        config,
        InlineTrainer(artifact),
        |label: &str| println!("  -> {label}"),
    )?);

    let (source, feed) = ChannelSource::new();
    let handle = classifier.start_prediction(source).await?;
    println!("Instance ID: {}", classifier.instance_id());
    println!();

    // Two seconds standing still, then two seconds walking, at 50 Hz.
    for step in 0..200u32 {
        let t = f64::from(step) * 0.02;
        let bounce = if step < 100 {
            0.0
        } else {
            2.0 * (t * 2.0 * std::f64::consts::PI * 2.0).sin()
        };
        feed.push(MotionEvent::new(0.05, -0.02, 9.81 + bounce));
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    drop(feed);
    handle.wait().await?;

    println!();
    println!("{}", classifier.stats().summary());
    Ok(())
}
