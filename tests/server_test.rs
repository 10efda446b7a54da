//! Integration tests for the status HTTP server

#[cfg(all(feature = "server", feature = "remote"))]
mod server_tests {
    use motion_activity::server::{run, ServerConfig, StatusProvider};
    use motion_activity::trainer::{Predictor, Trainer, TrainingError, TrainingRequest};
    use motion_activity::{Classifier, ClassifierConfig, MotionEvent};
    use std::sync::Arc;
    use std::time::Duration;

    struct ConstantTrainer;

    impl Trainer for ConstantTrainer {
        async fn train(
            &self,
            _request: &TrainingRequest,
        ) -> Result<Box<dyn Predictor>, TrainingError> {
            Ok(Box::new(|_: &[f64]| 0))
        }
    }

    fn classifier() -> Arc<Classifier<ConstantTrainer>> {
        let config = ClassifierConfig::from_json_str(
            r#"{
                "server": "http://localhost:5000",
                "measurement": "devicemotion",
                "sensors": ["Accelerometer-X", "Accelerometer-Y", "Accelerometer-Z"],
                "labels": ["STILL", "WALKING"],
                "preprocessor": {"type": "median", "window": 1000},
                "classifier": {"type": "DecisionTreeClassifier"}
            }"#,
        )
        .expect("valid config");

        Arc::new(Classifier::new(config, ConstantTrainer, |_: &str| {}).expect("classifier"))
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let provider: Arc<dyn StatusProvider> = classifier();

        // Start server on a random port
        let (addr, shutdown_tx) = run(ServerConfig::new(0), provider)
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        let response = reqwest::Client::new()
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_status_endpoint_reflects_classifier() {
        let classifier = classifier();
        classifier.train().await.expect("training");
        classifier
            .ingest(MotionEvent::new(0.1, 0.2, 9.8).into())
            .expect("ingest");

        let provider: Arc<dyn StatusProvider> = classifier.clone();
        let (addr, shutdown_tx) = run(ServerConfig::new(0), provider)
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let body: serde_json::Value = reqwest::Client::new()
            .get(format!("http://{}/status", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");

        assert_eq!(body["state"], "ready");
        assert_eq!(body["windowed"], true);
        assert_eq!(body["flush_interval_ms"], 1000);
        assert_eq!(body["buffered"], 1);
        assert_eq!(body["session_active"], false);
        assert_eq!(body["stats"]["readings_received"], 1);
        assert_eq!(
            body["instance_id"].as_str(),
            Some(classifier.instance_id().to_string().as_str())
        );

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let provider: Arc<dyn StatusProvider> = classifier();
        let (addr, shutdown_tx) = run(ServerConfig::new(0), provider)
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let response = reqwest::Client::new()
            .get(format!("http://{}/ingest", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status().as_u16(), 404);

        let _ = shutdown_tx.send(());
    }
}
