//! Prediction session statistics.
//!
//! Counters are updated lock-free from the sensor feed and the flush
//! cadence, and can be persisted so totals accumulate across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Statistics for the current prediction session.
#[derive(Debug)]
pub struct PredictionStats {
    /// Number of sensor readings accepted into the buffer
    readings_received: AtomicU64,
    /// Number of readings discarded because the buffer was full
    readings_dropped: AtomicU64,
    /// Number of windows flushed
    windows_flushed: AtomicU64,
    /// Number of labels delivered to the callback
    predictions_emitted: AtomicU64,
    /// Number of cycles where the predictor rejected its input
    invalid_inputs: AtomicU64,
    /// Most recent label
    last_label: Mutex<Option<String>>,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl PredictionStats {
    /// Create empty statistics.
    pub fn new() -> Self {
        Self {
            readings_received: AtomicU64::new(0),
            readings_dropped: AtomicU64::new(0),
            windows_flushed: AtomicU64::new(0),
            predictions_emitted: AtomicU64::new(0),
            invalid_inputs: AtomicU64::new(0),
            last_label: Mutex::new(None),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create statistics that load from and save to `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous statistics: {}", e);
        }

        stats
    }

    pub fn record_reading(&self) {
        self.readings_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_reading(&self) {
        self.readings_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_window_flushed(&self) {
        self.windows_flushed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a delivered label.
    pub fn record_prediction(&self, label: &str) {
        self.predictions_emitted.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_label.lock() {
            *last = Some(label.to_string());
        }
    }

    pub fn record_invalid_input(&self) {
        self.invalid_inputs.fetch_add(1, Ordering::Relaxed);
    }

    /// Most recently delivered label.
    pub fn last_label(&self) -> Option<String> {
        self.last_label.lock().ok().and_then(|last| last.clone())
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            readings_received: self.readings_received.load(Ordering::Relaxed),
            readings_dropped: self.readings_dropped.load(Ordering::Relaxed),
            windows_flushed: self.windows_flushed.load(Ordering::Relaxed),
            predictions_emitted: self.predictions_emitted.load(Ordering::Relaxed),
            invalid_inputs: self.invalid_inputs.load(Ordering::Relaxed),
            last_label: self.last_label(),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Readings received: {}\n\
             - Readings dropped: {}\n\
             - Windows flushed: {}\n\
             - Predictions emitted: {}\n\
             - Invalid inputs: {}\n\
             - Last label: {}\n\
             - Session duration: {} seconds",
            stats.readings_received,
            stats.readings_dropped,
            stats.windows_flushed,
            stats.predictions_emitted,
            stats.invalid_inputs,
            stats.last_label.as_deref().unwrap_or("none"),
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.snapshot();
            let persisted = PersistedStats {
                readings_received: stats.readings_received,
                readings_dropped: stats.readings_dropped,
                windows_flushed: stats.windows_flushed,
                predictions_emitted: stats.predictions_emitted,
                invalid_inputs: stats.invalid_inputs,
                last_label: stats.last_label,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.readings_received
                    .store(persisted.readings_received, Ordering::Relaxed);
                self.readings_dropped
                    .store(persisted.readings_dropped, Ordering::Relaxed);
                self.windows_flushed
                    .store(persisted.windows_flushed, Ordering::Relaxed);
                self.predictions_emitted
                    .store(persisted.predictions_emitted, Ordering::Relaxed);
                self.invalid_inputs
                    .store(persisted.invalid_inputs, Ordering::Relaxed);
                if let Ok(last) = self.last_label.get_mut() {
                    *last = persisted.last_label;
                }
            }
        }
        Ok(())
    }

    /// Read persisted statistics without creating a live session.
    pub fn read_persisted(path: &std::path::Path) -> Result<Option<PersistedStats>, std::io::Error> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(std::io::Error::other)
    }
}

impl Default for PredictionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of prediction statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub readings_received: u64,
    pub readings_dropped: u64,
    pub windows_flushed: u64,
    pub predictions_emitted: u64,
    pub invalid_inputs: u64,
    pub last_label: Option<String>,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedStats {
    pub readings_received: u64,
    pub readings_dropped: u64,
    pub windows_flushed: u64,
    pub predictions_emitted: u64,
    pub invalid_inputs: u64,
    pub last_label: Option<String>,
    pub last_updated: DateTime<Utc>,
}

/// Thread-safe shared statistics.
pub type SharedStats = Arc<PredictionStats>;

/// Create new shared statistics.
pub fn create_shared_stats() -> SharedStats {
    Arc::new(PredictionStats::new())
}

/// Create new shared statistics with persistence.
pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedStats {
    Arc::new(PredictionStats::with_persistence(path))
}
