//! Flush cadence drivers.
//!
//! A cadence decides when the classifier drains its window buffer and
//! predicts. Windowed classifiers flush on a fixed timer whose period is the
//! window length; unwindowed classifiers flush once per host frame.

use crate::config::ClassifierConfig;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Source of flush ticks.
pub trait CadenceDriver: Send + 'static {
    /// Wait for the next tick. Returns `false` once no more ticks will come.
    fn next_tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fixed-period ticks; the first tick fires one full period after start.
pub struct IntervalCadence {
    period: Duration,
    interval: Option<Interval>,
}

impl IntervalCadence {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Window-length timer for windowed classifiers, emulated display
    /// refresh for unwindowed ones.
    pub fn for_config(config: &ClassifierConfig) -> Self {
        Self::new(config.flush_interval())
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl CadenceDriver for IntervalCadence {
    async fn next_tick(&mut self) -> bool {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
        true
    }
}

/// Ticks driven by the host's render or event loop through a [`FrameTicker`].
pub struct FrameCadence {
    ticks: mpsc::Receiver<()>,
}

/// Handle the host uses to signal a frame.
#[derive(Clone)]
pub struct FrameTicker {
    sender: mpsc::Sender<()>,
}

impl FrameCadence {
    pub fn new() -> (Self, FrameTicker) {
        // One pending frame at most; ticks arriving faster than the
        // classifier flushes are coalesced.
        let (sender, ticks) = mpsc::channel(1);
        (Self { ticks }, FrameTicker { sender })
    }
}

impl CadenceDriver for FrameCadence {
    async fn next_tick(&mut self) -> bool {
        self.ticks.recv().await.is_some()
    }
}

impl FrameTicker {
    /// Signal a frame. Returns `false` once the cadence has stopped.
    pub fn tick(&self) -> bool {
        match self.sender.try_send(()) {
            Ok(()) | Err(mpsc::error::TrySendError::Full(())) => true,
            Err(mpsc::error::TrySendError::Closed(())) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_interval_waits_one_period() {
        let mut cadence = IntervalCadence::new(Duration::from_millis(50));
        let start = std::time::Instant::now();
        assert!(cadence.next_tick().await);
        assert!(start.elapsed() >= Duration::from_millis(45));
        assert!(cadence.next_tick().await);
        assert!(start.elapsed() >= Duration::from_millis(95));
    }

    #[test]
    fn test_period_follows_config() {
        let windowed = ClassifierConfig::from_json_str(
            r#"{
                "server": "http://localhost:5000",
                "measurement": "devicemotion",
                "sensors": ["Accelerometer-X"],
                "labels": ["STILL"],
                "preprocessor": {"type": "max", "window": 250},
                "classifier": {"type": "DecisionTreeClassifier"}
            }"#,
        )
        .unwrap();
        assert_eq!(
            IntervalCadence::for_config(&windowed).period(),
            Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn test_frame_ticks_coalesce_and_close() {
        let (mut cadence, ticker) = FrameCadence::new();
        assert!(ticker.tick());
        assert!(ticker.tick());
        assert!(cadence.next_tick().await);

        drop(ticker);
        assert!(!cadence.next_tick().await);
    }

    #[tokio::test]
    async fn test_ticker_reports_closed_cadence() {
        let (cadence, ticker) = FrameCadence::new();
        drop(cadence);
        assert!(!ticker.tick());
    }
}
