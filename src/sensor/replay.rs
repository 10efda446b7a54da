//! Replay of recorded sensor events from JSON lines.
//!
//! Each line holds one [`SensorEvent`], e.g.
//!
//! ```text
//! {"type":"motion","acceleration":{"x":0.1,"y":0.0,"z":9.8}}
//! {"type":"reading","values":{"Accelerometer-X":0.1,"Accelerometer-Y":0.0,"Accelerometer-Z":9.8}}
//! ```

use crate::sensor::{SensorError, SensorEvent, SensorSource, CHANNEL_CAPACITY};
use crossbeam_channel::{bounded, Receiver};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A source that replays events from a file or stdin.
pub struct ReplaySource {
    /// Input file; stdin when absent
    path: Option<PathBuf>,
    /// Delay between two events
    pace: Option<Duration>,
    running: Arc<AtomicBool>,
}

impl ReplaySource {
    /// Replay from a file, or stdin when `path` is `None`.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            pace: None,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Deliver events at `rate_hz` instead of as fast as they can be read.
    ///
    /// A rate whose period cannot be represented leaves replay unpaced.
    pub fn with_rate(mut self, rate_hz: f64) -> Self {
        self.pace = if rate_hz > 0.0 {
            let pace = Duration::try_from_secs_f64(1.0 / rate_hz).ok();
            if pace.is_none() {
                tracing::warn!("Replay rate {} Hz out of range, pacing disabled", rate_hz);
            }
            pace
        } else {
            None
        };
        self
    }

    fn open(&self) -> Result<Box<dyn BufRead + Send>, SensorError> {
        match self.path {
            Some(ref path) => {
                let file = std::fs::File::open(path)
                    .map_err(|e| SensorError::Io(format!("{}: {e}", path.display())))?;
                Ok(Box::new(BufReader::new(file)))
            }
            None => Ok(Box::new(BufReader::new(std::io::stdin()))),
        }
    }
}

impl SensorSource for ReplaySource {
    fn subscribe(&mut self) -> Result<Receiver<SensorEvent>, SensorError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SensorError::AlreadySubscribed);
        }

        let reader = self.open()?;
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        let running = Arc::clone(&self.running);
        let pace = self.pace;
        running.store(true, Ordering::SeqCst);

        thread::spawn(move || {
            for (number, line) in reader.lines().enumerate() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        tracing::error!("Replay input failed: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<SensorEvent>(&line) {
                    Ok(event) => {
                        if sender.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!("Skipping line {}: {}", number + 1, e),
                }

                if let Some(pace) = pace {
                    thread::sleep(pace);
                }
            }

            tracing::debug!("Replay finished");
            running.store(false, Ordering::SeqCst);
        });

        Ok(receiver)
    }

    fn unsubscribe(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_subscribed(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rate_sets_pace() {
        let source = ReplaySource::new(None).with_rate(4.0);
        assert_eq!(source.pace, Some(Duration::from_millis(250)));

        assert_eq!(ReplaySource::new(None).with_rate(0.0).pace, None);
        assert_eq!(ReplaySource::new(None).with_rate(f64::NAN).pace, None);
    }

    #[test]
    fn test_unrepresentable_rate_disables_pacing() {
        let source = ReplaySource::new(None).with_rate(1e-300);
        assert_eq!(source.pace, None);
    }

    #[test]
    fn test_replay_skips_bad_lines_and_ends() {
        let path = std::env::temp_dir().join(format!("replay-{}.jsonl", uuid::Uuid::new_v4()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, r#"{{"type":"motion","acceleration":{{"x":1.0,"y":2.0,"z":3.0}}}}"#)
                .unwrap();
            writeln!(file, "not json").unwrap();
            writeln!(file).unwrap();
            writeln!(file, r#"{{"type":"reading","values":{{"a":4.0}}}}"#).unwrap();
        }

        let mut source = ReplaySource::new(Some(path.clone()));
        let receiver = source.subscribe().unwrap();
        let events: Vec<SensorEvent> = receiver.iter().collect();

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SensorEvent::Motion(_)));
        assert!(matches!(events[1], SensorEvent::Reading(_)));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_missing_file_fails_to_subscribe() {
        let mut source = ReplaySource::new(Some(PathBuf::from("/nonexistent/replay.jsonl")));
        assert!(matches!(source.subscribe(), Err(SensorError::Io(_))));
        assert!(!source.is_subscribed());
    }
}
