//! Window buffer collecting sensor rows between two flushes.
//!
//! Rows are appended by the sensor feed and drained in full by the flush
//! cadence. Windows are tumbling: a drained row never appears in a later
//! window.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// The rows accumulated between two consecutive flushes.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Rows in arrival order, one value per configured axis
    pub rows: Vec<Vec<f64>>,
    /// Arrival time of the first row
    pub opened_at: Option<DateTime<Utc>>,
    /// Time the window was drained
    pub closed_at: DateTime<Utc>,
}

impl Window {
    /// Check if the window has any rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get the number of rows in this window.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Take the most recent row, discarding the rest.
    pub fn into_last(mut self) -> Option<Vec<f64>> {
        self.rows.pop()
    }

    /// Time covered by the window in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.opened_at
            .map(|start| (self.closed_at - start).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0)
    }
}

/// Accumulates rows until the next flush.
#[derive(Debug)]
pub struct WindowBuffer {
    rows: VecDeque<Vec<f64>>,
    /// Maximum rows retained if flushing stalls
    capacity: usize,
    /// Arrival time of the oldest retained row
    opened_at: Option<DateTime<Utc>>,
    /// Rows discarded because the buffer was full
    dropped: u64,
}

impl WindowBuffer {
    /// Create a buffer holding at most `capacity` rows.
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: VecDeque::new(),
            capacity: capacity.max(1),
            opened_at: None,
            dropped: 0,
        }
    }

    /// Append a row received at `at`.
    ///
    /// Returns `false` if the buffer was full and its oldest row was discarded.
    pub fn append(&mut self, row: Vec<f64>, at: DateTime<Utc>) -> bool {
        if self.opened_at.is_none() {
            self.opened_at = Some(at);
        }

        let mut kept_all = true;
        if self.rows.len() >= self.capacity {
            self.rows.pop_front();
            self.dropped += 1;
            kept_all = false;
        }

        self.rows.push_back(row);
        kept_all
    }

    /// Return every buffered row and reset the buffer to empty.
    pub fn drain(&mut self) -> Window {
        let rows = std::mem::take(&mut self.rows);
        Window {
            rows: rows.into(),
            opened_at: self.opened_at.take(),
            closed_at: Utc::now(),
        }
    }

    /// Get the number of buffered rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the buffer holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total rows discarded since creation.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_returns_rows_in_order_and_clears() {
        let mut buffer = WindowBuffer::new(100);
        let now = Utc::now();

        buffer.append(vec![1.0, 2.0], now);
        buffer.append(vec![3.0, 4.0], now);
        buffer.append(vec![5.0, 6.0], now);
        assert_eq!(buffer.len(), 3);

        let window = buffer.drain();
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert_eq!(
            window.rows,
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]
        );
        assert_eq!(window.opened_at, Some(now));
    }

    #[test]
    fn test_windows_do_not_overlap() {
        let mut buffer = WindowBuffer::new(100);
        buffer.append(vec![1.0], Utc::now());
        let first = buffer.drain();

        buffer.append(vec![2.0], Utc::now());
        let second = buffer.drain();

        assert_eq!(first.rows, vec![vec![1.0]]);
        assert_eq!(second.rows, vec![vec![2.0]]);
        assert!(buffer.drain().is_empty());
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut buffer = WindowBuffer::new(2);
        assert!(buffer.append(vec![1.0], Utc::now()));
        assert!(buffer.append(vec![2.0], Utc::now()));
        assert!(!buffer.append(vec![3.0], Utc::now()));

        assert_eq!(buffer.dropped_count(), 1);
        assert_eq!(buffer.drain().rows, vec![vec![2.0], vec![3.0]]);
    }

    #[test]
    fn test_concurrent_drains_keep_every_row_once() {
        use std::sync::{Arc, Mutex};

        const ROWS: usize = 20_000;
        let buffer = Arc::new(Mutex::new(WindowBuffer::new(ROWS)));

        let producer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for i in 0..ROWS {
                    buffer.lock().unwrap().append(vec![i as f64], Utc::now());
                }
            })
        };

        let mut drained = Vec::with_capacity(ROWS);
        loop {
            let finished = producer.is_finished();
            let window = buffer.lock().unwrap().drain();
            drained.extend(window.rows.into_iter().map(|row| row[0] as usize));
            if finished {
                break;
            }
            std::thread::yield_now();
        }
        producer.join().unwrap();

        assert!(buffer.lock().unwrap().is_empty());
        assert_eq!(buffer.lock().unwrap().dropped_count(), 0);
        assert_eq!(drained, (0..ROWS).collect::<Vec<_>>());
    }

    #[test]
    fn test_into_last() {
        let mut buffer = WindowBuffer::new(10);
        buffer.append(vec![1.0], Utc::now());
        buffer.append(vec![2.0], Utc::now());
        assert_eq!(buffer.drain().into_last(), Some(vec![2.0]));
    }
}
