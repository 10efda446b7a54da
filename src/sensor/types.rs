//! Sensor event types.
//!
//! A reading is a set of named axis values stamped with its arrival time.
//! Device motion events are converted into readings on the accelerometer axes.

use crate::sensor::SensorError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Axis names produced by device motion events.
pub const ACCELEROMETER_X: &str = "Accelerometer-X";
pub const ACCELEROMETER_Y: &str = "Accelerometer-Y";
pub const ACCELEROMETER_Z: &str = "Accelerometer-Z";

/// A reading of one or more named sensor axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// When the reading arrived
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Axis name to value
    pub values: BTreeMap<String, f64>,
}

impl SensorReading {
    pub fn new(values: BTreeMap<String, f64>) -> Self {
        Self {
            timestamp: Utc::now(),
            values,
        }
    }

    /// Build a reading from `(axis, value)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(axis, value)| (axis.to_string(), value))
                .collect(),
        )
    }

    pub fn get(&self, axis: &str) -> Option<f64> {
        self.values.get(axis).copied()
    }

    /// Extract the configured axes, in order, as one window row.
    ///
    /// Every axis must be present with a finite value.
    pub fn project(&self, axes: &[String]) -> Result<Vec<f64>, SensorError> {
        axes.iter()
            .map(|axis| match self.get(axis) {
                Some(value) if value.is_finite() => Ok(value),
                _ => Err(SensorError::MissingAxis(axis.clone())),
            })
            .collect()
    }
}

/// Acceleration along the device axes; a platform without an
/// accelerometer reports the components as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
}

/// A raw device motion event as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionEvent {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub acceleration: Option<Acceleration>,
}

impl MotionEvent {
    /// Create a motion event with full acceleration data.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            acceleration: Some(Acceleration {
                x: Some(x),
                y: Some(y),
                z: Some(z),
            }),
        }
    }

    /// Create an event from a device that cannot measure acceleration.
    pub fn unavailable() -> Self {
        Self {
            timestamp: Utc::now(),
            acceleration: None,
        }
    }

    /// Convert to a reading on the accelerometer axes.
    pub fn into_reading(self) -> Result<SensorReading, SensorError> {
        let acceleration = self
            .acceleration
            .ok_or_else(|| SensorError::Unavailable("acceleration".to_string()))?;

        match (acceleration.x, acceleration.y, acceleration.z) {
            (Some(x), Some(y), Some(z)) => Ok(SensorReading {
                timestamp: self.timestamp,
                values: BTreeMap::from([
                    (ACCELEROMETER_X.to_string(), x),
                    (ACCELEROMETER_Y.to_string(), y),
                    (ACCELEROMETER_Z.to_string(), z),
                ]),
            }),
            _ => Err(SensorError::Unavailable("acceleration".to_string())),
        }
    }
}

/// Unified event type delivered by a sensor source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorEvent {
    Motion(MotionEvent),
    Reading(SensorReading),
}

impl SensorEvent {
    /// Normalize into a named-axis reading.
    pub fn into_reading(self) -> Result<SensorReading, SensorError> {
        match self {
            SensorEvent::Motion(e) => e.into_reading(),
            SensorEvent::Reading(r) => Ok(r),
        }
    }
}

impl From<MotionEvent> for SensorEvent {
    fn from(event: MotionEvent) -> Self {
        SensorEvent::Motion(event)
    }
}

impl From<SensorReading> for SensorEvent {
    fn from(reading: SensorReading) -> Self {
        SensorEvent::Reading(reading)
    }
}
