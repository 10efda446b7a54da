//! Sensor acquisition for the motion activity runtime.
//!
//! A [`SensorSource`] delivers a push-style stream of [`SensorEvent`]s over a
//! channel. The classifier subscribes once per prediction session and
//! unsubscribes when the session ends.

pub mod channel;
pub mod replay;
pub mod types;

pub use channel::{ChannelSource, SensorFeed};
pub use replay::ReplaySource;
pub use types::{
    Acceleration, MotionEvent, SensorEvent, SensorReading, ACCELEROMETER_X, ACCELEROMETER_Y,
    ACCELEROMETER_Z,
};

use crossbeam_channel::Receiver;

/// Capacity of the channels between a source and its subscriber.
pub const CHANNEL_CAPACITY: usize = 10_000;

/// A producer of sensor events.
pub trait SensorSource: Send + 'static {
    /// Start delivering events. Fails if the source is already subscribed.
    fn subscribe(&mut self) -> Result<Receiver<SensorEvent>, SensorError>;

    /// Stop delivering events.
    fn unsubscribe(&mut self);

    /// Check if a subscriber is currently attached.
    fn is_subscribed(&self) -> bool;
}

/// Errors that can occur while acquiring sensor data.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// The source already has a subscriber
    AlreadySubscribed,
    /// The platform cannot provide a required capability
    Unavailable(String),
    /// A reading lacks a configured axis
    MissingAxis(String),
    /// The underlying input could not be opened
    Io(String),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::AlreadySubscribed => write!(f, "Sensor source is already subscribed"),
            SensorError::Unavailable(capability) => {
                write!(f, "Device does not support {capability}")
            }
            SensorError::MissingAxis(axis) => write!(f, "Reading has no value for axis '{axis}'"),
            SensorError::Io(e) => write!(f, "Sensor input error: {e}"),
        }
    }
}

impl std::error::Error for SensorError {}
