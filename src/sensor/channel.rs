//! In-process sensor source fed by the host application.

use crate::sensor::{SensorError, SensorEvent, SensorSource, CHANNEL_CAPACITY};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A source whose events are pushed through a [`SensorFeed`].
///
/// The stream ends once every feed handle has been dropped.
pub struct ChannelSource {
    receiver: Receiver<SensorEvent>,
    subscribed: Arc<AtomicBool>,
}

/// Producer handle for a [`ChannelSource`].
#[derive(Clone)]
pub struct SensorFeed {
    sender: Sender<SensorEvent>,
    subscribed: Arc<AtomicBool>,
}

impl ChannelSource {
    /// Create a new source and the feed that drives it.
    pub fn new() -> (Self, SensorFeed) {
        let (sender, receiver) = bounded(CHANNEL_CAPACITY);
        let subscribed = Arc::new(AtomicBool::new(false));

        let source = Self {
            receiver,
            subscribed: Arc::clone(&subscribed),
        };
        let feed = SensorFeed { sender, subscribed };

        (source, feed)
    }
}

impl SensorSource for ChannelSource {
    fn subscribe(&mut self) -> Result<Receiver<SensorEvent>, SensorError> {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Err(SensorError::AlreadySubscribed);
        }
        Ok(self.receiver.clone())
    }

    fn unsubscribe(&mut self) {
        self.subscribed.store(false, Ordering::SeqCst);
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }
}

impl SensorFeed {
    /// Push an event to the subscriber.
    ///
    /// Returns `false` if nobody is subscribed or the channel is full.
    pub fn push(&self, event: impl Into<SensorEvent>) -> bool {
        if !self.subscribed.load(Ordering::SeqCst) {
            return false;
        }

        match self.sender.try_send(event.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Sensor channel full, event dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Check if a subscriber is attached.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }
}
