//! Classifier orchestration.
//!
//! A [`Classifier`] trains a predictor once, buffers projected sensor rows
//! and, on every cadence tick, drains the buffer, reduces it to a feature
//! vector and hands the resulting label to the host callback.
//!
//! ```text
//!  SensorSource ──▶ feed (blocking) ──▶ WindowBuffer
//!                                           │ drain on tick
//!  CadenceDriver ──▶ cadence (async) ───────┘──▶ reduce ──▶ predict ──▶ callback
//! ```

use crate::config::ClassifierConfig;
use crate::core::cadence::{CadenceDriver, IntervalCadence};
use crate::core::reducer::{self, FeatureVector, ReduceError};
use crate::core::windowing::WindowBuffer;
use crate::error::{ClassifierError, ErrorAction};
use crate::sensor::{SensorEvent, SensorSource};
use crate::stats::{create_shared_stats, SharedStats, StatsSnapshot};
use crate::trainer::{Predictor, Trainer, TrainingRequest, NO_PREDICTION};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;
use tokio::sync::{Notify, OnceCell};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How long the feed waits for a reading before re-checking for shutdown.
const FEED_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Host callback receiving each predicted label.
pub type LabelCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Host hook deciding whether a failed cycle ends the session.
pub type ErrorHook = Box<dyn Fn(&ClassifierError) -> ErrorAction + Send + Sync>;

/// Lifecycle of a classifier's predictor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierState {
    Untrained,
    Training,
    Ready,
}

/// Point-in-time view of a classifier for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub instance_id: Uuid,
    pub state: ClassifierState,
    pub windowed: bool,
    pub flush_interval_ms: u64,
    pub session_active: bool,
    pub buffered: usize,
    pub stats: StatsSnapshot,
}

/// Activity classifier bound to one configuration and one trainer.
pub struct Classifier<T: Trainer> {
    instance_id: Uuid,
    config: ClassifierConfig,
    trainer: T,
    predictor: OnceCell<Arc<dyn Predictor>>,
    /// Set while a training request is in flight
    training: AtomicBool,
    buffer: Mutex<WindowBuffer>,
    /// Held for the duration of one prediction cycle
    cycle: Mutex<()>,
    session_active: AtomicBool,
    callback: LabelCallback,
    error_hook: Option<ErrorHook>,
    stats: SharedStats,
}

impl<T: Trainer> Classifier<T> {
    /// Create an untrained classifier.
    pub fn new<F>(config: ClassifierConfig, trainer: T, callback: F) -> Result<Self, ClassifierError>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        config.validate()?;
        let buffer = WindowBuffer::new(config.runtime.max_buffered_readings);

        Ok(Self {
            instance_id: Uuid::new_v4(),
            config,
            trainer,
            predictor: OnceCell::new(),
            training: AtomicBool::new(false),
            buffer: Mutex::new(buffer),
            cycle: Mutex::new(()),
            session_active: AtomicBool::new(false),
            callback: Box::new(callback),
            error_hook: None,
            stats: create_shared_stats(),
        })
    }

    /// Record into `stats` instead of a private counter set.
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self
    }

    /// Decide per error whether a running session continues.
    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ClassifierError) -> ErrorAction + Send + Sync + 'static,
    {
        self.error_hook = Some(Box::new(hook));
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    pub fn state(&self) -> ClassifierState {
        if self.predictor.initialized() {
            ClassifierState::Ready
        } else if self.training.load(Ordering::SeqCst) {
            ClassifierState::Training
        } else {
            ClassifierState::Untrained
        }
    }

    /// Number of rows waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.lock_buffer().len()
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            instance_id: self.instance_id,
            state: self.state(),
            windowed: self.config.is_windowed(),
            flush_interval_ms: self.config.flush_interval().as_millis() as u64,
            session_active: self.is_session_active(),
            buffered: self.buffered(),
            stats: self.stats.snapshot(),
        }
    }

    /// Obtain the predictor, training it on first use.
    ///
    /// Concurrent callers share a single training request. A failed request
    /// leaves the classifier untrained so a later call can retry.
    pub async fn train(&self) -> Result<Arc<dyn Predictor>, ClassifierError> {
        let predictor = self
            .predictor
            .get_or_try_init(|| async {
                let _training = TrainingGuard::enter(&self.training);
                let request = TrainingRequest::from_config(&self.config);
                tracing::info!(
                    classifier = %request.classifier,
                    measurement = %request.measurement,
                    "Training classifier"
                );

                match self.trainer.train(&request).await {
                    Ok(predictor) => {
                        tracing::info!("Classifier {} ready", self.instance_id);
                        Ok(Arc::from(predictor))
                    }
                    Err(e) => {
                        tracing::error!("Training failed: {}", e);
                        Err(ClassifierError::Training(e))
                    }
                }
            })
            .await?;

        Ok(Arc::clone(predictor))
    }

    /// Project one sensor event onto the configured axes and buffer it.
    pub fn ingest(&self, event: SensorEvent) -> Result<(), ClassifierError> {
        let reading = event.into_reading()?;
        let row = reading.project(&self.config.sensors)?;

        let (kept, dropped) = {
            let mut buffer = self.lock_buffer();
            let kept = buffer.append(row, reading.timestamp);
            (kept, buffer.dropped_count())
        };

        self.stats.record_reading();
        if !kept {
            self.stats.record_dropped_reading();
            if dropped == 1 || dropped % 1000 == 0 {
                tracing::warn!(
                    "Window buffer full, {} oldest readings discarded so far",
                    dropped
                );
            }
        }
        Ok(())
    }

    /// Run one prediction cycle.
    ///
    /// An empty buffer is a no-op. If another cycle is in progress this one
    /// is skipped.
    pub fn run_prediction(&self) -> Result<(), ClassifierError> {
        let _cycle = match self.cycle.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("Prediction cycle already in progress, skipping");
                return Ok(());
            }
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        self.predict_window()
    }

    /// Flush whatever the buffer holds, waiting for a running cycle first.
    fn flush_remaining(&self) -> Result<(), ClassifierError> {
        let _cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);
        self.predict_window()
    }

    fn predict_window(&self) -> Result<(), ClassifierError> {
        let predictor = match self.predictor.get() {
            Some(predictor) => Arc::clone(predictor),
            None if self.buffered() == 0 => return Ok(()),
            None => return Err(ClassifierError::NotTrained),
        };

        let window = {
            let mut buffer = self.lock_buffer();
            if buffer.is_empty() {
                return Ok(());
            }
            buffer.drain()
        };
        self.stats.record_window_flushed();

        let rows = window.len();
        let duration = window.duration_secs();
        let features: FeatureVector = match self.config.preprocessor {
            Some(ref preprocessor) => {
                reducer::reduce(&window.rows, preprocessor.kind, preprocessor.std_dev)?
            }
            None => window.into_last().ok_or(ReduceError::EmptyWindow)?,
        };
        tracing::debug!(rows, duration, ?features, "Window reduced");

        let index = predictor.predict(&features);
        self.dispatch(index, features)
    }

    fn dispatch(&self, index: i64, features: FeatureVector) -> Result<(), ClassifierError> {
        if index == NO_PREDICTION {
            self.stats.record_invalid_input();
            return Err(ClassifierError::InvalidInput { features });
        }

        let label = usize::try_from(index)
            .ok()
            .and_then(|i| self.config.labels.get(i))
            .ok_or(ClassifierError::Protocol {
                index,
                labels: self.config.labels.len(),
            })?;

        self.stats.record_prediction(label);
        (self.callback)(label.as_str());
        Ok(())
    }

    fn error_action(&self, error: &ClassifierError) -> ErrorAction {
        let action = match self.error_hook {
            Some(ref hook) => hook(error),
            None => ErrorAction::default_for(error),
        };

        match action {
            ErrorAction::Continue => tracing::warn!("Prediction failed: {}", error),
            ErrorAction::Stop => tracing::error!("Prediction failed, stopping: {}", error),
        }
        action
    }

    fn lock_buffer(&self) -> MutexGuard<'_, WindowBuffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Trainer> Classifier<T> {
    /// Start predicting from `source` on the configured cadence.
    ///
    /// Trains first if needed. Windowed classifiers flush once per window
    /// length, unwindowed ones once per emulated display frame.
    pub async fn start_prediction<S>(
        self: &Arc<Self>,
        source: S,
    ) -> Result<PredictionHandle, ClassifierError>
    where
        S: SensorSource,
    {
        let cadence = IntervalCadence::for_config(&self.config);
        tracing::debug!("Flushing every {}ms", cadence.period().as_millis());
        self.start_prediction_with(source, cadence).await
    }

    /// Start predicting from `source`, flushing on every tick of `cadence`.
    pub async fn start_prediction_with<S, D>(
        self: &Arc<Self>,
        mut source: S,
        cadence: D,
    ) -> Result<PredictionHandle, ClassifierError>
    where
        S: SensorSource,
        D: CadenceDriver,
    {
        self.train().await?;

        if self.session_active.swap(true, Ordering::SeqCst) {
            return Err(ClassifierError::AlreadyRunning);
        }

        let receiver = match source.subscribe() {
            Ok(receiver) => receiver,
            Err(e) => {
                self.session_active.store(false, Ordering::SeqCst);
                return Err(ClassifierError::FatalSensor(e));
            }
        };

        tracing::info!(
            windowed = self.config.is_windowed(),
            interval_ms = self.config.flush_interval().as_millis() as u64,
            "Prediction started"
        );

        let session = Arc::new(ActiveSession {
            classifier: Arc::clone(self),
        });
        let signal = Arc::new(SessionSignal::new());

        let feed = tokio::task::spawn_blocking({
            let session = Arc::clone(&session);
            let signal = Arc::clone(&signal);
            move || run_feed(&*session.classifier, source, receiver, &signal)
        });

        let cadence = tokio::spawn({
            let signal = Arc::clone(&signal);
            async move { run_cadence(&*session.classifier, cadence, &signal).await }
        });

        Ok(PredictionHandle {
            signal,
            feed: Some(feed),
            cadence: Some(cadence),
        })
    }
}

/// Marks the classifier as training for as long as it lives.
struct TrainingGuard<'a>(&'a AtomicBool);

impl<'a> TrainingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for TrainingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Shared by a session's tasks; the last one to finish ends the session.
struct ActiveSession<T: Trainer> {
    classifier: Arc<Classifier<T>>,
}

impl<T: Trainer> Drop for ActiveSession<T> {
    fn drop(&mut self) {
        self.classifier.session_active.store(false, Ordering::SeqCst);
        tracing::info!("Prediction stopped");
    }
}

/// Stop signal shared by a session's tasks and its handle.
struct SessionSignal {
    running: AtomicBool,
    shutdown: Notify,
}

impl SessionSignal {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            shutdown: Notify::new(),
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }
}

/// Move events from the source into the buffer until stopped.
///
/// Runs on a blocking thread. Once the loop ends the source is released, the
/// events still queued are ingested and the remaining partial window is
/// flushed.
fn run_feed<T, S>(
    classifier: &Classifier<T>,
    mut source: S,
    receiver: Receiver<SensorEvent>,
    signal: &SessionSignal,
) -> Result<(), ClassifierError>
where
    T: Trainer,
    S: SensorSource,
{
    let mut result = Ok(());

    while signal.is_running() {
        match receiver.recv_timeout(FEED_POLL_INTERVAL) {
            Ok(event) => {
                if let Err(e) = classifier.ingest(event) {
                    tracing::error!("Sensor feed failed: {}", e);
                    result = Err(e);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("Sensor source ended");
                break;
            }
        }
    }

    source.unsubscribe();
    signal.stop();

    // Events the source already accepted still belong to this session.
    if result.is_ok() {
        for event in receiver.try_iter() {
            if let Err(e) = classifier.ingest(event) {
                tracing::error!("Sensor feed failed: {}", e);
                result = Err(e);
                break;
            }
        }
    }

    if let Err(e) = classifier.flush_remaining() {
        classifier.error_action(&e);
    }

    result
}

/// Trigger a prediction cycle on every cadence tick until stopped.
async fn run_cadence<T, D>(
    classifier: &Classifier<T>,
    mut cadence: D,
    signal: &SessionSignal,
) -> Result<(), ClassifierError>
where
    T: Trainer,
    D: CadenceDriver,
{
    let mut result = Ok(());

    while signal.is_running() {
        tokio::select! {
            _ = signal.shutdown.notified() => break,
            more = cadence.next_tick() => {
                if !more {
                    tracing::debug!("Cadence exhausted");
                    break;
                }
                if let Err(e) = classifier.run_prediction() {
                    if classifier.error_action(&e) == ErrorAction::Stop {
                        result = Err(e);
                        break;
                    }
                }
            }
        }
    }

    signal.stop();
    result
}

/// Handle to a running prediction session.
///
/// Dropping the handle stops the session without waiting for it.
pub struct PredictionHandle {
    signal: Arc<SessionSignal>,
    feed: Option<JoinHandle<Result<(), ClassifierError>>>,
    cadence: Option<JoinHandle<Result<(), ClassifierError>>>,
}

impl PredictionHandle {
    pub fn is_running(&self) -> bool {
        self.signal.is_running()
    }

    /// A handle that can stop the session from elsewhere, such as a signal
    /// handler, while this one is being waited on.
    pub fn stopper(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.signal))
    }

    /// Stop the session and wait until the source is released and the last
    /// window has been flushed.
    pub async fn stop(mut self) -> Result<(), ClassifierError> {
        self.signal.stop();
        self.join().await
    }

    /// Wait for the session to end on its own.
    ///
    /// Returns the error that ended it, if any.
    pub async fn wait(mut self) -> Result<(), ClassifierError> {
        self.join().await
    }

    async fn join(&mut self) -> Result<(), ClassifierError> {
        let feed = match self.feed.take() {
            Some(task) => flatten(task.await),
            None => Ok(()),
        };
        let cadence = match self.cadence.take() {
            Some(task) => flatten(task.await),
            None => Ok(()),
        };
        feed.and(cadence)
    }
}

impl Drop for PredictionHandle {
    fn drop(&mut self) {
        self.signal.stop();
    }
}

/// Requests a session stop without waiting for it.
#[derive(Clone)]
pub struct StopHandle(Arc<SessionSignal>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.stop();
    }
}

fn flatten(
    joined: Result<Result<(), ClassifierError>, tokio::task::JoinError>,
) -> Result<(), ClassifierError> {
    joined.unwrap_or_else(|e| Err(ClassifierError::TaskFailed(e.to_string())))
}
