//! Core functionality of the motion activity runtime.
//!
//! This module contains:
//! - Window reduction into feature vectors
//! - The window buffer collecting projected sensor rows
//! - Flush cadences
//! - The classifier orchestrating training and prediction

pub mod cadence;
pub mod classifier;
pub mod reducer;
pub mod windowing;

// Re-export commonly used types
pub use cadence::{CadenceDriver, FrameCadence, FrameTicker, IntervalCadence};
pub use classifier::{
    Classifier, ClassifierState, ErrorHook, LabelCallback, PredictionHandle, StatusReport,
    StopHandle,
};
pub use reducer::{reduce, FeatureVector, ReduceError, ReducerKind, StdDevConvention};
pub use windowing::{Window, WindowBuffer};
