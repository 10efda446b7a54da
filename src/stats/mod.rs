//! Statistics about what the runtime has processed.

pub mod log;

pub use log::{
    create_shared_stats, create_shared_stats_with_persistence, PersistedStats, PredictionStats,
    SharedStats, StatsSnapshot,
};
