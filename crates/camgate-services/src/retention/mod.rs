mod service;

pub use service::{CycleReport, RetentionService, RetentionStats, TierReport};
