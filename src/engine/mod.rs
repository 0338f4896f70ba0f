pub mod buckets;
pub mod cognitive;
pub mod engine;
pub mod readiness;
pub mod schedule;
pub mod types;
pub mod wellness;

pub use engine::AnalyticsEngine;
pub use types::*;
