pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod store;

pub use config::EngineConfig;
pub use engine::engine::AnalyticsEngine;
pub use engine::types::*;
pub use error::EngineError;
pub use store::{AttemptStore, StoreError};
