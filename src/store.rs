use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::engine::types::{Attempt, QuestionMeta};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store read timed out after {0}ms")]
    Timeout(u64),
}

/// Read-only view onto the attempt-tracking collaborator.
///
/// The engine never writes through this trait; attempt history stays the
/// single source of truth and every derived artifact is recomputed from it.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Attempts for one user since `since`, ordered by timestamp ascending.
    /// An unknown user id yields an empty list, which the engine surfaces
    /// as `InsufficientData` rather than a zeroed artifact.
    async fn attempts_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Attempt>, StoreError>;

    /// Metadata for the given question ids. Ids without metadata are simply
    /// absent from the map; the engine falls back to the fields carried on
    /// the attempt itself.
    async fn question_meta(
        &self,
        question_ids: &[String],
    ) -> Result<HashMap<String, QuestionMeta>, StoreError>;
}
