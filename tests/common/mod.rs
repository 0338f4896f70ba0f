use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use prepdash_analytics::{Attempt, AttemptStore, QuestionMeta, StoreError};

/// In-memory stand-in for the attempt-tracking collaborator.
pub struct InMemoryStore {
    pub attempts: Vec<Attempt>,
    pub meta: HashMap<String, QuestionMeta>,
}

impl InMemoryStore {
    pub fn new(attempts: Vec<Attempt>, meta: HashMap<String, QuestionMeta>) -> Self {
        Self { attempts, meta }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), HashMap::new())
    }
}

#[async_trait]
impl AttemptStore for InMemoryStore {
    async fn attempts_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Attempt>, StoreError> {
        let mut attempts: Vec<Attempt> = self
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.timestamp >= since)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.timestamp);
        Ok(attempts)
    }

    async fn question_meta(
        &self,
        question_ids: &[String],
    ) -> Result<HashMap<String, QuestionMeta>, StoreError> {
        Ok(question_ids
            .iter()
            .filter_map(|id| self.meta.get(id).map(|m| (id.clone(), m.clone())))
            .collect())
    }
}

/// Always fails, to exercise the retryable upstream path.
pub struct BrokenStore;

#[async_trait]
impl AttemptStore for BrokenStore {
    async fn attempts_since(
        &self,
        _user_id: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<Attempt>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn question_meta(
        &self,
        _question_ids: &[String],
    ) -> Result<HashMap<String, QuestionMeta>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Never answers, to exercise the timeout path.
pub struct StalledStore;

#[async_trait]
impl AttemptStore for StalledStore {
    async fn attempts_since(
        &self,
        _user_id: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<Attempt>, StoreError> {
        std::future::pending().await
    }

    async fn question_meta(
        &self,
        _question_ids: &[String],
    ) -> Result<HashMap<String, QuestionMeta>, StoreError> {
        std::future::pending().await
    }
}

pub struct AttemptSpec {
    pub question_id: &'static str,
    pub category: &'static str,
    pub is_correct: bool,
    pub time_taken_ms: i64,
    pub confidence: Option<f64>,
    pub days_ago: i64,
}

impl Default for AttemptSpec {
    fn default() -> Self {
        Self {
            question_id: "q1",
            category: "Cardiology",
            is_correct: true,
            time_taken_ms: 50_000,
            confidence: None,
            days_ago: 1,
        }
    }
}

pub fn attempt(seq: usize, spec: AttemptSpec) -> Attempt {
    Attempt {
        id: format!("a{seq}"),
        user_id: "u1".to_string(),
        question_id: spec.question_id.to_string(),
        chosen_option: "A".to_string(),
        is_correct: spec.is_correct,
        time_taken_ms: spec.time_taken_ms,
        confidence: spec.confidence,
        category: spec.category.to_string(),
        difficulty: 0.5,
        session_position: None,
        timestamp: Utc::now() - Duration::days(spec.days_ago) - Duration::minutes(seq as i64),
    }
}

pub fn meta(question_id: &str, category: &str, high_yield: bool) -> QuestionMeta {
    QuestionMeta {
        question_id: question_id.to_string(),
        category: category.to_string(),
        difficulty: 0.5,
        high_yield,
        multi_step: false,
        data_interpretation: false,
        near_miss_options: Vec::new(),
    }
}
