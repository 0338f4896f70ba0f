use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};

use crate::config::EngineConfig;
use crate::engine::buckets::BucketGenerator;
use crate::engine::cognitive::ErrorClassifier;
use crate::engine::readiness::ReadinessCalculator;
use crate::engine::schedule::ScheduleBuilder;
use crate::engine::types::{
    Attempt, CognitiveProfile, QuestionMeta, ReadinessScore, RevisionBucket, RevisionSchedule,
    WellnessSnapshot,
};
use crate::engine::wellness::WellnessDetector;
use crate::error::EngineError;
use crate::store::{AttemptStore, StoreError};

const MIN_WINDOW_DAYS: u32 = 1;
const MAX_WINDOW_DAYS: u32 = 365;

/// Entry point for the dashboard layer. Every method loads its own read-only
/// attempt window, computes and returns a fresh value object; nothing is
/// cached or written back, so calls for different artifacts (or different
/// users) are safe to run concurrently. The schedule builder is the one
/// exception to independence: callers chain it behind `revision_buckets`.
pub struct AnalyticsEngine<S: AttemptStore> {
    store: Arc<S>,
    config: EngineConfig,
    readiness: ReadinessCalculator,
    classifier: ErrorClassifier,
    buckets: BucketGenerator,
    schedule: ScheduleBuilder,
    wellness: WellnessDetector,
}

impl<S: AttemptStore> AnalyticsEngine<S> {
    pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
        let readiness =
            ReadinessCalculator::new(config.readiness.clone(), config.time.clone());
        let classifier = ErrorClassifier::new(
            config.classifier.clone(),
            config.profile.clone(),
            config.time.clone(),
        );
        let buckets = BucketGenerator::new(config.buckets.clone(), config.time.clone());
        let schedule = ScheduleBuilder::new(config.schedule.clone());
        let wellness = WellnessDetector::new(config.wellness.clone());
        Self {
            store,
            config,
            readiness,
            classifier,
            buckets,
            schedule,
            wellness,
        }
    }

    pub fn from_env(store: Arc<S>) -> Self {
        Self::new(store, EngineConfig::from_env())
    }

    /// Readiness over the configured default lookback window.
    pub async fn readiness_score_default(
        &self,
        user_id: &str,
    ) -> Result<ReadinessScore, EngineError> {
        self.readiness_score(user_id, self.config.readiness.default_window_days)
            .await
    }

    pub async fn readiness_score(
        &self,
        user_id: &str,
        window_days: u32,
    ) -> Result<ReadinessScore, EngineError> {
        validate_window_days(window_days)?;
        let now = Utc::now();
        let (attempts, meta) = self.load_window(user_id, window_days, now).await?;
        self.readiness.compute(&attempts, &meta, now)
    }

    pub async fn cognitive_profile(
        &self,
        user_id: &str,
        window_days: u32,
    ) -> Result<CognitiveProfile, EngineError> {
        validate_window_days(window_days)?;
        let now = Utc::now();
        let (attempts, meta) = self.load_window(user_id, window_days, now).await?;
        self.classifier.build_profile(&attempts, &meta, now)
    }

    pub async fn revision_buckets(
        &self,
        user_id: &str,
    ) -> Result<Vec<RevisionBucket>, EngineError> {
        let now = Utc::now();
        let (attempts, meta) = self
            .load_window(user_id, self.config.profile.window_days, now)
            .await?;
        let analyses = self.classifier.classify_window(&attempts, &meta);
        self.buckets.generate(&attempts, &meta, &analyses)
    }

    /// Pure layout step over buckets the caller already holds; no store
    /// access. `days_until_exam` is clamped to the configured horizon.
    pub fn revision_schedule(
        &self,
        buckets: &[RevisionBucket],
        days_until_exam: u32,
        daily_budget_minutes: u32,
    ) -> Result<RevisionSchedule, EngineError> {
        self.schedule.build(buckets, days_until_exam, daily_budget_minutes)
    }

    pub async fn wellness_snapshot(
        &self,
        user_id: &str,
    ) -> Result<WellnessSnapshot, EngineError> {
        let now = Utc::now();
        let lookback = self.config.wellness.recent_days + self.config.wellness.baseline_days;
        let attempts = self
            .fetch_attempts(user_id, now - Duration::days(lookback))
            .await?;
        Ok(self.wellness.detect(&attempts, now))
    }

    async fn load_window(
        &self,
        user_id: &str,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Attempt>, HashMap<String, QuestionMeta>), EngineError> {
        let since = now - Duration::days(window_days as i64);
        let attempts = self.fetch_attempts(user_id, since).await?;

        let mut question_ids: Vec<String> =
            attempts.iter().map(|a| a.question_id.clone()).collect();
        question_ids.sort();
        question_ids.dedup();

        let meta = if question_ids.is_empty() {
            HashMap::new()
        } else {
            self.with_timeout(self.store.question_meta(&question_ids)).await?
        };

        tracing::debug!(
            user_id,
            window_days,
            attempts = attempts.len(),
            questions = question_ids.len(),
            "loaded attempt window"
        );
        Ok((attempts, meta))
    }

    async fn fetch_attempts(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Attempt>, EngineError> {
        self.with_timeout(self.store.attempts_since(user_id, since)).await
    }

    /// Bounds every store read so a slow history fetch for one artifact
    /// cannot stall unrelated artifact requests.
    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, EngineError> {
        let limit = StdDuration::from_millis(self.config.store_timeout_ms);
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result.map_err(EngineError::from),
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.store_timeout_ms,
                    "attempt store read timed out"
                );
                Err(EngineError::Upstream(StoreError::Timeout(
                    self.config.store_timeout_ms,
                )))
            }
        }
    }
}

fn validate_window_days(window_days: u32) -> Result<(), EngineError> {
    if !(MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&window_days) {
        return Err(EngineError::InvalidParameter(format!(
            "windowDays must be within {MIN_WINDOW_DAYS}..={MAX_WINDOW_DAYS}, got {window_days}"
        )));
    }
    Ok(())
}
