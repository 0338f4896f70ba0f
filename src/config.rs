use serde::{Deserialize, Serialize};

/// Per-difficulty target response time. The same model feeds the readiness
/// time sub-score, the time-pressure classification rule, slow-correct bucket
/// membership and the mastery check, so the components stay consistent with
/// each other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeModel {
    pub target_base_ms: f64,
    pub target_slope_ms: f64,
}

impl Default for TimeModel {
    fn default() -> Self {
        Self {
            target_base_ms: 45_000.0,
            target_slope_ms: 45_000.0,
        }
    }
}

impl TimeModel {
    /// Target answer time in milliseconds for a normalized difficulty (0..1).
    /// Out-of-range difficulty values are clamped.
    pub fn target_ms(&self, difficulty: f64) -> f64 {
        self.target_base_ms + self.target_slope_ms * difficulty.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessParams {
    pub default_window_days: u32,
    /// Minimum attempts before a category counts as covered.
    pub coverage_min_attempts: usize,
}

impl Default for ReadinessParams {
    fn default() -> Self {
        Self {
            default_window_days: 30,
            coverage_min_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// Self-reported confidence at or above this is "high".
    pub high_confidence: f64,
    /// Fraction of target time below which an answer counts as rushed.
    pub time_pressure_ratio: f64,
    /// Session position (0..1) at or past which an attempt is in the final
    /// stretch of a timed session.
    pub session_tail_start: f64,
    /// Category accuracy below this counts as a documented weak history.
    pub low_accuracy_floor: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            high_confidence: 0.75,
            time_pressure_ratio: 0.35,
            session_tail_start: 0.75,
            low_accuracy_floor: 0.60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileParams {
    pub window_days: u32,
    pub stretch_floor: f64,
    pub strength_ceiling: f64,
    /// Minimum category sample before it can be a strength area.
    pub min_category_attempts: usize,
    /// Minimum category sample before it can be a stretch area.
    pub stretch_min_attempts: usize,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            window_days: 30,
            stretch_floor: 0.60,
            strength_ceiling: 0.85,
            min_category_attempts: 5,
            stretch_min_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketParams {
    /// Correct answers slower than this multiple of target time lack fluency.
    pub slow_multiple: f64,
    /// Trailing attempts that must all be correct for mastery removal.
    pub trailing_k: usize,
    /// Self-reported confidence threshold for the incorrect-confident bucket.
    pub high_confidence: f64,
    /// Rolling category accuracy floor for the high-yield bucket.
    pub accuracy_floor: f64,
    pub high_yield_weight: f64,
    /// Weighted-size thresholds for priority tiers.
    pub priority_high: f64,
    pub priority_medium: f64,
    /// Session length estimate uses this multiple of historical answer time.
    pub review_factor: f64,
    pub min_session_minutes: u32,
    pub max_session_minutes: u32,
}

impl Default for BucketParams {
    fn default() -> Self {
        Self {
            slow_multiple: 1.5,
            trailing_k: 3,
            high_confidence: 0.75,
            accuracy_floor: 0.60,
            high_yield_weight: 1.5,
            priority_high: 5.0,
            priority_medium: 2.5,
            review_factor: 2.0,
            min_session_minutes: 5,
            max_session_minutes: 45,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleParams {
    /// Hard cap on schedule length regardless of days until exam.
    pub max_horizon_days: u32,
    pub high_interval_days: u32,
    pub medium_interval_days: u32,
    pub low_interval_days: u32,
    /// Horizons shorter than this may enter compressed mode.
    pub compressed_horizon_days: u32,
}

impl Default for ScheduleParams {
    fn default() -> Self {
        Self {
            max_horizon_days: 90,
            high_interval_days: 2,
            medium_interval_days: 4,
            low_interval_days: 6,
            compressed_horizon_days: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WellnessParams {
    pub recent_days: i64,
    pub baseline_days: i64,
    /// Attempts each window needs before its comparison counts as evidence.
    pub min_window_attempts: usize,
    /// Accuracy drop beyond this many percentage points is a decline.
    pub accuracy_drop_pts: f64,
    /// Average time rising by more than this fraction is a decline.
    pub time_rise_ratio: f64,
    /// Attempts-per-day dropping by more than this fraction is a decline.
    pub frequency_drop_ratio: f64,
}

impl Default for WellnessParams {
    fn default() -> Self {
        Self {
            recent_days: 7,
            baseline_days: 7,
            min_window_attempts: 5,
            accuracy_drop_pts: 5.0,
            time_rise_ratio: 0.20,
            frequency_drop_ratio: 0.30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub time: TimeModel,
    pub readiness: ReadinessParams,
    pub classifier: ClassifierParams,
    pub profile: ProfileParams,
    pub buckets: BucketParams,
    pub schedule: ScheduleParams,
    pub wellness: WellnessParams,
    /// Upper bound on any single attempt-store read.
    pub store_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time: TimeModel::default(),
            readiness: ReadinessParams::default(),
            classifier: ClassifierParams::default(),
            profile: ProfileParams::default(),
            buckets: BucketParams::default(),
            schedule: ScheduleParams::default(),
            wellness: WellnessParams::default(),
            store_timeout_ms: 5_000,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PREPDASH_STORE_TIMEOUT_MS") {
            config.store_timeout_ms = val.parse().unwrap_or(config.store_timeout_ms);
        }
        if let Ok(val) = std::env::var("PREPDASH_READINESS_WINDOW_DAYS") {
            config.readiness.default_window_days =
                val.parse().unwrap_or(config.readiness.default_window_days);
        }
        if let Ok(val) = std::env::var("PREPDASH_STRETCH_FLOOR") {
            if let Ok(floor) = val.parse::<f64>() {
                let floor = floor.clamp(0.0, 1.0);
                config.profile.stretch_floor = floor;
                config.buckets.accuracy_floor = floor;
            }
        }
        if let Ok(val) = std::env::var("PREPDASH_MAX_SESSION_MINUTES") {
            config.buckets.max_session_minutes =
                val.parse().unwrap_or(config.buckets.max_session_minutes);
        }
        if let Ok(val) = std::env::var("PREPDASH_MASTERY_TRAILING_K") {
            if let Ok(k) = val.parse::<usize>() {
                if k > 0 {
                    config.buckets.trailing_k = k;
                }
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_time_clamps_difficulty() {
        let time = TimeModel::default();
        assert_eq!(time.target_ms(-1.0), time.target_ms(0.0));
        assert_eq!(time.target_ms(2.0), time.target_ms(1.0));
        assert!(time.target_ms(1.0) > time.target_ms(0.0));
    }

    #[test]
    fn defaults_are_consistent() {
        let config = EngineConfig::default();
        assert_eq!(config.profile.stretch_floor, config.buckets.accuracy_floor);
        assert_eq!(config.classifier.high_confidence, config.buckets.high_confidence);
    }
}
