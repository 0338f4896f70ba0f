use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded answer event. Owned by the storage collaborator and immutable
/// once created; the engine only ever reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: String,
    pub user_id: String,
    pub question_id: String,
    pub chosen_option: String,
    pub is_correct: bool,
    pub time_taken_ms: i64,
    /// Self-reported confidence at answer time, 0.0..=1.0.
    pub confidence: Option<f64>,
    pub category: String,
    /// Normalized difficulty, 0 = easy .. 1 = hard.
    pub difficulty: f64,
    /// How far through a timed session this attempt occurred, 0.0..=1.0.
    /// Absent for untimed practice.
    pub session_position: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Read-only question reference data, the subset the engine needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionMeta {
    pub question_id: String,
    pub category: String,
    pub difficulty: f64,
    /// Outsized importance for exam performance.
    pub high_yield: bool,
    /// Requires multi-step inference.
    pub multi_step: bool,
    /// Chart, lab or statistical interpretation item.
    pub data_interpretation: bool,
    /// Options designated as plausible-but-wrong near misses.
    pub near_miss_options: Vec<String>,
}

/// The five readiness sub-scores, each 0..=100 before weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponents {
    pub accuracy: f64,
    pub stability: f64,
    pub coverage: f64,
    pub time: f64,
    pub consistency: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessScore {
    /// Weighted overall score, 0..=100.
    pub overall: f64,
    pub components: ScoreComponents,
    pub attempt_count: usize,
    /// Set when stability fell back to the single-data-point convention
    /// (100 by definition, but with no evidence behind it).
    pub low_confidence: bool,
    pub last_updated: DateTime<Utc>,
}

/// The four-way cognitive error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TimePressure,
    ReasoningError,
    DataInterpretation,
    KnowledgeGap,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 4] = [
        ErrorKind::TimePressure,
        ErrorKind::ReasoningError,
        ErrorKind::DataInterpretation,
        ErrorKind::KnowledgeGap,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::TimePressure => "time_pressure",
            ErrorKind::ReasoningError => "reasoning_error",
            ErrorKind::DataInterpretation => "data_interpretation",
            ErrorKind::KnowledgeGap => "knowledge_gap",
        }
    }
}

/// Classification of one incorrect attempt. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAnalysis {
    pub id: String,
    pub attempt_id: String,
    pub question_id: String,
    pub category: String,
    pub kind: ErrorKind,
    /// Confidence in the classification itself, not the user's own rating.
    pub confidence: f64,
    pub rationale: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitivePattern {
    pub kind: ErrorKind,
    pub frequency: usize,
    pub impact: ImpactTier,
    /// Share of this kind's errors that hit high-yield categories.
    pub high_yield_share: f64,
}

/// Fully regenerated on every request from the current error-history window;
/// never partially patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CognitiveProfile {
    pub patterns: Vec<CognitivePattern>,
    pub stretch_areas: Vec<String>,
    pub strength_areas: Vec<String>,
    pub recommendations: Vec<String>,
    pub analyzed_errors: usize,
    pub last_updated_at: DateTime<Utc>,
}

/// The four revision bucket kinds, in fixed assignment order. A question can
/// belong to at most one bucket per generation pass; earlier kinds win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketKind {
    IncorrectConfident,
    HighYieldLowAccuracy,
    SlowCorrect,
    AlmostCorrect,
}

impl BucketKind {
    /// Assignment order: overlapping membership resolves toward the first
    /// matching kind.
    pub const ASSIGNMENT_ORDER: [BucketKind; 4] = [
        BucketKind::IncorrectConfident,
        BucketKind::HighYieldLowAccuracy,
        BucketKind::SlowCorrect,
        BucketKind::AlmostCorrect,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            BucketKind::IncorrectConfident => "incorrect_confident",
            BucketKind::HighYieldLowAccuracy => "high_yield_low_accuracy",
            BucketKind::SlowCorrect => "slow_correct",
            BucketKind::AlmostCorrect => "almost_correct",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketEntry {
    pub question_id: String,
    pub category: String,
    /// Rolling accuracy for this question within the window, 0..=1.
    pub accuracy: f64,
    pub avg_time_ms: f64,
    pub high_yield: bool,
}

/// Ephemeral: regenerated on each request, never stored as state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionBucket {
    pub kind: BucketKind,
    pub priority: PriorityTier,
    pub entries: Vec<BucketEntry>,
    pub suggested_minutes: u32,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledBlock {
    pub kind: BucketKind,
    pub priority: PriorityTier,
    pub question_count: usize,
    pub estimated_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    /// 1-based day index up to the schedule horizon.
    pub day: u32,
    pub blocks: Vec<ScheduledBlock>,
    pub total_questions: usize,
    pub estimated_minutes: f64,
}

/// A full day-by-day layout of the current buckets. Derived fresh from
/// buckets plus the days-until-exam parameter; callers re-derive it whenever
/// needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionSchedule {
    pub days: Vec<ScheduleDay>,
    pub horizon_days: u32,
    /// The horizon was too short for the bucket volume, so daily budgets
    /// were ignored rather than dropping buckets. The UI should warn.
    pub compressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellnessSnapshot {
    pub risk: RiskLevel,
    pub accuracy_declining: bool,
    pub time_declining: bool,
    pub frequency_declining: bool,
    pub intervention: Option<String>,
    pub recommendations: Vec<String>,
    /// Either comparison window had too few attempts, so `risk` is a
    /// default, not a reading.
    pub insufficient_history: bool,
}

impl WellnessSnapshot {
    pub fn indicator_count(&self) -> usize {
        [
            self.accuracy_declining,
            self.time_declining,
            self.frequency_declining,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_camel_case_fields_and_snake_case_tags() {
        let entry = BucketEntry {
            question_id: "q1".to_string(),
            category: "Cardiology".to_string(),
            accuracy: 0.5,
            avg_time_ms: 60_000.0,
            high_yield: true,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("questionId").is_some());
        assert!(json.get("avgTimeMs").is_some());

        assert_eq!(
            serde_json::to_value(BucketKind::HighYieldLowAccuracy).unwrap(),
            serde_json::json!("high_yield_low_accuracy")
        );
        assert_eq!(
            serde_json::to_value(ErrorKind::TimePressure).unwrap(),
            serde_json::json!("time_pressure")
        );
        assert_eq!(
            serde_json::to_value(RiskLevel::Medium).unwrap(),
            serde_json::json!("medium")
        );
    }

    #[test]
    fn tier_ordering_supports_priority_sorts() {
        assert!(PriorityTier::High > PriorityTier::Medium);
        assert!(PriorityTier::Medium > PriorityTier::Low);
        assert!(ImpactTier::High > ImpactTier::Low);
        assert!(RiskLevel::High > RiskLevel::Medium);
    }
}
