use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::{ClassifierParams, ProfileParams, TimeModel};
use crate::engine::readiness::effective_difficulty;
use crate::engine::types::{
    Attempt, CognitivePattern, CognitiveProfile, ErrorAnalysis, ErrorKind, ImpactTier,
    QuestionMeta,
};
use crate::error::EngineError;

/// Labels incorrect attempts with a cognitive error kind and aggregates the
/// labels into a per-user profile. Classification is a fixed rule order,
/// first match wins, so repeated runs over the same window reproduce the
/// same labels.
pub struct ErrorClassifier {
    params: ClassifierParams,
    profile_params: ProfileParams,
    time: TimeModel,
}

struct CategoryStats {
    attempts: usize,
    correct: usize,
    high_yield: bool,
}

impl CategoryStats {
    fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempts as f64
        }
    }
}

impl ErrorClassifier {
    pub fn new(params: ClassifierParams, profile_params: ProfileParams, time: TimeModel) -> Self {
        Self {
            params,
            profile_params,
            time,
        }
    }

    /// Classify one incorrect attempt. `category_accuracy` is the user's
    /// rolling accuracy in the attempt's category, when known.
    pub fn classify(
        &self,
        attempt: &Attempt,
        meta: Option<&QuestionMeta>,
        category_accuracy: Option<f64>,
    ) -> ErrorAnalysis {
        let difficulty = meta.map(|m| m.difficulty).unwrap_or(attempt.difficulty);
        let target = self.time.target_ms(difficulty);
        let time_ratio = attempt.time_taken_ms.max(0) as f64 / target;
        let session_position = attempt.session_position.unwrap_or(0.0);

        // Rule 1: rushed answer late in a timed session.
        if time_ratio < self.params.time_pressure_ratio
            && session_position >= self.params.session_tail_start
        {
            let label_confidence = if time_ratio < self.params.time_pressure_ratio / 2.0 {
                0.9
            } else {
                0.75
            };
            return self.analysis(
                attempt,
                ErrorKind::TimePressure,
                label_confidence,
                format!(
                    "answered in {:.0}% of the target time during the final stretch of a timed session",
                    time_ratio * 100.0
                ),
            );
        }

        // Rule 2: confidently wrong on a multi-step item.
        let user_confidence = attempt.confidence.unwrap_or(0.0);
        if user_confidence >= self.params.high_confidence
            && meta.map(|m| m.multi_step).unwrap_or(false)
        {
            return self.analysis(
                attempt,
                ErrorKind::ReasoningError,
                0.8,
                format!(
                    "high self-reported confidence ({user_confidence:.2}) on a multi-step inference question"
                ),
            );
        }

        // Rule 3: chart/lab/statistical interpretation item.
        if meta.map(|m| m.data_interpretation).unwrap_or(false) {
            return self.analysis(
                attempt,
                ErrorKind::DataInterpretation,
                0.7,
                "missed a chart/lab/statistical interpretation item".to_string(),
            );
        }

        // Rule 4: default fallback, stronger when the category history is
        // already weak.
        match category_accuracy {
            Some(accuracy) if accuracy < self.params.low_accuracy_floor => self.analysis(
                attempt,
                ErrorKind::KnowledgeGap,
                0.75,
                format!(
                    "category accuracy {:.0}% is below the {:.0}% floor",
                    accuracy * 100.0,
                    self.params.low_accuracy_floor * 100.0
                ),
            ),
            _ => self.analysis(
                attempt,
                ErrorKind::KnowledgeGap,
                0.6,
                "no time-pressure, reasoning or interpretation signal; defaulting to knowledge gap"
                    .to_string(),
            ),
        }
    }

    /// Classify every incorrect attempt in the window, in timestamp order.
    pub fn classify_window(
        &self,
        attempts: &[Attempt],
        meta: &HashMap<String, QuestionMeta>,
    ) -> Vec<ErrorAnalysis> {
        let categories = category_stats(attempts, meta);
        attempts
            .iter()
            .filter(|a| !a.is_correct)
            .map(|attempt| {
                let accuracy = categories.get(attempt.category.as_str()).map(|s| s.accuracy());
                self.classify(attempt, meta.get(&attempt.question_id), accuracy)
            })
            .collect()
    }

    /// Regenerate the full cognitive profile from the current window.
    pub fn build_profile(
        &self,
        attempts: &[Attempt],
        meta: &HashMap<String, QuestionMeta>,
        now: DateTime<Utc>,
    ) -> Result<CognitiveProfile, EngineError> {
        if attempts.is_empty() {
            return Err(EngineError::InsufficientData(
                "no attempts in the profile window".to_string(),
            ));
        }

        let categories = category_stats(attempts, meta);
        let analyses = self.classify_window(attempts, meta);
        let patterns = self.patterns(&analyses, &categories);

        let stretch_areas = self.stretch_areas(&categories);
        let strength_areas = self.strength_areas(&categories);
        let recommendations =
            self.recommendations(patterns.first().map(|p| p.kind), stretch_areas.first());

        Ok(CognitiveProfile {
            patterns,
            stretch_areas,
            strength_areas,
            recommendations,
            analyzed_errors: analyses.len(),
            last_updated_at: now,
        })
    }

    fn analysis(
        &self,
        attempt: &Attempt,
        kind: ErrorKind,
        confidence: f64,
        rationale: String,
    ) -> ErrorAnalysis {
        ErrorAnalysis {
            id: Uuid::new_v4().to_string(),
            attempt_id: attempt.id.clone(),
            question_id: attempt.question_id.clone(),
            category: attempt.category.clone(),
            kind,
            confidence,
            rationale,
            timestamp: attempt.timestamp,
        }
    }

    /// Frequency per error kind, with impact tiers relative to the user's
    /// own distribution. High when the kind dominates (top tercile of the
    /// max) or disproportionately hits high-yield categories.
    fn patterns(
        &self,
        analyses: &[ErrorAnalysis],
        categories: &HashMap<&str, CategoryStats>,
    ) -> Vec<CognitivePattern> {
        let mut frequency: HashMap<ErrorKind, usize> = HashMap::new();
        let mut high_yield_hits: HashMap<ErrorKind, usize> = HashMap::new();
        for analysis in analyses {
            *frequency.entry(analysis.kind).or_insert(0) += 1;
            let high_yield = categories
                .get(analysis.category.as_str())
                .map(|s| s.high_yield)
                .unwrap_or(false);
            if high_yield {
                *high_yield_hits.entry(analysis.kind).or_insert(0) += 1;
            }
        }

        let max_frequency = frequency.values().copied().max().unwrap_or(0);
        let mut patterns: Vec<CognitivePattern> = ErrorKind::ALL
            .iter()
            .filter_map(|kind| {
                let freq = *frequency.get(kind)?;
                let high_yield_share =
                    *high_yield_hits.get(kind).unwrap_or(&0) as f64 / freq as f64;
                let relative = freq as f64 / max_frequency as f64;
                let impact = if relative >= 2.0 / 3.0 || high_yield_share >= 0.5 {
                    ImpactTier::High
                } else if relative >= 1.0 / 3.0 {
                    ImpactTier::Medium
                } else {
                    ImpactTier::Low
                };
                Some(CognitivePattern {
                    kind: *kind,
                    frequency: freq,
                    impact,
                    high_yield_share,
                })
            })
            .collect();

        // Sort by frequency descending; the fixed ALL order above breaks ties.
        patterns.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        patterns
    }

    /// Categories below the accuracy floor with a minimal sample, high-yield
    /// content first, then weakest first.
    fn stretch_areas(&self, categories: &HashMap<&str, CategoryStats>) -> Vec<String> {
        let mut areas: Vec<(&str, &CategoryStats)> = categories
            .iter()
            .filter(|(_, stats)| {
                stats.attempts >= self.profile_params.stretch_min_attempts
                    && stats.accuracy() < self.profile_params.stretch_floor
            })
            .map(|(name, stats)| (*name, stats))
            .collect();
        areas.sort_by(|a, b| {
            b.1.high_yield
                .cmp(&a.1.high_yield)
                .then(a.1.accuracy().partial_cmp(&b.1.accuracy()).unwrap_or(std::cmp::Ordering::Equal))
                .then(a.0.cmp(b.0))
        });
        areas.into_iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Categories consistently at or above the ceiling with enough sample.
    fn strength_areas(&self, categories: &HashMap<&str, CategoryStats>) -> Vec<String> {
        let mut areas: Vec<(&str, f64)> = categories
            .iter()
            .filter(|(_, stats)| {
                stats.attempts >= self.profile_params.min_category_attempts
                    && stats.accuracy() >= self.profile_params.strength_ceiling
            })
            .map(|(name, stats)| (*name, stats.accuracy()))
            .collect();
        areas.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(b.0))
        });
        areas.into_iter().map(|(name, _)| name.to_string()).collect()
    }

    /// Deterministic template table keyed off the dominant error kind and the
    /// top stretch area. No free-form generation, so output stays testable.
    fn recommendations(
        &self,
        dominant: Option<ErrorKind>,
        top_stretch: Option<&String>,
    ) -> Vec<String> {
        let mut recommendations = Vec::new();
        match dominant {
            Some(ErrorKind::TimePressure) => recommendations.push(
                "Practice timed blocks with a per-question timer to build pacing before adding volume."
                    .to_string(),
            ),
            Some(ErrorKind::ReasoningError) => recommendations.push(
                "Slow down on multi-step items: write the intermediate conclusion before committing to an answer."
                    .to_string(),
            ),
            Some(ErrorKind::DataInterpretation) => recommendations.push(
                "Drill chart and lab interpretation sets in untimed mode to rebuild the reading routine."
                    .to_string(),
            ),
            Some(ErrorKind::KnowledgeGap) => recommendations.push(
                "Schedule focused content review before returning to mixed practice.".to_string(),
            ),
            None => recommendations.push(
                "No recent error patterns detected; keep the current practice mix.".to_string(),
            ),
        }
        if let Some(area) = top_stretch {
            recommendations.push(format!(
                "Prioritize {area}: recent accuracy there is below your revision floor."
            ));
        }
        recommendations
    }
}

fn category_stats<'a>(
    attempts: &'a [Attempt],
    meta: &HashMap<String, QuestionMeta>,
) -> HashMap<&'a str, CategoryStats> {
    let mut stats: HashMap<&str, CategoryStats> = HashMap::new();
    for attempt in attempts {
        let entry = stats.entry(attempt.category.as_str()).or_insert(CategoryStats {
            attempts: 0,
            correct: 0,
            high_yield: false,
        });
        entry.attempts += 1;
        if attempt.is_correct {
            entry.correct += 1;
        }
        if meta
            .get(&attempt.question_id)
            .map(|m| m.high_yield)
            .unwrap_or(false)
        {
            entry.high_yield = true;
        }
    }
    stats
}
