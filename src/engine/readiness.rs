use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::{ReadinessParams, TimeModel};
use crate::engine::types::{Attempt, QuestionMeta, ReadinessScore, ScoreComponents};
use crate::error::EngineError;

/// Fixed component weights; they sum to 1.0 by construction.
pub const WEIGHT_ACCURACY: f64 = 0.40;
pub const WEIGHT_STABILITY: f64 = 0.20;
pub const WEIGHT_COVERAGE: f64 = 0.20;
pub const WEIGHT_TIME: f64 = 0.10;
pub const WEIGHT_CONSISTENCY: f64 = 0.10;

/// Bounded heuristic reward for attempting harder material. This is not a
/// calibrated ability estimate; the clamp keeps the adjustment mild in both
/// directions regardless of the input, including out-of-range difficulty.
pub fn difficulty_modifier(avg_difficulty: f64) -> f64 {
    ((avg_difficulty - 0.5) * 0.5).clamp(-0.10, 0.15)
}

/// Combines accuracy, stability, coverage, time and consistency sub-scores
/// into one 0..=100 readiness score. Stateless; always derived fresh from
/// the attempt window.
pub struct ReadinessCalculator {
    params: ReadinessParams,
    time: TimeModel,
}

impl ReadinessCalculator {
    pub fn new(params: ReadinessParams, time: TimeModel) -> Self {
        Self { params, time }
    }

    pub fn compute(
        &self,
        attempts: &[Attempt],
        meta: &HashMap<String, QuestionMeta>,
        now: DateTime<Utc>,
    ) -> Result<ReadinessScore, EngineError> {
        if attempts.is_empty() {
            return Err(EngineError::InsufficientData(
                "no attempts in the readiness window".to_string(),
            ));
        }

        let accuracy = self.accuracy_score(attempts, meta);
        let (stability, low_confidence) = self.stability_score(attempts);
        let coverage = self.coverage_score(attempts);
        let time = self.time_score(attempts, meta);
        let consistency = self.consistency_score(attempts);

        let overall = WEIGHT_ACCURACY * accuracy
            + WEIGHT_STABILITY * stability
            + WEIGHT_COVERAGE * coverage
            + WEIGHT_TIME * time
            + WEIGHT_CONSISTENCY * consistency;

        Ok(ReadinessScore {
            overall: overall.clamp(0.0, 100.0),
            components: ScoreComponents {
                accuracy,
                stability,
                coverage,
                time,
                consistency,
            },
            attempt_count: attempts.len(),
            low_confidence,
            last_updated: now,
        })
    }

    /// Raw percentage correct, then the bounded difficulty adjustment.
    fn accuracy_score(&self, attempts: &[Attempt], meta: &HashMap<String, QuestionMeta>) -> f64 {
        let correct = attempts.iter().filter(|a| a.is_correct).count();
        let raw = correct as f64 / attempts.len() as f64 * 100.0;

        let avg_difficulty = attempts
            .iter()
            .map(|a| effective_difficulty(a, meta))
            .sum::<f64>()
            / attempts.len() as f64;

        let modifier = difficulty_modifier(avg_difficulty);
        (raw * (1.0 + modifier)).clamp(0.0, 100.0)
    }

    /// Inverse of per-day accuracy variance, rescaled to 0..=100. A single
    /// day of data has no variance evidence: 100 by convention, flagged as
    /// low confidence.
    fn stability_score(&self, attempts: &[Attempt]) -> (f64, bool) {
        let mut by_day: HashMap<NaiveDate, (usize, usize)> = HashMap::new();
        for attempt in attempts {
            let entry = by_day.entry(attempt.timestamp.date_naive()).or_insert((0, 0));
            entry.0 += 1;
            if attempt.is_correct {
                entry.1 += 1;
            }
        }

        if by_day.len() < 2 {
            return (100.0, true);
        }

        let daily: Vec<f64> = by_day
            .values()
            .map(|(total, correct)| *correct as f64 / *total as f64)
            .collect();
        let variance = variance(&daily);
        (100.0 * (1.0 - (variance * 4.0).min(1.0)), false)
    }

    /// Share of tracked categories that have met the minimum-attempt
    /// threshold. Tracked means seen in this window; categories below the
    /// threshold are uncovered.
    fn coverage_score(&self, attempts: &[Attempt]) -> f64 {
        let mut per_category: HashMap<&str, usize> = HashMap::new();
        for attempt in attempts {
            *per_category.entry(attempt.category.as_str()).or_insert(0) += 1;
        }
        if per_category.is_empty() {
            return 0.0;
        }
        let covered = per_category
            .values()
            .filter(|count| **count >= self.params.coverage_min_attempts)
            .count();
        covered as f64 / per_category.len() as f64 * 100.0
    }

    /// 100 at or under the per-difficulty target, decaying linearly to 0 at
    /// twice the target.
    fn time_score(&self, attempts: &[Attempt], meta: &HashMap<String, QuestionMeta>) -> f64 {
        let sum: f64 = attempts
            .iter()
            .map(|attempt| {
                let target = self.time.target_ms(effective_difficulty(attempt, meta));
                let taken = attempt.time_taken_ms.max(0) as f64;
                if taken <= target {
                    100.0
                } else {
                    (100.0 * (2.0 - taken / target)).max(0.0)
                }
            })
            .sum();
        sum / attempts.len() as f64
    }

    /// Penalizes erratic correct/incorrect alternation on repeated exposures
    /// of the same question, falling back to category-level grouping when no
    /// question repeats. No repeats at all means no evidence of
    /// inconsistency: 100.
    fn consistency_score(&self, attempts: &[Attempt]) -> f64 {
        let by_question = outcome_series(attempts, |a| a.question_id.as_str());
        let rates = alternation_rates(&by_question);
        if !rates.is_empty() {
            let avg = rates.iter().sum::<f64>() / rates.len() as f64;
            return 100.0 * (1.0 - avg);
        }

        let by_category = outcome_series(attempts, |a| a.category.as_str());
        let rates = alternation_rates(&by_category);
        if rates.is_empty() {
            return 100.0;
        }
        let avg = rates.iter().sum::<f64>() / rates.len() as f64;
        100.0 * (1.0 - avg)
    }
}

/// Prefer the reference-data difficulty when it exists, otherwise the tag
/// carried on the attempt itself.
pub(crate) fn effective_difficulty(attempt: &Attempt, meta: &HashMap<String, QuestionMeta>) -> f64 {
    meta.get(&attempt.question_id)
        .map(|m| m.difficulty)
        .unwrap_or(attempt.difficulty)
}

fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}

fn outcome_series<'a, F>(attempts: &'a [Attempt], key: F) -> HashMap<&'a str, Vec<bool>>
where
    F: Fn(&'a Attempt) -> &'a str,
{
    // Attempts arrive ordered by timestamp, so insertion order per key is
    // exposure order.
    let mut series: HashMap<&str, Vec<bool>> = HashMap::new();
    for attempt in attempts {
        series.entry(key(attempt)).or_default().push(attempt.is_correct);
    }
    series
}

fn alternation_rates(series: &HashMap<&str, Vec<bool>>) -> Vec<f64> {
    series
        .values()
        .filter(|outcomes| outcomes.len() >= 2)
        .map(|outcomes| {
            let flips = outcomes.windows(2).filter(|pair| pair[0] != pair[1]).count();
            flips as f64 / (outcomes.len() - 1) as f64
        })
        .collect()
}
