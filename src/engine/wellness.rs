use chrono::{DateTime, Duration, Utc};

use crate::config::WellnessParams;
use crate::engine::types::{Attempt, RiskLevel, WellnessSnapshot};

/// Compares a recent attempt window against the baseline window just before
/// it and flags directional declines in accuracy, speed and practice volume.
/// Independent of the other engine components; reads only attempt history.
pub struct WellnessDetector {
    params: WellnessParams,
}

struct WindowStats {
    accuracy: f64,
    avg_time_ms: f64,
    attempts_per_day: f64,
}

impl WellnessDetector {
    pub fn new(params: WellnessParams) -> Self {
        Self { params }
    }

    pub fn detect(&self, attempts: &[Attempt], now: DateTime<Utc>) -> WellnessSnapshot {
        let recent_start = now - Duration::days(self.params.recent_days);
        let baseline_start = recent_start - Duration::days(self.params.baseline_days);

        let recent: Vec<&Attempt> =
            attempts.iter().filter(|a| a.timestamp >= recent_start && a.timestamp <= now).collect();
        let baseline: Vec<&Attempt> = attempts
            .iter()
            .filter(|a| a.timestamp >= baseline_start && a.timestamp < recent_start)
            .collect();

        if recent.len() < self.params.min_window_attempts
            || baseline.len() < self.params.min_window_attempts
        {
            // A new user is not "stable"; there is simply nothing to compare.
            return WellnessSnapshot {
                risk: RiskLevel::Low,
                accuracy_declining: false,
                time_declining: false,
                frequency_declining: false,
                intervention: None,
                recommendations: vec![
                    "Keep practicing; trend detection needs about two weeks of history."
                        .to_string(),
                ],
                insufficient_history: true,
            };
        }

        let recent_stats = window_stats(&recent, self.params.recent_days);
        let baseline_stats = window_stats(&baseline, self.params.baseline_days);

        let accuracy_declining = (baseline_stats.accuracy - recent_stats.accuracy) * 100.0
            > self.params.accuracy_drop_pts;
        let time_declining = baseline_stats.avg_time_ms > 0.0
            && recent_stats.avg_time_ms
                > baseline_stats.avg_time_ms * (1.0 + self.params.time_rise_ratio);
        let frequency_declining = recent_stats.attempts_per_day
            < baseline_stats.attempts_per_day * (1.0 - self.params.frequency_drop_ratio);

        let fired = [accuracy_declining, time_declining, frequency_declining]
            .iter()
            .filter(|f| **f)
            .count();
        let risk = match fired {
            0 => RiskLevel::Low,
            1 => RiskLevel::Medium,
            _ => RiskLevel::High,
        };

        if risk != RiskLevel::Low {
            tracing::debug!(
                ?risk,
                accuracy_declining,
                time_declining,
                frequency_declining,
                "wellness decline indicators fired"
            );
        }

        WellnessSnapshot {
            risk,
            accuracy_declining,
            time_declining,
            frequency_declining,
            intervention: self.intervention(
                risk,
                accuracy_declining,
                time_declining,
                frequency_declining,
            ),
            recommendations: self.recommendations(
                accuracy_declining,
                time_declining,
                frequency_declining,
            ),
            insufficient_history: false,
        }
    }

    /// Templated message keyed off the most severe fired dimension:
    /// accuracy, then frequency, then time.
    fn intervention(
        &self,
        risk: RiskLevel,
        accuracy: bool,
        time: bool,
        frequency: bool,
    ) -> Option<String> {
        if risk == RiskLevel::Low {
            return None;
        }
        let message = if accuracy {
            "Accuracy has dropped noticeably versus the previous week. Shorter, focused sessions with immediate review tend to recover it."
        } else if frequency {
            "Practice volume is falling. Even one short session a day protects momentum before the exam."
        } else if time {
            "Answers are taking noticeably longer than before. Consider a lighter day; slowing down across the board is an early fatigue sign."
        } else {
            return None;
        };
        Some(message.to_string())
    }

    fn recommendations(&self, accuracy: bool, time: bool, frequency: bool) -> Vec<String> {
        let mut recommendations = Vec::new();
        if accuracy {
            recommendations
                .push("Re-review misses from this week before adding new material.".to_string());
        }
        if frequency {
            recommendations
                .push("Set a minimal daily target, even 10 questions counts.".to_string());
        }
        if time {
            recommendations
                .push("Schedule a rest day; response times rise with accumulated fatigue.".to_string());
        }
        if recommendations.is_empty() {
            recommendations
                .push("No decline indicators this week. Keep the current routine.".to_string());
        }
        recommendations
    }
}

fn window_stats(attempts: &[&Attempt], window_days: i64) -> WindowStats {
    let total = attempts.len();
    let correct = attempts.iter().filter(|a| a.is_correct).count();
    let time_sum: i64 = attempts.iter().map(|a| a.time_taken_ms.max(0)).sum();
    WindowStats {
        accuracy: if total == 0 { 0.0 } else { correct as f64 / total as f64 },
        avg_time_ms: if total == 0 { 0.0 } else { time_sum as f64 / total as f64 },
        attempts_per_day: total as f64 / window_days.max(1) as f64,
    }
}
