use std::collections::{HashMap, HashSet};

use crate::config::{BucketParams, TimeModel};
use crate::engine::types::{
    Attempt, BucketEntry, BucketKind, ErrorAnalysis, ErrorKind, PriorityTier, QuestionMeta,
    RevisionBucket,
};
use crate::error::EngineError;

/// Groups weak questions into typed, prioritized revision buckets. Bucket
/// membership is a live recomputation over the window; nothing here is
/// persisted, so a mastered question simply stops matching on the next pass.
pub struct BucketGenerator {
    params: BucketParams,
    time: TimeModel,
}

struct QuestionHistory<'a> {
    category: &'a str,
    attempts: Vec<&'a Attempt>,
}

impl<'a> QuestionHistory<'a> {
    fn accuracy(&self) -> f64 {
        let correct = self.attempts.iter().filter(|a| a.is_correct).count();
        correct as f64 / self.attempts.len() as f64
    }

    fn avg_time_ms(&self) -> f64 {
        let total: i64 = self.attempts.iter().map(|a| a.time_taken_ms.max(0)).sum();
        total as f64 / self.attempts.len() as f64
    }

    fn latest(&self) -> &'a Attempt {
        self.attempts.last().expect("history is never empty")
    }

    fn latest_correct(&self) -> Option<&'a Attempt> {
        self.attempts.iter().rev().find(|a| a.is_correct).copied()
    }

    fn latest_incorrect(&self) -> Option<&'a Attempt> {
        self.attempts.iter().rev().find(|a| !a.is_correct).copied()
    }
}

impl BucketGenerator {
    pub fn new(params: BucketParams, time: TimeModel) -> Self {
        Self { params, time }
    }

    /// One generation pass. `analyses` are the error labels for the same
    /// window, produced by the classifier and chained in by the caller.
    pub fn generate(
        &self,
        attempts: &[Attempt],
        meta: &HashMap<String, QuestionMeta>,
        analyses: &[ErrorAnalysis],
    ) -> Result<Vec<RevisionBucket>, EngineError> {
        if attempts.is_empty() {
            return Err(EngineError::InsufficientData(
                "no attempts; an empty bucket list here would read as fully mastered".to_string(),
            ));
        }

        let histories = question_histories(attempts);
        let category_accuracy = category_accuracy(attempts);
        let by_attempt_id: HashMap<&str, &Attempt> =
            attempts.iter().map(|a| (a.id.as_str(), a)).collect();

        // Questions with a confidently-missed reasoning/knowledge label.
        let confident_misses: HashSet<&str> = analyses
            .iter()
            .filter(|analysis| {
                matches!(analysis.kind, ErrorKind::ReasoningError | ErrorKind::KnowledgeGap)
            })
            .filter(|analysis| {
                by_attempt_id
                    .get(analysis.attempt_id.as_str())
                    .and_then(|a| a.confidence)
                    .map(|c| c >= self.params.high_confidence)
                    .unwrap_or(false)
            })
            .map(|analysis| analysis.question_id.as_str())
            .collect();

        let mut assigned: HashSet<&str> = HashSet::new();
        let mut buckets = Vec::new();

        for kind in BucketKind::ASSIGNMENT_ORDER {
            let mut members: Vec<(&str, &QuestionHistory)> = histories
                .iter()
                .filter(|(question_id, history)| {
                    !assigned.contains(*question_id)
                        && !self.mastered(history, meta)
                        && self.matches(
                            kind,
                            question_id,
                            history,
                            meta,
                            &category_accuracy,
                            &confident_misses,
                        )
                })
                .map(|(question_id, history)| (*question_id, history))
                .collect();
            members.sort_by(|a, b| {
                a.1.accuracy()
                    .partial_cmp(&b.1.accuracy())
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.0.cmp(b.0))
            });

            if members.is_empty() {
                continue;
            }
            for (question_id, _) in &members {
                assigned.insert(question_id);
            }
            buckets.push(self.build_bucket(kind, &members, meta));
        }

        // High priority first; the fixed assignment order breaks ties.
        buckets.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then_with(|| {
                let pos = |k: BucketKind| {
                    BucketKind::ASSIGNMENT_ORDER.iter().position(|x| *x == k).unwrap_or(4)
                };
                pos(a.kind).cmp(&pos(b.kind))
            })
        });
        Ok(buckets)
    }

    /// Trailing-k mastery: at least k attempts, the last k all correct, and
    /// the most recent inside the target time.
    fn mastered(&self, history: &QuestionHistory, meta: &HashMap<String, QuestionMeta>) -> bool {
        let k = self.params.trailing_k;
        if history.attempts.len() < k {
            return false;
        }
        let trailing = &history.attempts[history.attempts.len() - k..];
        if !trailing.iter().all(|a| a.is_correct) {
            return false;
        }
        let latest = history.latest();
        let target = self.time.target_ms(self.difficulty_of(latest, meta));
        (latest.time_taken_ms.max(0) as f64) <= target
    }

    fn matches(
        &self,
        kind: BucketKind,
        question_id: &str,
        history: &QuestionHistory,
        meta: &HashMap<String, QuestionMeta>,
        category_accuracy: &HashMap<&str, f64>,
        confident_misses: &HashSet<&str>,
    ) -> bool {
        match kind {
            BucketKind::IncorrectConfident => confident_misses.contains(question_id),
            BucketKind::HighYieldLowAccuracy => {
                let high_yield = meta
                    .get(question_id)
                    .map(|m| m.high_yield)
                    .unwrap_or(false);
                let rolling = category_accuracy
                    .get(history.category)
                    .copied()
                    .unwrap_or(1.0);
                high_yield && rolling < self.params.accuracy_floor
            }
            BucketKind::SlowCorrect => history.latest_correct().is_some_and(|attempt| {
                let target = self.time.target_ms(self.difficulty_of(attempt, meta));
                attempt.time_taken_ms as f64 > self.params.slow_multiple * target
            }),
            BucketKind::AlmostCorrect => history.latest_incorrect().is_some_and(|attempt| {
                meta.get(question_id)
                    .map(|m| m.near_miss_options.contains(&attempt.chosen_option))
                    .unwrap_or(false)
            }),
        }
    }

    fn build_bucket(
        &self,
        kind: BucketKind,
        members: &[(&str, &QuestionHistory)],
        meta: &HashMap<String, QuestionMeta>,
    ) -> RevisionBucket {
        let entries: Vec<BucketEntry> = members
            .iter()
            .map(|(question_id, history)| BucketEntry {
                question_id: question_id.to_string(),
                category: history.category.to_string(),
                accuracy: history.accuracy(),
                avg_time_ms: history.avg_time_ms(),
                high_yield: meta.get(*question_id).map(|m| m.high_yield).unwrap_or(false),
            })
            .collect();

        let weighted_size: f64 = entries
            .iter()
            .map(|entry| if entry.high_yield { self.params.high_yield_weight } else { 1.0 })
            .sum();
        let priority = if weighted_size >= self.params.priority_high {
            PriorityTier::High
        } else if weighted_size >= self.params.priority_medium {
            PriorityTier::Medium
        } else {
            PriorityTier::Low
        };

        let total_ms: f64 = entries.iter().map(|e| e.avg_time_ms).sum();
        let minutes = (total_ms * self.params.review_factor / 60_000.0).ceil() as u32;
        let suggested_minutes =
            minutes.clamp(self.params.min_session_minutes, self.params.max_session_minutes);

        RevisionBucket {
            kind,
            priority,
            reason: self.reason(kind, entries.len()),
            entries,
            suggested_minutes,
        }
    }

    fn difficulty_of(&self, attempt: &Attempt, meta: &HashMap<String, QuestionMeta>) -> f64 {
        meta.get(&attempt.question_id)
            .map(|m| m.difficulty)
            .unwrap_or(attempt.difficulty)
    }

    fn reason(&self, kind: BucketKind, count: usize) -> String {
        match kind {
            BucketKind::IncorrectConfident => format!(
                "{count} question(s) missed despite high self-reported confidence; the riskiest miscalibration pattern"
            ),
            BucketKind::HighYieldLowAccuracy => format!(
                "{count} high-yield question(s) in categories below the {:.0}% accuracy floor",
                self.params.accuracy_floor * 100.0
            ),
            BucketKind::SlowCorrect => format!(
                "{count} question(s) answered correctly but over {:.1}x the target time",
                self.params.slow_multiple
            ),
            BucketKind::AlmostCorrect => format!(
                "{count} question(s) missed on a designated near-miss distractor; partial understanding worth consolidating"
            ),
        }
    }
}

fn question_histories(attempts: &[Attempt]) -> HashMap<&str, QuestionHistory<'_>> {
    // Attempts arrive ordered by timestamp, so per-question vectors stay in
    // exposure order.
    let mut histories: HashMap<&str, QuestionHistory> = HashMap::new();
    for attempt in attempts {
        histories
            .entry(attempt.question_id.as_str())
            .or_insert_with(|| QuestionHistory {
                category: attempt.category.as_str(),
                attempts: Vec::new(),
            })
            .attempts
            .push(attempt);
    }
    histories
}

fn category_accuracy(attempts: &[Attempt]) -> HashMap<&str, f64> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for attempt in attempts {
        let entry = counts.entry(attempt.category.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if attempt.is_correct {
            entry.1 += 1;
        }
    }
    counts
        .into_iter()
        .map(|(category, (total, correct))| (category, correct as f64 / total as f64))
        .collect()
}
