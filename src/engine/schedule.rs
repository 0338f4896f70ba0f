use crate::config::ScheduleParams;
use crate::engine::types::{
    PriorityTier, RevisionBucket, RevisionSchedule, ScheduleDay, ScheduledBlock,
};
use crate::error::EngineError;

/// Lays the current buckets out across the days remaining until the exam.
///
/// Each bucket recurs on a fixed cadence by priority tier and its questions
/// form a pool consumed across those due days, so the schedule distributes
/// every question at most once. A day's allocation is trimmed to the session
/// budget, high priority first; trimmed questions stay in the pool for the
/// bucket's next due day.
pub struct ScheduleBuilder {
    params: ScheduleParams,
}

struct BucketPool<'a> {
    bucket: &'a RevisionBucket,
    interval: u32,
    remaining: usize,
    minutes_per_question: f64,
}

impl<'a> BucketPool<'a> {
    fn due_on(&self, day: u32) -> bool {
        self.remaining > 0 && (day - 1) % self.interval == 0
    }

    /// Due days from `day` (inclusive) to the horizon.
    fn occurrences_left(&self, day: u32, horizon: u32) -> usize {
        ((horizon - day) / self.interval + 1) as usize
    }
}

impl ScheduleBuilder {
    pub fn new(params: ScheduleParams) -> Self {
        Self { params }
    }

    pub fn build(
        &self,
        buckets: &[RevisionBucket],
        days_until_exam: u32,
        daily_budget_minutes: u32,
    ) -> Result<RevisionSchedule, EngineError> {
        if days_until_exam == 0 {
            return Err(EngineError::InvalidParameter(
                "daysUntilExam must be at least 1".to_string(),
            ));
        }
        if daily_budget_minutes == 0 {
            return Err(EngineError::InvalidParameter(
                "dailyBudgetMinutes must be at least 1".to_string(),
            ));
        }

        let horizon = days_until_exam.min(self.params.max_horizon_days);

        let mut pools: Vec<BucketPool> = buckets
            .iter()
            .filter(|bucket| !bucket.entries.is_empty())
            .map(|bucket| BucketPool {
                bucket,
                interval: self.interval_for(bucket.priority),
                remaining: bucket.entries.len(),
                minutes_per_question: bucket.suggested_minutes as f64 / bucket.entries.len() as f64,
            })
            .collect();
        // Highest priority first within each day.
        pools.sort_by(|a, b| b.bucket.priority.cmp(&a.bucket.priority));

        let total_minutes: f64 = pools.iter().map(|p| p.bucket.suggested_minutes as f64).sum();
        let budget = daily_budget_minutes as f64;
        let compressed = days_until_exam < self.params.compressed_horizon_days
            && total_minutes > horizon as f64 * budget;
        if compressed {
            tracing::warn!(
                days_until_exam,
                total_minutes,
                "bucket volume exceeds the short horizon; building a compressed schedule"
            );
        }

        let mut days = Vec::with_capacity(horizon as usize);
        for day in 1..=horizon {
            let mut blocks = Vec::new();
            let mut budget_left = budget;

            for pool in pools.iter_mut() {
                if !pool.due_on(day) {
                    continue;
                }
                let quota = pool.remaining.div_ceil(pool.occurrences_left(day, horizon));
                let take = if compressed {
                    quota
                } else {
                    let affordable = (budget_left / pool.minutes_per_question).floor() as usize;
                    quota.min(affordable)
                };
                if take == 0 {
                    // Deferred to the bucket's next natural recurrence.
                    continue;
                }

                let minutes = take as f64 * pool.minutes_per_question;
                budget_left -= minutes;
                pool.remaining -= take;
                blocks.push(ScheduledBlock {
                    kind: pool.bucket.kind,
                    priority: pool.bucket.priority,
                    question_count: take,
                    estimated_minutes: minutes,
                });
            }

            let total_questions = blocks.iter().map(|b| b.question_count).sum();
            let estimated_minutes = blocks.iter().map(|b| b.estimated_minutes).sum();
            days.push(ScheduleDay {
                day,
                blocks,
                total_questions,
                estimated_minutes,
            });
        }

        Ok(RevisionSchedule {
            days,
            horizon_days: horizon,
            compressed,
        })
    }

    fn interval_for(&self, priority: PriorityTier) -> u32 {
        let interval = match priority {
            PriorityTier::High => self.params.high_interval_days,
            PriorityTier::Medium => self.params.medium_interval_days,
            PriorityTier::Low => self.params.low_interval_days,
        };
        interval.max(1)
    }
}
