//! Property-based tests for the analytics invariants:
//! - readiness overall is bounded and equals the documented weighted sum
//! - the difficulty modifier clamps for any input
//! - bucket membership is a partition and mastery removal is idempotent
//! - schedule totals never exceed the available questions and honor the
//!   daily budget outside compressed mode

use std::collections::{HashMap, HashSet};

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use prepdash_analytics::config::{
    BucketParams, ReadinessParams, ScheduleParams, TimeModel,
};
use prepdash_analytics::engine::buckets::BucketGenerator;
use prepdash_analytics::engine::readiness::{difficulty_modifier, ReadinessCalculator};
use prepdash_analytics::engine::schedule::ScheduleBuilder;
use prepdash_analytics::{Attempt, BucketEntry, BucketKind, PriorityTier, RevisionBucket};

fn arb_attempt(index: usize) -> impl Strategy<Value = Attempt> {
    (
        0usize..12,                  // question pool
        any::<bool>(),               // correctness
        1_000i64..200_000,           // time taken
        proptest::option::of(0u32..=100), // confidence in percent
        0i64..28,                    // days ago
        0u32..=100,                  // difficulty in percent
    )
        .prop_map(move |(question, is_correct, time_ms, confidence, days_ago, difficulty)| {
            let base = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
            Attempt {
                id: format!("a{index}-{question}-{days_ago}"),
                user_id: "u1".to_string(),
                question_id: format!("q{question}"),
                chosen_option: "A".to_string(),
                is_correct,
                time_taken_ms: time_ms,
                confidence: confidence.map(|c| c as f64 / 100.0),
                category: format!("cat{}", question % 4),
                difficulty: difficulty as f64 / 100.0,
                session_position: None,
                timestamp: base - Duration::days(days_ago) + Duration::minutes(index as i64),
            }
        })
}

fn arb_attempts() -> impl Strategy<Value = Vec<Attempt>> {
    (1usize..60)
        .prop_flat_map(|len| (0..len).map(arb_attempt).collect::<Vec<_>>())
        .prop_map(|mut attempts| {
            attempts.sort_by_key(|a| a.timestamp);
            attempts
        })
}

fn arb_bucket(kind: BucketKind) -> impl Strategy<Value = RevisionBucket> {
    (1usize..25, 0usize..3, 5u32..=45).prop_map(move |(size, tier, minutes)| {
        let priority = [PriorityTier::Low, PriorityTier::Medium, PriorityTier::High][tier];
        RevisionBucket {
            kind,
            priority,
            entries: (0..size)
                .map(|i| BucketEntry {
                    question_id: format!("{}-{i}", kind.label()),
                    category: "cat0".to_string(),
                    accuracy: 0.5,
                    avg_time_ms: 60_000.0,
                    high_yield: i % 2 == 0,
                })
                .collect(),
            suggested_minutes: minutes,
            reason: String::new(),
        }
    })
}

fn arb_buckets() -> impl Strategy<Value = Vec<RevisionBucket>> {
    (
        proptest::option::of(arb_bucket(BucketKind::IncorrectConfident)),
        proptest::option::of(arb_bucket(BucketKind::HighYieldLowAccuracy)),
        proptest::option::of(arb_bucket(BucketKind::SlowCorrect)),
        proptest::option::of(arb_bucket(BucketKind::AlmostCorrect)),
    )
        .prop_map(|(a, b, c, d)| [a, b, c, d].into_iter().flatten().collect())
}

proptest! {
    #[test]
    fn readiness_is_bounded_and_matches_weighted_sum(attempts in arb_attempts()) {
        let calculator = ReadinessCalculator::new(ReadinessParams::default(), TimeModel::default());
        let now = Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap();
        let score = calculator.compute(&attempts, &HashMap::new(), now).unwrap();

        prop_assert!((0.0..=100.0).contains(&score.overall));
        let c = score.components;
        for component in [c.accuracy, c.stability, c.coverage, c.time, c.consistency] {
            prop_assert!((0.0..=100.0).contains(&component));
        }
        let expected = 0.40 * c.accuracy + 0.20 * c.stability + 0.20 * c.coverage
            + 0.10 * c.time + 0.10 * c.consistency;
        prop_assert!((score.overall - expected).abs() < 1e-9);
    }

    #[test]
    fn difficulty_modifier_clamps_for_any_input(avg in -1_000.0f64..1_000.0) {
        let modifier = difficulty_modifier(avg);
        prop_assert!((-0.10..=0.15).contains(&modifier));
    }

    #[test]
    fn bucket_membership_is_a_partition(attempts in arb_attempts()) {
        let generator = BucketGenerator::new(BucketParams::default(), TimeModel::default());
        let buckets = generator.generate(&attempts, &HashMap::new(), &[]).unwrap();

        let mut seen = HashSet::new();
        for bucket in &buckets {
            prop_assert!(!bucket.entries.is_empty());
            for entry in &bucket.entries {
                prop_assert!(seen.insert(entry.question_id.clone()),
                    "{} appears in two buckets", entry.question_id);
            }
        }
    }

    #[test]
    fn mastered_questions_never_reappear(attempts in arb_attempts()) {
        let params = BucketParams::default();
        let time = TimeModel::default();
        let generator = BucketGenerator::new(params.clone(), time.clone());

        // Append a mastering tail to one question: trailing_k fast correct
        // answers. On the next pass it must be in no bucket.
        let mut attempts = attempts;
        let last_ts = attempts.last().unwrap().timestamp;
        for i in 0..params.trailing_k {
            let mut mastered = attempts[0].clone();
            mastered.id = format!("mastery-{i}");
            mastered.question_id = "q0".to_string();
            mastered.is_correct = true;
            mastered.time_taken_ms = 10_000;
            mastered.timestamp = last_ts + Duration::minutes(i as i64 + 1);
            attempts.push(mastered);
        }

        let buckets = generator.generate(&attempts, &HashMap::new(), &[]).unwrap();
        for bucket in &buckets {
            prop_assert!(bucket.entries.iter().all(|e| e.question_id != "q0"));
        }
    }

    #[test]
    fn schedule_totals_respect_pool_and_budget(
        buckets in arb_buckets(),
        days in 1u32..120,
        budget in 10u32..=120,
    ) {
        let builder = ScheduleBuilder::new(ScheduleParams::default());
        let schedule = builder.build(&buckets, days, budget).unwrap();

        let available: usize = buckets.iter().map(|b| b.entries.len()).sum();
        let assigned: usize = schedule.days.iter().map(|d| d.total_questions).sum();
        prop_assert!(assigned <= available);
        prop_assert!(schedule.horizon_days <= 90);

        if !schedule.compressed {
            for day in &schedule.days {
                prop_assert!(day.estimated_minutes <= budget as f64 + 1e-9,
                    "day {} over budget: {}", day.day, day.estimated_minutes);
            }
        }

        // Per-day totals are recomputed, not looked up.
        for day in &schedule.days {
            let questions: usize = day.blocks.iter().map(|b| b.question_count).sum();
            let minutes: f64 = day.blocks.iter().map(|b| b.estimated_minutes).sum();
            prop_assert_eq!(day.total_questions, questions);
            prop_assert!((day.estimated_minutes - minutes).abs() < 1e-9);
        }
    }
}
