/// Property-based tests using proptest
/// Tests invariants that must hold for all inputs: the evaluator never
/// panics, ranges are inclusive, and classification bands are exhaustive.
use proptest::prelude::*;
use serde_json::json;
use travloger_scoring_api::evaluator::evaluate;
use travloger_scoring_api::models::{PriorityThresholds, PriorityTier};

// Property: the evaluator fails soft on arbitrary garbage
proptest! {
    #[test]
    fn evaluation_never_panics(
        field in "\\PC*",
        condition_type in "\\PC*",
        condition_value in "\\PC*"
    ) {
        let _ = evaluate(&json!(field), &condition_type, &condition_value);
    }

    #[test]
    fn evaluation_never_panics_on_numbers(
        field in proptest::num::f64::NORMAL,
        condition_value in "\\PC*"
    ) {
        for op in ["greater_than", "less_than", "between", "within_days", "equals"] {
            let _ = evaluate(&json!(field), op, &condition_value);
        }
    }
}

// Property: between is inclusive and its complement holds outside the range
proptest! {
    #[test]
    fn between_matches_exactly_the_closed_range(
        lo in -10_000i64..10_000,
        span in 0i64..10_000,
        v in -20_000i64..20_000
    ) {
        let hi = lo + span;
        let cond = format!("{},{}", lo, hi);
        let inside = v >= lo && v <= hi;
        prop_assert_eq!(evaluate(&json!(v), "between", &cond), inside);
    }

    #[test]
    fn strict_and_inclusive_comparisons_are_consistent(
        a in -10_000i64..10_000,
        b in -10_000i64..10_000
    ) {
        let cond = b.to_string();
        let gt = evaluate(&json!(a), "greater_than", &cond);
        let gte = evaluate(&json!(a), "greater_than_or_equal", &cond);
        let lt = evaluate(&json!(a), "less_than", &cond);
        // greater_than implies greater_than_or_equal
        prop_assert!(!gt || gte);
        // strict comparisons are mutually exclusive
        prop_assert!(!(gt && lt));
        // equality satisfies the inclusive form only
        if a == b {
            prop_assert!(gte && !gt);
        }
    }
}

// Property: every score lands in exactly one tier, and tiers are monotone
proptest! {
    #[test]
    fn classification_is_total_and_monotone(score in -1_000i32..1_000) {
        let thresholds = PriorityThresholds::default();
        let tier = thresholds.classify(score);
        match tier {
            PriorityTier::Hot => prop_assert!(score >= thresholds.hot),
            PriorityTier::Warm => {
                prop_assert!(score >= thresholds.warm_min && score < thresholds.hot)
            }
            PriorityTier::Cold => prop_assert!(score < thresholds.warm_min),
        }
        // A higher score never demotes the tier
        let higher = thresholds.classify(score.saturating_add(1));
        let rank = |t: PriorityTier| match t {
            PriorityTier::Cold => 0,
            PriorityTier::Warm => 1,
            PriorityTier::Hot => 2,
        };
        prop_assert!(rank(higher) >= rank(tier));
    }
}
