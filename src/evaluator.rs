//! Pure condition evaluator for scoring rules.
//!
//! Fails soft everywhere: a null/missing field value, an unknown operator, a
//! malformed pattern or an unparsable number all evaluate to a non-match.
//! Nothing in this module returns an error.

use crate::models::ConditionType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

/// Evaluates one rule condition against a lead field value.
///
/// `Value::Null` stands for a missing field and yields `false` for every
/// operator, `is_empty` included: the null short-circuit runs before operator
/// dispatch, so an absent field is never "empty", it is simply not there.
pub fn evaluate(field_value: &Value, condition_type: &str, condition_value: &str) -> bool {
    if field_value.is_null() {
        return false;
    }

    let Some(cond) = ConditionType::parse(condition_type) else {
        // Unknown operator: fail closed.
        return false;
    };

    match cond {
        ConditionType::Equals => fold(field_value) == fold_str(condition_value),
        ConditionType::NotEquals => fold(field_value) != fold_str(condition_value),
        ConditionType::Contains => fold(field_value).contains(&fold_str(condition_value)),
        ConditionType::NotContains => !fold(field_value).contains(&fold_str(condition_value)),
        ConditionType::StartsWith => fold(field_value).starts_with(&fold_str(condition_value)),
        ConditionType::EndsWith => fold(field_value).ends_with(&fold_str(condition_value)),
        ConditionType::GreaterThan => both_numeric(field_value, condition_value)
            .map(|(a, b)| a > b)
            .unwrap_or(false),
        ConditionType::GreaterThanOrEqual => both_numeric(field_value, condition_value)
            .map(|(a, b)| a >= b)
            .unwrap_or(false),
        ConditionType::LessThan => both_numeric(field_value, condition_value)
            .map(|(a, b)| a < b)
            .unwrap_or(false),
        ConditionType::LessThanOrEqual => both_numeric(field_value, condition_value)
            .map(|(a, b)| a <= b)
            .unwrap_or(false),
        ConditionType::Between => eval_between(field_value, condition_value),
        ConditionType::WithinDays => eval_within_days(field_value, condition_value, Utc::now()),
        ConditionType::IsEmpty => is_empty_value(field_value),
        ConditionType::IsNotEmpty => !is_empty_value(field_value),
        ConditionType::RegexMatch => eval_regex(field_value, condition_value),
    }
}

/// String rendering of a field value, case-folded for comparison.
fn fold(value: &Value) -> String {
    fold_str(&coerce_string(value))
}

fn fold_str(s: &str) -> String {
    s.trim().to_lowercase()
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Arrays/objects compare by their JSON rendering
        other => other.to_string(),
    }
}

/// Numeric coercion. A value that does not parse maps to `None`, and every
/// comparison involving `None` is false.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn both_numeric(field_value: &Value, condition_value: &str) -> Option<(f64, f64)> {
    let a = coerce_number(field_value)?;
    let b = condition_value.trim().parse::<f64>().ok()?;
    Some((a, b))
}

/// `between` takes a two-element comma-separated range, inclusive on both
/// ends.
fn eval_between(field_value: &Value, condition_value: &str) -> bool {
    let Some(v) = coerce_number(field_value) else {
        return false;
    };
    let parts: Vec<&str> = condition_value.split(',').collect();
    if parts.len() != 2 {
        return false;
    }
    let (Ok(lo), Ok(hi)) = (
        parts[0].trim().parse::<f64>(),
        parts[1].trim().parse::<f64>(),
    ) else {
        return false;
    };
    v >= lo && v <= hi
}

/// `within_days`: ceiling of (target - now) in days must land in [0, N].
/// Past dates and dates beyond the window never match.
fn eval_within_days(field_value: &Value, condition_value: &str, now: DateTime<Utc>) -> bool {
    let Some(target) = parse_date(field_value) else {
        return false;
    };
    let Ok(window) = condition_value.trim().parse::<i64>() else {
        return false;
    };
    let days_until = days_until_ceil(target, now);
    days_until >= 0 && days_until <= window
}

fn days_until_ceil(target: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = (target - now).num_seconds();
    // Integer ceiling of seconds/86400 that also holds for negatives
    seconds.div_euclid(86_400) + if seconds.rem_euclid(86_400) > 0 { 1 } else { 0 }
}

/// Accepts RFC3339, naive datetime, or plain date (taken as midnight UTC).
fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::from_naive_utc_and_offset(ndt, Utc));
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(DateTime::from_naive_utc_and_offset(
            nd.and_hms_opt(0, 0, 0)?,
            Utc,
        ));
    }
    None
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Case-insensitive regex test. A malformed pattern is caught and yields
/// false rather than propagating an error.
fn eval_regex(field_value: &Value, pattern: &str) -> bool {
    match regex::RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.is_match(&coerce_string(field_value)),
        Err(e) => {
            tracing::debug!("Ignoring malformed rule pattern '{}': {}", pattern, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn null_field_is_false_for_every_operator() {
        let ops = [
            "equals",
            "not_equals",
            "contains",
            "not_contains",
            "starts_with",
            "ends_with",
            "greater_than",
            "greater_than_or_equal",
            "less_than",
            "less_than_or_equal",
            "between",
            "within_days",
            "is_empty",
            "is_not_empty",
            "regex_match",
        ];
        for op in ops {
            assert!(!evaluate(&Value::Null, op, "anything"), "op {}", op);
        }
    }

    #[test]
    fn unknown_operator_fails_closed() {
        assert!(!evaluate(&json!("x"), "sounds_like", "x"));
        assert!(!evaluate(&json!("x"), "", "x"));
    }

    #[test]
    fn string_operators_case_fold_both_sides() {
        assert!(evaluate(&json!("Bali"), "equals", "bali"));
        assert!(evaluate(&json!("HONEYMOON in Bali"), "contains", "honeymoon"));
        assert!(evaluate(&json!("Mr. Smith"), "starts_with", "mr."));
        assert!(evaluate(&json!("trip@agency.COM"), "ends_with", ".com"));
        assert!(evaluate(&json!("Bali"), "not_equals", "goa"));
        assert!(evaluate(&json!("Bali"), "not_contains", "goa"));
    }

    #[test]
    fn numeric_comparisons_coerce_strings() {
        assert!(evaluate(&json!("1200"), "greater_than", "1000"));
        assert!(evaluate(&json!(1000), "greater_than_or_equal", "1000"));
        assert!(evaluate(&json!(3), "less_than", "4"));
        assert!(evaluate(&json!("4"), "less_than_or_equal", "4"));
    }

    #[test]
    fn non_numeric_input_never_matches_numeric_operators() {
        assert!(!evaluate(&json!("plenty"), "greater_than", "1000"));
        assert!(!evaluate(&json!(1200), "greater_than", "a lot"));
        assert!(!evaluate(&json!("soon"), "between", "5,10"));
    }

    #[test]
    fn between_is_inclusive_on_both_ends() {
        assert!(evaluate(&json!(5), "between", "5,10"));
        assert!(evaluate(&json!(10), "between", "5,10"));
        assert!(!evaluate(&json!(4.9), "between", "5,10"));
        assert!(!evaluate(&json!(10.1), "between", "5,10"));
        assert!(evaluate(&json!(7), "between", " 5 , 10 "));
    }

    #[test]
    fn between_requires_two_bounds() {
        assert!(!evaluate(&json!(7), "between", "5"));
        assert!(!evaluate(&json!(7), "between", "5,10,20"));
        assert!(!evaluate(&json!(7), "between", "low,high"));
    }

    #[test]
    fn within_days_excludes_past_dates() {
        let now = Utc::now();
        let yesterday = (now - Duration::days(1)).to_rfc3339();
        assert!(!eval_within_days(&json!(yesterday), "30", now));
    }

    #[test]
    fn within_days_bounds() {
        let now = Utc::now();
        let in_29 = (now + Duration::days(29)).to_rfc3339();
        let in_31 = (now + Duration::days(31)).to_rfc3339();
        assert!(eval_within_days(&json!(in_29), "30", now));
        assert!(!eval_within_days(&json!(in_31), "30", now));
    }

    #[test]
    fn within_days_accepts_plain_dates() {
        let now = Utc::now();
        let date = (now + Duration::days(10)).format("%Y-%m-%d").to_string();
        assert!(eval_within_days(&json!(date), "30", now));
    }

    #[test]
    fn within_days_rejects_garbage() {
        assert!(!evaluate(&json!("not a date"), "within_days", "30"));
        assert!(!evaluate(&json!("2030-01-01"), "within_days", "soon"));
    }

    #[test]
    fn regex_is_case_insensitive_and_swallows_bad_patterns() {
        assert!(evaluate(&json!("trip@agency.com"), "regex_match", r"@agency\.com$"));
        assert!(evaluate(&json!("URGENT enquiry"), "regex_match", "urgent"));
        assert!(!evaluate(&json!("anything"), "regex_match", "[unclosed"));
    }

    #[test]
    fn emptiness_checks() {
        assert!(evaluate(&json!(""), "is_empty", ""));
        assert!(evaluate(&json!("   "), "is_empty", ""));
        assert!(evaluate(&json!([]), "is_empty", ""));
        assert!(!evaluate(&json!("Goa"), "is_empty", ""));
        assert!(evaluate(&json!("Goa"), "is_not_empty", ""));
        assert!(!evaluate(&json!(0), "is_empty", ""));
        // null short-circuits before is_empty dispatch
        assert!(!evaluate(&Value::Null, "is_empty", ""));
    }

    #[test]
    fn days_until_ceiling_behavior() {
        let now = Utc::now();
        // 12 hours ahead rounds up to 1 day
        assert_eq!(days_until_ceil(now + Duration::hours(12), now), 1);
        assert_eq!(days_until_ceil(now, now), 0);
        // 12 hours in the past still ceilings to 0, so it sits inside [0, N]
        assert_eq!(days_until_ceil(now - Duration::hours(12), now), 0);
        assert_eq!(days_until_ceil(now - Duration::hours(36), now), -1);
    }
}
