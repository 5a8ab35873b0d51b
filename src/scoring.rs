//! Score calculation engine.
//!
//! Loads the applicable active rules for a lead's segment and trigger,
//! evaluates each against the lead's field bag, sums the matched points and
//! classifies the total into a priority tier. The score written back to the
//! lead is a derived, overwritable cache: recomputation against unchanged
//! rules and fields is idempotent.

use crate::errors::{AppError, ResultExt};
use crate::evaluator;
use crate::models::{AutomationTrigger, Lead, MatchedRule, ScoreResult, ScoringRule};
use crate::store::{LeadStore, RuleStore};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

pub struct ScoreEngine {
    rules: Arc<dyn RuleStore>,
    leads: Arc<dyn LeadStore>,
}

impl ScoreEngine {
    pub fn new(rules: Arc<dyn RuleStore>, leads: Arc<dyn LeadStore>) -> Self {
        Self { rules, leads }
    }

    /// Scores a persisted lead and writes the derived
    /// {lead_score, lead_priority, last_score_calculated} cache back onto it.
    ///
    /// A missing lead is a client error, not a server fault.
    pub async fn calculate_for_lead(
        &self,
        lead_id: Uuid,
        trigger: AutomationTrigger,
    ) -> Result<(ScoreResult, DateTime<Utc>), AppError> {
        let lead = self
            .leads
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", lead_id)))?;

        let result = self.calculate(&lead, trigger).await?;

        let calculated_at = Utc::now();
        self.leads
            .save_score(lead_id, result.total_score, result.priority, calculated_at)
            .await?;

        tracing::info!(
            "Scored lead {}: {} points, {} ({} of {} rules matched)",
            lead_id,
            result.total_score,
            result.priority.as_str(),
            result.matched_rules.len(),
            result.rules_evaluated
        );

        Ok((result, calculated_at))
    }

    /// Dry-run calculation over raw ad-hoc field data. Never touches storage.
    pub async fn calculate_preview(
        &self,
        lead_data: &Value,
        trigger: AutomationTrigger,
    ) -> Result<ScoreResult, AppError> {
        let lead = ephemeral_lead(lead_data);
        self.calculate(&lead, trigger).await
    }

    async fn calculate(
        &self,
        lead: &Lead,
        trigger: AutomationTrigger,
    ) -> Result<ScoreResult, AppError> {
        let rules = self
            .rules
            .load_active_rules(lead.effective_lead_type(), trigger)
            .await
            .context("loading active scoring rules")?;
        Ok(score_lead(lead, &rules))
    }
}

/// Wraps raw field data in a lead the engine can score. The id is never
/// used on this path.
fn ephemeral_lead(lead_data: &Value) -> Lead {
    let full_name = lead_data
        .get("full_name")
        .and_then(|v| v.as_str())
        .map(String::from);
    let lead_type = lead_data
        .get("lead_type")
        .and_then(|v| v.as_str())
        .map(String::from);

    Lead {
        id: Uuid::nil(),
        full_name,
        lead_type,
        fields: lead_data.clone(),
        lead_score: None,
        lead_priority: None,
        last_score_calculated: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}

/// Pure scoring core: evaluate every rule, sum matched points, classify.
///
/// The evaluator fails soft, so a single bad rule (malformed pattern,
/// unparsable operand) degrades to a non-match instead of aborting the
/// calculation. Rule order (score_value DESC from the store) affects only
/// the breakdown presentation, never the sum.
///
/// Thresholds are borrowed from the first rule row in the set, falling back
/// to the documented defaults when no rules apply.
pub fn score_lead(lead: &Lead, rules: &[ScoringRule]) -> ScoreResult {
    let thresholds = rules
        .first()
        .map(ScoringRule::thresholds)
        .unwrap_or_default();

    let mut total_score = 0;
    let mut matched_rules = Vec::new();

    for rule in rules {
        let field_value = lead.field(&rule.field_checked).unwrap_or(Value::Null);

        if evaluator::evaluate(&field_value, &rule.condition_type, &rule.condition_value) {
            total_score += rule.score_value;
            matched_rules.push(MatchedRule {
                rule_name: rule.criteria_name.clone(),
                score_added: rule.score_value,
                field_checked: rule.field_checked.clone(),
                field_value,
            });
        }
    }

    ScoreResult {
        total_score,
        priority: thresholds.classify(total_score),
        matched_rules,
        rules_evaluated: rules.len(),
    }
}
