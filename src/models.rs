use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

// ============ Domain Enums ============

/// Lead segment a scoring rule applies to.
///
/// Stored as text in `scoring_rules.lead_type`; NULL (or empty) means the
/// rule is a wildcard that applies to every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadType {
    /// Group travel (families, tour groups).
    Group,
    /// Free independent traveler.
    #[serde(rename = "FIT")]
    Fit,
    /// Corporate account travel.
    Corporate,
}

impl LeadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadType::Group => "Group",
            LeadType::Fit => "FIT",
            LeadType::Corporate => "Corporate",
        }
    }

    /// Case-insensitive parse of the stored/wire value.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "group" => Some(LeadType::Group),
            "fit" => Some(LeadType::Fit),
            "corporate" => Some(LeadType::Corporate),
            _ => None,
        }
    }
}

/// Lifecycle event that makes a rule eligible to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationTrigger {
    OnCreate,
    OnUpdate,
    /// Rule-side only: eligible for both lifecycle events.
    Both,
}

impl AutomationTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AutomationTrigger::OnCreate => "on_create",
            AutomationTrigger::OnUpdate => "on_update",
            AutomationTrigger::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "on_create" => Some(AutomationTrigger::OnCreate),
            "on_update" => Some(AutomationTrigger::OnUpdate),
            "both" => Some(AutomationTrigger::Both),
            _ => None,
        }
    }
}

/// Rule lifecycle state. Rules are soft-deleted by flipping to `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    Active,
    Inactive,
}

impl RuleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleStatus::Active => "active",
            RuleStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(RuleStatus::Active),
            "inactive" => Some(RuleStatus::Inactive),
            _ => None,
        }
    }
}

/// Priority tier derived from the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityTier {
    Hot,
    Warm,
    Cold,
}

impl PriorityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::Hot => "Hot",
            PriorityTier::Warm => "Warm",
            PriorityTier::Cold => "Cold",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "hot" => Some(PriorityTier::Hot),
            "warm" => Some(PriorityTier::Warm),
            "cold" => Some(PriorityTier::Cold),
            _ => None,
        }
    }
}

/// Comparison operator a rule applies to a lead field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    WithinDays,
    IsEmpty,
    IsNotEmpty,
    RegexMatch,
}

impl ConditionType {
    /// Unknown operators return `None`; the evaluator treats that as a
    /// non-match (fail closed).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "equals" => Some(ConditionType::Equals),
            "not_equals" => Some(ConditionType::NotEquals),
            "contains" => Some(ConditionType::Contains),
            "not_contains" => Some(ConditionType::NotContains),
            "starts_with" => Some(ConditionType::StartsWith),
            "ends_with" => Some(ConditionType::EndsWith),
            "greater_than" => Some(ConditionType::GreaterThan),
            "greater_than_or_equal" => Some(ConditionType::GreaterThanOrEqual),
            "less_than" => Some(ConditionType::LessThan),
            "less_than_or_equal" => Some(ConditionType::LessThanOrEqual),
            "between" => Some(ConditionType::Between),
            "within_days" => Some(ConditionType::WithinDays),
            "is_empty" => Some(ConditionType::IsEmpty),
            "is_not_empty" => Some(ConditionType::IsNotEmpty),
            "regex_match" => Some(ConditionType::RegexMatch),
            _ => None,
        }
    }
}

// ============ Database Models ============

/// Priority classification thresholds.
///
/// Stored per rule row (a schema quirk the admin UI relies on); the defaults
/// below apply when no rules exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityThresholds {
    /// Total score at or above this is `Hot`. Default 40.
    pub hot: i32,
    /// Total score at or above this (and below `hot`) is `Warm`. Default 25.
    pub warm_min: i32,
    /// Upper bound of the warm band. Recorded but not consulted by
    /// classification. Default 39.
    pub warm_max: i32,
    /// Upper bound of the cold band. Recorded but not consulted. Default 24.
    pub cold_max: i32,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            hot: 40,
            warm_min: 25,
            warm_max: 39,
            cold_max: 24,
        }
    }
}

impl PriorityThresholds {
    /// Classifies a total score into a tier. Hot and warm_min fully
    /// determine the result.
    pub fn classify(&self, total: i32) -> PriorityTier {
        if total >= self.hot {
            PriorityTier::Hot
        } else if total >= self.warm_min {
            PriorityTier::Warm
        } else {
            PriorityTier::Cold
        }
    }
}

/// A named condition-to-points mapping used to compute a lead's priority.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ScoringRule {
    /// Unique identifier for the rule.
    pub id: Uuid,
    /// Human-readable rule name shown in match breakdowns.
    pub criteria_name: String,
    /// Name of the lead field this rule inspects.
    pub field_checked: String,
    /// Comparison operator, stored as text (see `ConditionType::parse`).
    pub condition_type: String,
    /// Operator operand (range string, pattern, day count, ...).
    pub condition_value: String,
    /// Points added to the total when the condition matches.
    pub score_value: i32,
    /// Lead segment the rule applies to; NULL/empty is a wildcard.
    pub lead_type: Option<String>,
    /// Lifecycle event eligibility: on_create, on_update or both.
    pub automation_trigger: String,
    pub hot_threshold: i32,
    pub warm_min: i32,
    pub warm_max: i32,
    pub cold_max: i32,
    /// active or inactive (soft delete).
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ScoringRule {
    pub fn thresholds(&self) -> PriorityThresholds {
        PriorityThresholds {
            hot: self.hot_threshold,
            warm_min: self.warm_min,
            warm_max: self.warm_max,
            cold_max: self.cold_max,
        }
    }
}

/// A sales prospect with free-form attributes.
///
/// The scorer treats the lead as an untyped field bag: rules reference
/// attributes by name inside `fields`. Score, priority and calculation
/// timestamp are a derived, overwritable cache, not a system of record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub full_name: Option<String>,
    /// Group, FIT or Corporate; scoring defaults to FIT when absent.
    pub lead_type: Option<String>,
    /// Free-form attribute bag (budget, destination, travel_date, ...).
    pub fields: Value,
    pub lead_score: Option<i32>,
    pub lead_priority: Option<String>,
    pub last_score_calculated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Lead {
    /// Looks up a named field. The bag wins; the typed columns are exposed
    /// under their own names so rules can reference them too.
    pub fn field(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.fields.get(name) {
            if !v.is_null() {
                return Some(v.clone());
            }
        }
        match name {
            "full_name" => self.full_name.clone().map(Value::String),
            "lead_type" => self.lead_type.clone().map(Value::String),
            _ => None,
        }
    }

    /// Effective segment for rule filtering, defaulting to FIT.
    pub fn effective_lead_type(&self) -> LeadType {
        self.lead_type
            .as_deref()
            .and_then(LeadType::parse)
            .unwrap_or(LeadType::Fit)
    }
}

/// One entry of the append-only automation audit trail.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AutomationLogEntry {
    pub id: Uuid,
    pub lead_id: Uuid,
    /// Action descriptor (e.g. "send_whatsapp", "create_task").
    pub action_type: String,
    /// queued / logged / failed.
    pub status: String,
    pub message: String,
    pub priority: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

// ============ Engine Results ============

/// One matched rule in a score breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRule {
    pub rule_name: String,
    pub score_added: i32,
    pub field_checked: String,
    pub field_value: Value,
}

/// Outcome of a score calculation.
///
/// Deterministic in (lead fields, active rule set, trigger): recomputation
/// against unchanged inputs yields an identical result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub total_score: i32,
    pub priority: PriorityTier,
    pub matched_rules: Vec<MatchedRule>,
    pub rules_evaluated: usize,
}

// ============ API Request/Response Models ============

/// Body of POST /api/v1/scoring/calculate.
///
/// Exactly one of `lead_id` / `lead_data` identifies the subject. With
/// `lead_id` the result is persisted back onto the lead; `lead_data` is a
/// dry run that never writes.
#[derive(Debug, Deserialize)]
pub struct CalculateScoreRequest {
    pub lead_id: Option<Uuid>,
    pub lead_data: Option<Value>,
    /// on_create or on_update; defaults to on_create.
    pub trigger_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CalculateScoreResponse {
    pub total_score: i32,
    pub priority: PriorityTier,
    pub matched_rules: Vec<MatchedRule>,
    pub rules_evaluated: usize,
    pub calculated_at: DateTime<Utc>,
}

/// Body of POST /api/v1/scoring/automation.
#[derive(Debug, Deserialize)]
pub struct AutomationRequest {
    pub lead_id: Uuid,
    pub priority: String,
    pub score: i32,
}

#[derive(Debug, Serialize)]
pub struct AutomationResponse {
    pub actions_triggered: Vec<String>,
    pub automation_log: Vec<AutomationLogEntry>,
}

/// Body of POST /api/v1/scoring/rules.
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub criteria_name: String,
    pub field_checked: String,
    pub condition_type: String,
    #[serde(default)]
    pub condition_value: String,
    pub score_value: i32,
    pub lead_type: Option<String>,
    pub automation_trigger: Option<String>,
    pub hot_threshold: Option<i32>,
    pub warm_min: Option<i32>,
    pub warm_max: Option<i32>,
    pub cold_max: Option<i32>,
}

/// Body of PUT /api/v1/scoring/rules/:id. Absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct UpdateRuleRequest {
    pub criteria_name: Option<String>,
    pub field_checked: Option<String>,
    pub condition_type: Option<String>,
    pub condition_value: Option<String>,
    pub score_value: Option<i32>,
    pub lead_type: Option<String>,
    pub automation_trigger: Option<String>,
    pub hot_threshold: Option<i32>,
    pub warm_min: Option<i32>,
    pub warm_max: Option<i32>,
    pub cold_max: Option<i32>,
    pub status: Option<String>,
}

/// Query parameters of GET /api/v1/scoring/rules.
#[derive(Debug, Default, Deserialize)]
pub struct RuleQueryParams {
    pub lead_type: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lead_type_parse_is_case_insensitive() {
        assert_eq!(LeadType::parse("FIT"), Some(LeadType::Fit));
        assert_eq!(LeadType::parse("fit"), Some(LeadType::Fit));
        assert_eq!(LeadType::parse(" Corporate "), Some(LeadType::Corporate));
        assert_eq!(LeadType::parse("b2b"), None);
    }

    #[test]
    fn unknown_condition_type_parses_to_none() {
        assert_eq!(ConditionType::parse("between"), Some(ConditionType::Between));
        assert_eq!(ConditionType::parse("sounds_like"), None);
    }

    #[test]
    fn default_thresholds_classify_each_band() {
        let t = PriorityThresholds::default();
        assert_eq!(t.hot, 40);
        assert_eq!(t.warm_min, 25);
        assert_eq!(t.classify(45), PriorityTier::Hot);
        assert_eq!(t.classify(30), PriorityTier::Warm);
        assert_eq!(t.classify(10), PriorityTier::Cold);
    }

    #[test]
    fn lead_field_lookup_prefers_bag_over_columns() {
        let lead = Lead {
            id: Uuid::new_v4(),
            full_name: Some("Asha Travels".to_string()),
            lead_type: Some("Group".to_string()),
            fields: json!({"budget": 1200, "full_name": "Bag Name"}),
            lead_score: None,
            lead_priority: None,
            last_score_calculated: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert_eq!(lead.field("budget"), Some(json!(1200)));
        assert_eq!(lead.field("full_name"), Some(json!("Bag Name")));
        assert_eq!(lead.field("destination"), None);
        assert_eq!(lead.effective_lead_type(), LeadType::Group);
    }

    #[test]
    fn missing_lead_type_defaults_to_fit() {
        let lead = Lead {
            id: Uuid::new_v4(),
            full_name: None,
            lead_type: None,
            fields: json!({}),
            lead_score: None,
            lead_priority: None,
            last_score_calculated: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert_eq!(lead.effective_lead_type(), LeadType::Fit);
    }
}
