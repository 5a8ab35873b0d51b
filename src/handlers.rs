use crate::automation::AutomationDispatcher;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use crate::scoring::ScoreEngine;
use crate::store::{AdLeadStore, AuditLogStore, LeadStore, RuleStore};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Scoring rule store (cache-decorated in production wiring).
    pub rule_store: Arc<dyn RuleStore>,
    /// Lead collaborator store.
    pub lead_store: Arc<dyn LeadStore>,
    /// Append-only automation audit trail.
    pub audit_store: Arc<dyn AuditLogStore>,
    /// Ad-platform ingestion tracking records.
    pub ad_lead_store: Arc<dyn AdLeadStore>,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "travloger-scoring-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /api/v1/scoring/calculate
///
/// Scores a lead against the active rule set. With `lead_id` the result is
/// persisted back onto the lead; with raw `lead_data` this is a dry run that
/// never mutates storage. Supplying neither is a client error.
pub async fn calculate_score(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CalculateScoreRequest>,
) -> Result<Json<CalculateScoreResponse>, AppError> {
    let trigger = match payload.trigger_type.as_deref() {
        None => AutomationTrigger::OnCreate,
        Some(s) => match AutomationTrigger::parse(s) {
            Some(AutomationTrigger::Both) | None => {
                return Err(AppError::BadRequest(format!(
                    "Invalid trigger_type '{}': expected on_create or on_update",
                    s
                )))
            }
            Some(t) => t,
        },
    };

    let engine = ScoreEngine::new(state.rule_store.clone(), state.lead_store.clone());

    let (result, calculated_at) = match (payload.lead_id, payload.lead_data) {
        (Some(lead_id), _) => {
            tracing::info!("POST /scoring/calculate - lead_id: {}", lead_id);
            engine.calculate_for_lead(lead_id, trigger).await?
        }
        (None, Some(lead_data)) => {
            tracing::info!("POST /scoring/calculate - dry run over raw lead_data");
            let result = engine.calculate_preview(&lead_data, trigger).await?;
            (result, Utc::now())
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "Either lead_id or lead_data is required".to_string(),
            ))
        }
    };

    Ok(Json(CalculateScoreResponse {
        total_score: result.total_score,
        priority: result.priority,
        matched_rules: result.matched_rules,
        rules_evaluated: result.rules_evaluated,
        calculated_at,
    }))
}

/// POST /api/v1/scoring/automation
///
/// Dispatches the fixed follow-up action plan for a priority tier and
/// returns the appended audit log entries. Unknown priorities yield an
/// empty action list rather than an error.
pub async fn run_automation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AutomationRequest>,
) -> Result<Json<AutomationResponse>, AppError> {
    tracing::info!(
        "POST /scoring/automation - lead_id: {}, priority: {}",
        payload.lead_id,
        payload.priority
    );

    // A lead that does not exist is a client error, not a dispatch no-op
    state
        .lead_store
        .get_lead(payload.lead_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", payload.lead_id)))?;

    let dispatcher = AutomationDispatcher::new(state.audit_store.clone());
    let (actions_triggered, automation_log) = dispatcher
        .dispatch(payload.lead_id, &payload.priority, payload.score)
        .await;

    Ok(Json(AutomationResponse {
        actions_triggered,
        automation_log,
    }))
}

/// GET /api/v1/scoring/rules
///
/// Lists scoring rules, filterable by lead type and status.
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RuleQueryParams>,
) -> Result<Json<Vec<ScoringRule>>, AppError> {
    if let Some(ref lt) = params.lead_type {
        if LeadType::parse(lt).is_none() {
            return Err(AppError::BadRequest(format!(
                "Invalid lead_type filter '{}': expected Group, FIT or Corporate",
                lt
            )));
        }
    }
    if let Some(ref status) = params.status {
        if RuleStatus::parse(status).is_none() {
            return Err(AppError::BadRequest(format!(
                "Invalid status filter '{}': expected active or inactive",
                status
            )));
        }
    }

    let rules = state.rule_store.list_rules(&params).await?;
    Ok(Json(rules))
}

/// POST /api/v1/scoring/rules
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<ScoringRule>), AppError> {
    validate_rule_fields(
        Some(&payload.condition_type),
        payload.lead_type.as_deref(),
        payload.automation_trigger.as_deref(),
    )?;
    if payload.criteria_name.trim().is_empty() {
        return Err(AppError::BadRequest("criteria_name is required".to_string()));
    }
    if payload.field_checked.trim().is_empty() {
        return Err(AppError::BadRequest("field_checked is required".to_string()));
    }

    let rule = state.rule_store.create_rule(&payload).await?;
    tracing::info!("Created scoring rule {} ({})", rule.id, rule.criteria_name);

    Ok((StatusCode::CREATED, Json(rule)))
}

/// PUT /api/v1/scoring/rules/:id
pub async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRuleRequest>,
) -> Result<Json<ScoringRule>, AppError> {
    validate_rule_fields(
        payload.condition_type.as_deref(),
        payload.lead_type.as_deref(),
        payload.automation_trigger.as_deref(),
    )?;
    if let Some(ref status) = payload.status {
        if RuleStatus::parse(status).is_none() {
            return Err(AppError::BadRequest(format!(
                "Invalid status '{}': expected active or inactive",
                status
            )));
        }
    }

    let rule = state.rule_store.update_rule(id, &payload).await?;
    tracing::info!("Updated scoring rule {}", id);

    Ok(Json(rule))
}

/// DELETE /api/v1/scoring/rules/:id
///
/// Soft delete: the rule's status flips to inactive and it drops out of
/// calculations; the row is kept.
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.rule_store.deactivate_rule(id).await?;
    tracing::info!("Deactivated scoring rule {}", id);

    Ok(Json(json!({
        "success": true,
        "id": id,
        "status": "inactive"
    })))
}

/// GET /api/v1/leads/:id
///
/// Fetches a lead with its cached score fields.
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Lead>, AppError> {
    let lead = state
        .lead_store
        .get_lead(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))?;

    Ok(Json(lead))
}

/// GET /api/v1/leads/:id/automation-log
///
/// Recent automation audit entries for a lead, newest first.
pub async fn get_lead_automation_log(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AutomationLogEntry>>, AppError> {
    state
        .lead_store
        .get_lead(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))?;

    let entries = state.audit_store.recent_for_lead(id, 50).await?;
    Ok(Json(entries))
}

/// Shared enum-string validation for rule create/update payloads.
fn validate_rule_fields(
    condition_type: Option<&str>,
    lead_type: Option<&str>,
    automation_trigger: Option<&str>,
) -> Result<(), AppError> {
    if let Some(ct) = condition_type {
        if ConditionType::parse(ct).is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown condition_type '{}'",
                ct
            )));
        }
    }
    // Empty lead_type means wildcard and is allowed
    if let Some(lt) = lead_type {
        if !lt.trim().is_empty() && LeadType::parse(lt).is_none() {
            return Err(AppError::BadRequest(format!(
                "Invalid lead_type '{}': expected Group, FIT or Corporate",
                lt
            )));
        }
    }
    if let Some(tr) = automation_trigger {
        if AutomationTrigger::parse(tr).is_none() {
            return Err(AppError::BadRequest(format!(
                "Invalid automation_trigger '{}': expected on_create, on_update or both",
                tr
            )));
        }
    }
    Ok(())
}
