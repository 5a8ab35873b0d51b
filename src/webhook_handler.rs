//! Ad-platform lead webhook.
//!
//! Receives lead-gen form submissions pushed by ad platforms, deduplicates on
//! the platform lead id, stores the lead, then scores it with the on-create
//! trigger and dispatches automation for the resulting tier. Ad platforms
//! retry aggressively on non-2xx, so per-event scoring failures downgrade to
//! a warning once the lead row is stored.

use crate::automation::AutomationDispatcher;
use crate::errors::{AppError, ResultExt};
use crate::handlers::AppState;
use crate::models::AutomationTrigger;
use crate::scoring::ScoreEngine;
use crate::webhook_models::{AdLeadEvent, AdLeadPayload, AdLeadWebhookResponse};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

pub async fn ad_lead_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AdLeadPayload>,
) -> Result<(StatusCode, Json<AdLeadWebhookResponse>), AppError> {
    tracing::info!("Received ad-platform lead webhook");

    // 1. Validate webhook secret (if configured)
    validate_webhook_secret(&state, &headers)?;

    // 2. Normalize to a vec of events (handles both single and batch)
    let events = payload.into_events();
    let total_received = events.len();
    tracing::info!("Processing {} ad lead event(s)", total_received);

    let mut processed = 0;
    let mut duplicates = 0;
    let mut scoring_warnings = 0;

    // 3. Process each event; one bad event never blocks the rest
    for event in events {
        match process_ad_lead_event(&state, event).await {
            Ok(IngestResult::Scored) => processed += 1,
            Ok(IngestResult::StoredUnscored) => {
                processed += 1;
                scoring_warnings += 1;
            }
            Ok(IngestResult::Duplicate) => {
                duplicates += 1;
                tracing::debug!("Skipped duplicate ad lead event");
            }
            Err(e) => {
                tracing::error!("Failed to process ad lead event: {}", e);
            }
        }
    }

    tracing::info!(
        "Ad lead webhook complete: {} received, {} processed, {} duplicates, {} scoring warnings",
        total_received,
        processed,
        duplicates,
        scoring_warnings
    );

    Ok((
        StatusCode::OK,
        Json(AdLeadWebhookResponse {
            status: "received".to_string(),
            received: total_received,
            processed,
            duplicates,
            scoring_warnings,
        }),
    ))
}

/// Validate webhook secret from X-Webhook-Token header
fn validate_webhook_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    // If no secret is configured, skip validation (warned at startup)
    let Some(ref expected_secret) = state.config.webhook_secret else {
        return Ok(());
    };

    let token = headers
        .get("X-Webhook-Token")
        .or_else(|| headers.get("x-webhook-token"))
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Webhook-Token header".to_string()))?;

    // Constant-time comparison to prevent timing attacks
    if !constant_time_compare(token, expected_secret) {
        tracing::warn!("Invalid webhook token received");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    Ok(())
}

/// Constant-time string comparison (basic implementation)
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Debug)]
enum IngestResult {
    Scored,
    StoredUnscored,
    Duplicate,
}

/// Ingest one lead event: dedupe, store, score, dispatch.
async fn process_ad_lead_event(
    state: &Arc<AppState>,
    event: AdLeadEvent,
) -> Result<IngestResult, AppError> {
    let platform_lead_id = event.lead_id.clone();

    // 1. Deduplicate on platform lead id (idempotent redelivery)
    if state.ad_lead_store.was_ingested(&platform_lead_id).await? {
        return Ok(IngestResult::Duplicate);
    }

    // 2. Create the lead row from the form's field bag
    let field_bag = event.to_field_bag();
    let full_name = event.full_name();
    let lead_type = event.lead_type();

    let lead = state
        .lead_store
        .create_lead(full_name.as_deref(), lead_type.as_deref(), field_bag)
        .await?;

    // 3. Store the tracking record before scoring so redeliveries dedupe
    //    even when scoring fails
    let payload_raw = serde_json::to_value(&event)
        .map_err(|e| AppError::InternalError(format!("Failed to serialize event: {}", e)))?;
    state
        .ad_lead_store
        .record_ingest(&event, lead.id, payload_raw)
        .await
        .context("recording ad-platform lead ingest")?;

    tracing::info!(
        "Ad lead {} stored as lead {} (campaign: {})",
        platform_lead_id,
        lead.id,
        event.campaign_id.as_deref().unwrap_or("-")
    );

    // 4. Score with the on-create trigger and dispatch automation.
    //    Failure here downgrades to a warning - the lead is already stored.
    let engine = ScoreEngine::new(state.rule_store.clone(), state.lead_store.clone());
    match engine
        .calculate_for_lead(lead.id, AutomationTrigger::OnCreate)
        .await
    {
        Ok((result, _)) => {
            let dispatcher = AutomationDispatcher::new(state.audit_store.clone());
            let (actions, _) = dispatcher
                .dispatch(lead.id, result.priority.as_str(), result.total_score)
                .await;

            mark_scoring_status(state, &platform_lead_id, "scored").await;
            tracing::info!(
                "Ad lead {} scored {} ({}), {} action(s) dispatched",
                platform_lead_id,
                result.total_score,
                result.priority.as_str(),
                actions.len()
            );
            Ok(IngestResult::Scored)
        }
        Err(e) => {
            tracing::warn!(
                "Scoring failed for ad lead {} (lead {}): {}",
                platform_lead_id,
                lead.id,
                e
            );
            mark_scoring_status(state, &platform_lead_id, "failed").await;
            Ok(IngestResult::StoredUnscored)
        }
    }
}

/// Best-effort status update on the tracking record.
async fn mark_scoring_status(state: &Arc<AppState>, platform_lead_id: &str, status: &str) {
    if let Err(e) = state
        .ad_lead_store
        .mark_scoring_status(platform_lead_id, status)
        .await
    {
        tracing::warn!(
            "Failed to mark ad lead {} as {}: {}",
            platform_lead_id,
            status,
            e
        );
    }
}
