//! Automation dispatcher.
//!
//! One-shot classification, not a persistent state machine: the priority tier
//! selects a fixed, ordered list of follow-up actions. Actions are logged to
//! the audit trail, not actually sent - messaging and email delivery live in
//! other subsystems.

use crate::models::{AutomationLogEntry, PriorityTier};
use crate::store::AuditLogStore;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Warm-tier follow-ups are scheduled roughly a day and a half out.
const WARM_FOLLOWUP_HOURS: i64 = 36;

/// An action descriptor produced for a priority tier.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub action_type: &'static str,
    pub message: String,
    pub metadata: Value,
}

/// Fixed action plan per tier. Unknown priorities (parse failures upstream)
/// map to an empty plan, never an error.
pub fn plan_actions(priority: PriorityTier, score: i32) -> Vec<PlannedAction> {
    match priority {
        PriorityTier::Hot => vec![
            PlannedAction {
                action_type: "send_instant_message",
                message: format!("Instant WhatsApp intro for hot lead (score {})", score),
                metadata: json!({"channel": "whatsapp"}),
            },
            PlannedAction {
                action_type: "send_summary_email",
                message: "Lead summary email to sales inbox".to_string(),
                metadata: json!({"channel": "email"}),
            },
            PlannedAction {
                action_type: "notify_consultant",
                message: "Ping on-duty travel consultant".to_string(),
                metadata: json!({"channel": "internal"}),
            },
            PlannedAction {
                action_type: "create_immediate_task",
                message: "Call-back task, due immediately".to_string(),
                metadata: json!({"due": "immediate"}),
            },
        ],
        PriorityTier::Warm => {
            let followup_at = Utc::now() + Duration::hours(WARM_FOLLOWUP_HOURS);
            vec![
                PlannedAction {
                    action_type: "schedule_reminder",
                    message: format!("Reminder scheduled {}h out", WARM_FOLLOWUP_HOURS),
                    metadata: json!({"scheduled_for": followup_at.to_rfc3339()}),
                },
                PlannedAction {
                    action_type: "schedule_followup_task",
                    message: "Follow-up task at the reminder horizon".to_string(),
                    metadata: json!({"scheduled_for": followup_at.to_rfc3339()}),
                },
            ]
        }
        PriorityTier::Cold => vec![
            PlannedAction {
                action_type: "mark_low_priority",
                message: "Moved to low-priority queue".to_string(),
                metadata: json!({}),
            },
            PlannedAction {
                action_type: "add_to_nurture_campaign",
                message: "Added to nurture drip campaign".to_string(),
                metadata: json!({"campaign": "nurture"}),
            },
            PlannedAction {
                action_type: "add_to_broadcast_list",
                message: "Added to seasonal broadcast list".to_string(),
                metadata: json!({"list": "broadcast"}),
            },
        ],
    }
}

pub struct AutomationDispatcher {
    audit: Arc<dyn AuditLogStore>,
}

impl AutomationDispatcher {
    pub fn new(audit: Arc<dyn AuditLogStore>) -> Self {
        Self { audit }
    }

    /// Produces the action plan for a tier and appends each action to the
    /// audit trail. Logging is best-effort: an append failure downgrades the
    /// entry's status but never fails the dispatch.
    ///
    /// An unparsable priority string yields an empty plan.
    pub async fn dispatch(
        &self,
        lead_id: Uuid,
        priority: &str,
        score: i32,
    ) -> (Vec<String>, Vec<AutomationLogEntry>) {
        let Some(tier) = PriorityTier::parse(priority) else {
            tracing::warn!(
                "Unknown priority '{}' for lead {} - no actions dispatched",
                priority,
                lead_id
            );
            return (Vec::new(), Vec::new());
        };

        let plan = plan_actions(tier, score);
        let mut actions = Vec::with_capacity(plan.len());
        let mut log = Vec::with_capacity(plan.len());

        for action in plan {
            let mut entry = AutomationLogEntry {
                id: Uuid::new_v4(),
                lead_id,
                action_type: action.action_type.to_string(),
                status: "queued".to_string(),
                message: action.message,
                priority: tier.as_str().to_string(),
                metadata: action.metadata,
                created_at: Utc::now(),
            };

            match self.audit.append(&entry).await {
                Ok(()) => entry.status = "logged".to_string(),
                Err(e) => {
                    tracing::warn!(
                        "Failed to append audit log entry '{}' for lead {}: {}",
                        entry.action_type,
                        lead_id,
                        e
                    );
                    entry.status = "log_failed".to_string();
                }
            }

            actions.push(entry.action_type.clone());
            log.push(entry);
        }

        tracing::info!(
            "Dispatched {} automation action(s) for lead {} ({})",
            actions.len(),
            lead_id,
            tier.as_str()
        );

        (actions, log)
    }
}
