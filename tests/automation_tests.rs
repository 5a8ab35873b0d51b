/// Dispatcher tests over an in-memory audit trail: plan sizes per tier,
/// best-effort logging, and the empty plan for unknown priorities.
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::Arc;
use travloger_scoring_api::automation::AutomationDispatcher;
use travloger_scoring_api::errors::AppError;
use travloger_scoring_api::models::AutomationLogEntry;
use travloger_scoring_api::store::AuditLogStore;
use uuid::Uuid;

#[derive(Default)]
struct InMemoryAuditStore {
    entries: Mutex<Vec<AutomationLogEntry>>,
    fail_appends: bool,
}

impl InMemoryAuditStore {
    fn recording() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(Vec::new()),
            fail_appends: true,
        })
    }

    fn recorded(&self) -> Vec<AutomationLogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogStore for InMemoryAuditStore {
    async fn append(&self, entry: &AutomationLogEntry) -> Result<(), AppError> {
        if self.fail_appends {
            return Err(AppError::InternalError(
                "audit trail unavailable".to_string(),
            ));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn recent_for_lead(
        &self,
        lead_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AutomationLogEntry>, AppError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.lead_id == lead_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[tokio::test]
async fn hot_dispatch_logs_four_actions() {
    let audit = InMemoryAuditStore::recording();
    let dispatcher = AutomationDispatcher::new(audit.clone());
    let lead_id = Uuid::new_v4();

    let (actions, log) = dispatcher.dispatch(lead_id, "Hot", 45).await;

    assert_eq!(
        actions,
        vec![
            "send_instant_message",
            "send_summary_email",
            "notify_consultant",
            "create_immediate_task"
        ]
    );
    assert!(log.iter().all(|e| e.status == "logged"));
    assert!(log.iter().all(|e| e.priority == "Hot"));

    let recorded = audit.recorded();
    assert_eq!(recorded.len(), 4);
    assert!(recorded.iter().all(|e| e.lead_id == lead_id));
}

#[tokio::test]
async fn warm_dispatch_logs_two_scheduled_actions() {
    let audit = InMemoryAuditStore::recording();
    let dispatcher = AutomationDispatcher::new(audit.clone());

    let (actions, log) = dispatcher.dispatch(Uuid::new_v4(), "warm", 30).await;

    assert_eq!(actions, vec!["schedule_reminder", "schedule_followup_task"]);
    assert!(log
        .iter()
        .all(|e| e.metadata.get("scheduled_for").is_some()));
}

#[tokio::test]
async fn cold_dispatch_logs_three_markers() {
    let audit = InMemoryAuditStore::recording();
    let dispatcher = AutomationDispatcher::new(audit.clone());

    let (actions, _) = dispatcher.dispatch(Uuid::new_v4(), "Cold", 5).await;

    assert_eq!(
        actions,
        vec![
            "mark_low_priority",
            "add_to_nurture_campaign",
            "add_to_broadcast_list"
        ]
    );
    assert_eq!(audit.recorded().len(), 3);
}

#[tokio::test]
async fn unknown_priority_dispatches_nothing() {
    let audit = InMemoryAuditStore::recording();
    let dispatcher = AutomationDispatcher::new(audit.clone());

    let (actions, log) = dispatcher.dispatch(Uuid::new_v4(), "Lukewarm", 30).await;

    assert!(actions.is_empty());
    assert!(log.is_empty());
    assert!(audit.recorded().is_empty());
}

#[tokio::test]
async fn audit_failure_downgrades_status_but_keeps_the_actions() {
    let audit = InMemoryAuditStore::failing();
    let dispatcher = AutomationDispatcher::new(audit);

    let (actions, log) = dispatcher.dispatch(Uuid::new_v4(), "Hot", 50).await;

    assert_eq!(actions.len(), 4);
    assert!(log.iter().all(|e| e.status == "log_failed"));
}
