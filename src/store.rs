//! Persistence seams for the scoring subsystem.
//!
//! The engine and dispatcher depend on these capability traits, not on the
//! pool. Production wires the Postgres implementations below; tests inject
//! in-memory stores.

use crate::cache_validator::ValidatedCacheEntry;
use crate::errors::AppError;
use crate::models::{
    AutomationLogEntry, AutomationTrigger, CreateRuleRequest, Lead, LeadType, PriorityTier,
    RuleQueryParams, ScoringRule, UpdateRuleRequest,
};
use crate::webhook_models::AdLeadEvent;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Read/write access to scoring rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Active rules applicable to a lead segment and trigger, ordered by
    /// descending score value. Wildcard (NULL/empty lead_type) rules and
    /// `both`-trigger rules are always included.
    async fn load_active_rules(
        &self,
        lead_type: LeadType,
        trigger: AutomationTrigger,
    ) -> Result<Vec<ScoringRule>, AppError>;

    async fn list_rules(&self, params: &RuleQueryParams) -> Result<Vec<ScoringRule>, AppError>;

    async fn create_rule(&self, req: &CreateRuleRequest) -> Result<ScoringRule, AppError>;

    async fn update_rule(
        &self,
        id: Uuid,
        req: &UpdateRuleRequest,
    ) -> Result<ScoringRule, AppError>;

    /// Soft delete: flips status to inactive, never removes the row.
    async fn deactivate_rule(&self, id: Uuid) -> Result<(), AppError>;
}

/// The scorer's view of the lead collaborator subsystem.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError>;

    async fn create_lead(
        &self,
        full_name: Option<&str>,
        lead_type: Option<&str>,
        fields: Value,
    ) -> Result<Lead, AppError>;

    /// Overwrites the derived score cache on the lead row. Last writer wins;
    /// recomputation is idempotent so no mutual exclusion is needed.
    async fn save_score(
        &self,
        id: Uuid,
        score: i32,
        priority: PriorityTier,
        calculated_at: DateTime<Utc>,
    ) -> Result<(), AppError>;
}

/// Append-only automation audit trail.
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn append(&self, entry: &AutomationLogEntry) -> Result<(), AppError>;

    async fn recent_for_lead(
        &self,
        lead_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AutomationLogEntry>, AppError>;
}

/// Tracking records for ad-platform lead ingestion.
#[async_trait]
pub trait AdLeadStore: Send + Sync {
    /// True when the platform lead id was already ingested.
    async fn was_ingested(&self, platform_lead_id: &str) -> Result<bool, AppError>;

    /// Records an ingested event. Written before scoring so redeliveries
    /// dedupe even when scoring fails.
    async fn record_ingest(
        &self,
        event: &AdLeadEvent,
        lead_id: Uuid,
        payload_raw: Value,
    ) -> Result<(), AppError>;

    /// Updates the scoring status on the tracking record.
    async fn mark_scoring_status(
        &self,
        platform_lead_id: &str,
        status: &str,
    ) -> Result<(), AppError>;
}

// ============ Caching decorator ============

/// Read-through cache over a [`RuleStore`].
///
/// Rule sets are read on every calculation and change rarely, so
/// `load_active_rules` results are cached per (segment, trigger) with
/// checksum-validated entries. Any rule mutation drops the whole cache.
pub struct CachedRuleStore {
    inner: Arc<dyn RuleStore>,
    cache: moka::future::Cache<String, String>,
}

impl CachedRuleStore {
    pub fn new(inner: Arc<dyn RuleStore>, cache: moka::future::Cache<String, String>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl RuleStore for CachedRuleStore {
    async fn load_active_rules(
        &self,
        lead_type: LeadType,
        trigger: AutomationTrigger,
    ) -> Result<Vec<ScoringRule>, AppError> {
        let cache_key = format!("rules:{}:{}", lead_type.as_str(), trigger.as_str());

        if let Some(cached) = self.cache.get(&cache_key).await {
            if let Some(valid_data) = ValidatedCacheEntry::deserialize_and_validate(&cached) {
                if let Ok(rules) = serde_json::from_str::<Vec<ScoringRule>>(&valid_data) {
                    tracing::debug!("Rule cache HIT (validated) for {}", cache_key);
                    return Ok(rules);
                }
            } else {
                tracing::warn!("Rule cache validation failed for {}, reloading", cache_key);
            }
        }

        tracing::debug!("Rule cache MISS for {}", cache_key);
        let rules = self.inner.load_active_rules(lead_type, trigger).await?;

        if let Ok(json_str) = serde_json::to_string(&rules) {
            let entry = ValidatedCacheEntry::new(json_str);
            self.cache.insert(cache_key, entry.serialize()).await;
        }

        Ok(rules)
    }

    async fn list_rules(&self, params: &RuleQueryParams) -> Result<Vec<ScoringRule>, AppError> {
        self.inner.list_rules(params).await
    }

    async fn create_rule(&self, req: &CreateRuleRequest) -> Result<ScoringRule, AppError> {
        let rule = self.inner.create_rule(req).await?;
        self.cache.invalidate_all();
        Ok(rule)
    }

    async fn update_rule(
        &self,
        id: Uuid,
        req: &UpdateRuleRequest,
    ) -> Result<ScoringRule, AppError> {
        let rule = self.inner.update_rule(id, req).await?;
        self.cache.invalidate_all();
        Ok(rule)
    }

    async fn deactivate_rule(&self, id: Uuid) -> Result<(), AppError> {
        self.inner.deactivate_rule(id).await?;
        self.cache.invalidate_all();
        Ok(())
    }
}

// ============ Postgres implementations ============

pub struct PgRuleStore {
    pool: PgPool,
}

impl PgRuleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn load_active_rules(
        &self,
        lead_type: LeadType,
        trigger: AutomationTrigger,
    ) -> Result<Vec<ScoringRule>, AppError> {
        let rules = sqlx::query_as::<_, ScoringRule>(
            r#"
            SELECT * FROM scoring_rules
            WHERE status = 'active'
              AND (lead_type IS NULL OR lead_type = '' OR lower(lead_type) = lower($1))
              AND (automation_trigger = 'both' OR automation_trigger = $2)
            ORDER BY score_value DESC
            "#,
        )
        .bind(lead_type.as_str())
        .bind(trigger.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    async fn list_rules(&self, params: &RuleQueryParams) -> Result<Vec<ScoringRule>, AppError> {
        let rules = sqlx::query_as::<_, ScoringRule>(
            r#"
            SELECT * FROM scoring_rules
            WHERE ($1::text IS NULL OR lower(lead_type) = lower($1))
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(params.lead_type.as_deref())
        .bind(params.status.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rules)
    }

    async fn create_rule(&self, req: &CreateRuleRequest) -> Result<ScoringRule, AppError> {
        let rule = sqlx::query_as::<_, ScoringRule>(
            r#"
            INSERT INTO scoring_rules (
                criteria_name, field_checked, condition_type, condition_value,
                score_value, lead_type, automation_trigger,
                hot_threshold, warm_min, warm_max, cold_max, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'active')
            RETURNING *
            "#,
        )
        .bind(&req.criteria_name)
        .bind(&req.field_checked)
        .bind(&req.condition_type)
        .bind(&req.condition_value)
        .bind(req.score_value)
        .bind(req.lead_type.as_deref())
        .bind(req.automation_trigger.as_deref().unwrap_or("both"))
        .bind(req.hot_threshold.unwrap_or(40))
        .bind(req.warm_min.unwrap_or(25))
        .bind(req.warm_max.unwrap_or(39))
        .bind(req.cold_max.unwrap_or(24))
        .fetch_one(&self.pool)
        .await?;

        Ok(rule)
    }

    async fn update_rule(
        &self,
        id: Uuid,
        req: &UpdateRuleRequest,
    ) -> Result<ScoringRule, AppError> {
        // Absent fields keep their stored value; an empty lead_type string
        // clears the segment back to wildcard.
        let rule = sqlx::query_as::<_, ScoringRule>(
            r#"
            UPDATE scoring_rules SET
                criteria_name = COALESCE($2, criteria_name),
                field_checked = COALESCE($3, field_checked),
                condition_type = COALESCE($4, condition_type),
                condition_value = COALESCE($5, condition_value),
                score_value = COALESCE($6, score_value),
                lead_type = CASE
                    WHEN $7::text IS NULL THEN lead_type
                    WHEN $7 = '' THEN NULL
                    ELSE $7
                END,
                automation_trigger = COALESCE($8, automation_trigger),
                hot_threshold = COALESCE($9, hot_threshold),
                warm_min = COALESCE($10, warm_min),
                warm_max = COALESCE($11, warm_max),
                cold_max = COALESCE($12, cold_max),
                status = COALESCE($13, status),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(req.criteria_name.as_deref())
        .bind(req.field_checked.as_deref())
        .bind(req.condition_type.as_deref())
        .bind(req.condition_value.as_deref())
        .bind(req.score_value)
        .bind(req.lead_type.as_deref())
        .bind(req.automation_trigger.as_deref())
        .bind(req.hot_threshold)
        .bind(req.warm_min)
        .bind(req.warm_max)
        .bind(req.cold_max)
        .bind(req.status.as_deref())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Scoring rule {} not found", id)))?;

        Ok(rule)
    }

    async fn deactivate_rule(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE scoring_rules SET status = 'inactive', updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Scoring rule {} not found", id)));
        }
        Ok(())
    }
}

pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<_, Lead>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(lead)
    }

    async fn create_lead(
        &self,
        full_name: Option<&str>,
        lead_type: Option<&str>,
        fields: Value,
    ) -> Result<Lead, AppError> {
        let lead = sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (full_name, lead_type, fields)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(full_name)
        .bind(lead_type)
        .bind(fields)
        .fetch_one(&self.pool)
        .await?;

        Ok(lead)
    }

    async fn save_score(
        &self,
        id: Uuid,
        score: i32,
        priority: PriorityTier,
        calculated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET lead_score = $2, lead_priority = $3,
                last_score_calculated = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(score)
        .bind(priority.as_str())
        .bind(calculated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lead {} not found", id)));
        }
        Ok(())
    }
}

pub struct PgAuditLogStore {
    pool: PgPool,
}

impl PgAuditLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogStore for PgAuditLogStore {
    async fn append(&self, entry: &AutomationLogEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO automation_logs (
                id, lead_id, action_type, status, message, priority, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(entry.lead_id)
        .bind(&entry.action_type)
        .bind(&entry.status)
        .bind(&entry.message)
        .bind(&entry.priority)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_for_lead(
        &self,
        lead_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AutomationLogEntry>, AppError> {
        let entries = sqlx::query_as::<_, AutomationLogEntry>(
            r#"
            SELECT * FROM automation_logs
            WHERE lead_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(lead_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

pub struct PgAdLeadStore {
    pool: PgPool,
}

impl PgAdLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdLeadStore for PgAdLeadStore {
    async fn was_ingested(&self, platform_lead_id: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM ad_platform_leads WHERE platform_lead_id = $1)",
        )
        .bind(platform_lead_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn record_ingest(
        &self,
        event: &AdLeadEvent,
        lead_id: Uuid,
        payload_raw: Value,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO ad_platform_leads (
                platform_lead_id, lead_id, campaign_id, form_id, payload_raw, scoring_status
            )
            VALUES ($1, $2, $3, $4, $5, 'pending')
            "#,
        )
        .bind(&event.lead_id)
        .bind(lead_id)
        .bind(event.campaign_id.as_deref())
        .bind(event.form_id.as_deref())
        .bind(payload_raw)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_scoring_status(
        &self,
        platform_lead_id: &str,
        status: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE ad_platform_leads SET scoring_status = $2 WHERE platform_lead_id = $1",
        )
        .bind(platform_lead_id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
