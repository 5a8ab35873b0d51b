use sqlx::{postgres::PgPoolOptions, PgPool};

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        ensure_schema(&pool).await?;

        Ok(Self { pool })
    }
}

/// Creates the subsystem's tables when missing.
///
/// Runs once at startup so handlers can assume the schema exists.
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scoring_rules (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            criteria_name TEXT NOT NULL,
            field_checked TEXT NOT NULL,
            condition_type TEXT NOT NULL,
            condition_value TEXT NOT NULL DEFAULT '',
            score_value INTEGER NOT NULL DEFAULT 0,
            lead_type TEXT,
            automation_trigger TEXT NOT NULL DEFAULT 'both',
            hot_threshold INTEGER NOT NULL DEFAULT 40,
            warm_min INTEGER NOT NULL DEFAULT 25,
            warm_max INTEGER NOT NULL DEFAULT 39,
            cold_max INTEGER NOT NULL DEFAULT 24,
            status TEXT NOT NULL DEFAULT 'active',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            full_name TEXT,
            lead_type TEXT,
            fields JSONB NOT NULL DEFAULT '{}'::jsonb,
            lead_score INTEGER,
            lead_priority TEXT,
            last_score_calculated TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS automation_logs (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            lead_id UUID NOT NULL,
            action_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued',
            message TEXT NOT NULL DEFAULT '',
            priority TEXT NOT NULL,
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ad_platform_leads (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            platform_lead_id TEXT NOT NULL UNIQUE,
            lead_id UUID,
            campaign_id TEXT,
            form_id TEXT,
            payload_raw JSONB NOT NULL,
            scoring_status TEXT NOT NULL DEFAULT 'pending',
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database schema ensured");
    Ok(())
}
