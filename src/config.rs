use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Shared secret for the ad-platform webhook (X-Webhook-Token header).
    /// When unset, webhook authentication is skipped.
    pub webhook_secret: Option<String>,
    /// TTL in seconds for the cached active-rule sets.
    pub rule_cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DB_URL")
                .or_else(|_| std::env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DB_URL or DATABASE_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DB_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: parse_port(&std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()))?,
            webhook_secret: std::env::var("WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            rule_cache_ttl_secs: std::env::var("RULE_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RULE_CACHE_TTL_SECS must be a valid number"))?,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            &config.database_url[..20.min(config.database_url.len())]
        );
        tracing::debug!("Server Port: {}", config.port);
        if config.webhook_secret.is_none() {
            tracing::warn!("WEBHOOK_SECRET not set - ad-platform webhook runs unauthenticated");
        }
        tracing::debug!("Rule cache TTL: {}s", config.rule_cache_ttl_secs);

        Ok(config)
    }
}

/// Port 0 parses as a u16 but is not a bindable server port.
fn parse_port(s: &str) -> anyhow::Result<u16> {
    let port: u16 = s
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;
    if port == 0 {
        anyhow::bail!("PORT must be a valid number between 1-65535");
    }
    Ok(port)
}
