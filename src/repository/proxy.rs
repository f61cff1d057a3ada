//! Durable store for proxy configs, health records, and usage counters
//!
//! The pool holds the authoritative in-memory state; this layer is its
//! durable mirror. Reads happen once at startup, writes on every probe
//! result and selection.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{ProxyConfig, ProxyHealth, ProxyUsage};

/// Persistence contract the pool depends on
///
/// Kept as a trait so the core can be exercised against an in-memory
/// implementation without a running database.
#[async_trait]
pub trait ProxyStore: Send + Sync {
    /// Load all active proxy configs, ordered by id
    async fn load_active_configs(&self) -> Result<Vec<ProxyConfig>>;

    /// Load every persisted health record, keyed by proxy id
    async fn load_all_health(&self) -> Result<HashMap<String, ProxyHealth>>;

    /// Load every persisted usage record, keyed by proxy id
    async fn load_all_usage(&self) -> Result<HashMap<String, ProxyUsage>>;

    /// Write the full health record for one proxy
    async fn upsert_health(&self, health: &ProxyHealth) -> Result<()>;

    /// Atomically increment the persisted usage counter for one proxy
    async fn record_usage(&self, proxy_id: &str, used_at: DateTime<Utc>) -> Result<()>;
}

/// Repository for proxy database operations
#[derive(Clone)]
pub struct ProxyRepository {
    pool: PgPool,
}

impl ProxyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProxyStore for ProxyRepository {
    async fn load_active_configs(&self) -> Result<Vec<ProxyConfig>> {
        let configs = sqlx::query_as::<_, ProxyConfig>(
            r#"
            SELECT id, name, provider, host, port, location, country_code,
                   is_active, created_at, updated_at
            FROM proxy_configs
            WHERE is_active = true
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(configs)
    }

    async fn load_all_health(&self) -> Result<HashMap<String, ProxyHealth>> {
        let records = sqlx::query_as::<_, ProxyHealth>(
            r#"
            SELECT proxy_id, is_healthy, last_check_time, success_count,
                   failure_count, avg_response_time, last_error
            FROM proxy_health
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|h| (h.proxy_id.clone(), h))
            .collect())
    }

    async fn load_all_usage(&self) -> Result<HashMap<String, ProxyUsage>> {
        let records = sqlx::query_as::<_, ProxyUsage>(
            r#"
            SELECT proxy_id, usage_count, last_used_at, total_bytes, errors
            FROM proxy_usage
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|u| (u.proxy_id.clone(), u))
            .collect())
    }

    async fn upsert_health(&self, health: &ProxyHealth) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO proxy_health
                (proxy_id, is_healthy, last_check_time, success_count,
                 failure_count, avg_response_time, last_error)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (proxy_id) DO UPDATE SET
                is_healthy = $2,
                last_check_time = $3,
                success_count = $4,
                failure_count = $5,
                avg_response_time = $6,
                last_error = $7
            "#,
        )
        .bind(&health.proxy_id)
        .bind(health.is_healthy)
        .bind(health.last_check_time)
        .bind(health.success_count)
        .bind(health.failure_count)
        .bind(health.avg_response_time)
        .bind(&health.last_error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_usage(&self, proxy_id: &str, used_at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO proxy_usage (proxy_id, usage_count, last_used_at)
            VALUES ($1, 1, $2)
            ON CONFLICT (proxy_id) DO UPDATE SET
                usage_count = proxy_usage.usage_count + 1,
                last_used_at = $2
            "#,
        )
        .bind(proxy_id)
        .bind(used_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
