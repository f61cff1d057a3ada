//! In-memory pool state
//!
//! The single source of truth for proxy config, health, and usage. Selectors
//! read it, the health monitor and failure reports write it. The store is a
//! durable mirror only: a failed persistence write is logged and never
//! surfaced to callers.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::warn;

use crate::models::{ProxyConfig, ProxyHealth, ProxyUsage};
use crate::repository::ProxyStore;

/// Shared pool state: one config list plus health/usage maps keyed by proxy id
pub struct PoolState {
    // Sorted by id; round-robin determinism depends on a stable order.
    configs: Vec<ProxyConfig>,
    health: RwLock<HashMap<String, ProxyHealth>>,
    usage: RwLock<HashMap<String, ProxyUsage>>,
    store: Arc<dyn ProxyStore>,
}

impl PoolState {
    pub fn new(
        mut configs: Vec<ProxyConfig>,
        health: HashMap<String, ProxyHealth>,
        usage: HashMap<String, ProxyUsage>,
        store: Arc<dyn ProxyStore>,
    ) -> Self {
        configs.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            configs,
            health: RwLock::new(health),
            usage: RwLock::new(usage),
            store,
        }
    }

    /// All configured proxies, in stable id order
    pub fn active_configs(&self) -> &[ProxyConfig] {
        &self.configs
    }

    /// Whether a proxy id is part of the pool
    pub fn contains(&self, proxy_id: &str) -> bool {
        self.configs.iter().any(|p| p.id == proxy_id)
    }

    /// The subset a selection call may pick from: active, healthy (missing
    /// health data counts as healthy), and optionally country-matched.
    pub fn eligible_configs(&self, country_code: Option<&str>) -> Vec<ProxyConfig> {
        let health = self.health.read();
        self.configs
            .iter()
            .filter(|p| {
                let healthy = health.get(&p.id).map(|h| h.is_healthy).unwrap_or(true);
                let matches_country = country_code.map_or(true, |c| p.matches_country(c));
                p.is_active && healthy && matches_country
            })
            .cloned()
            .collect()
    }

    /// Health record for a proxy, synthesized as healthy-and-virgin if the
    /// proxy has never been probed
    pub fn health_of(&self, proxy_id: &str) -> ProxyHealth {
        self.health
            .read()
            .get(proxy_id)
            .cloned()
            .unwrap_or_else(|| ProxyHealth::for_proxy(proxy_id))
    }

    /// Usage record for a proxy, synthesized as zero-usage if absent
    pub fn usage_of(&self, proxy_id: &str) -> ProxyUsage {
        self.usage
            .read()
            .get(proxy_id)
            .cloned()
            .unwrap_or_else(|| ProxyUsage::for_proxy(proxy_id))
    }

    /// Snapshot of the stored health records, keyed by proxy id
    ///
    /// Performance weighting needs to distinguish "no record yet" from a
    /// recorded history, so this exposes the raw map rather than
    /// synthesizing defaults.
    pub fn health_records(&self) -> HashMap<String, ProxyHealth> {
        self.health.read().clone()
    }

    /// Apply one probe (or externally reported) result to a proxy's health
    /// record and mirror it to the store.
    ///
    /// The in-memory update is authoritative; a failed store write is
    /// logged and swallowed so persistence lag never degrades selection.
    pub async fn apply_health_result(
        &self,
        proxy_id: &str,
        succeeded: bool,
        latency_ms: f64,
        error: Option<String>,
    ) {
        let now = Utc::now();
        let record = {
            let mut health = self.health.write();
            let entry = health
                .entry(proxy_id.to_string())
                .or_insert_with(|| ProxyHealth::for_proxy(proxy_id));
            if succeeded {
                entry.record_success(latency_ms, now);
            } else {
                entry.record_failure(error.unwrap_or_else(|| "unknown error".to_string()), now);
            }
            entry.clone()
        };

        if let Err(e) = self.store.upsert_health(&record).await {
            warn!(proxy_id = %proxy_id, "Failed to persist health record: {}", e);
        }
    }

    /// Record one served selection for a proxy and mirror it to the store
    pub async fn apply_usage(&self, proxy_id: &str) {
        let now = Utc::now();
        {
            let mut usage = self.usage.write();
            usage
                .entry(proxy_id.to_string())
                .or_insert_with(|| ProxyUsage::for_proxy(proxy_id))
                .record_selection(now);
        }

        if let Err(e) = self.store.record_usage(proxy_id, now).await {
            warn!(proxy_id = %proxy_id, "Failed to persist usage record: {}", e);
        }
    }
}
