//! Test fixtures shared by the pool test suites

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{CarouselError, Result};
use crate::models::{ProxyConfig, ProxyHealth, ProxyUsage};
use crate::repository::ProxyStore;

/// Build a healthy, active test proxy config
pub(crate) fn config(id: &str, country_code: Option<&str>) -> ProxyConfig {
    ProxyConfig {
        id: id.to_string(),
        name: format!("Test proxy {}", id),
        provider: "surfshark".to_string(),
        host: format!("vpn-proxy-{}", id),
        port: 1080,
        location: None,
        country_code: country_code.map(|c| c.to_string()),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// In-memory [`ProxyStore`] for exercising the pool without a database
pub(crate) struct MemoryStore {
    configs: Mutex<Vec<ProxyConfig>>,
    health: Mutex<HashMap<String, ProxyHealth>>,
    usage: Mutex<HashMap<String, ProxyUsage>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub(crate) fn new(configs: Vec<ProxyConfig>) -> Self {
        Self {
            configs: Mutex::new(configs),
            health: Mutex::new(HashMap::new()),
            usage: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail, simulating a dead database
    pub(crate) fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::Relaxed);
    }

    pub(crate) fn health_record(&self, proxy_id: &str) -> Option<ProxyHealth> {
        self.health.lock().get(proxy_id).cloned()
    }

    pub(crate) fn usage_count(&self, proxy_id: &str) -> i64 {
        self.usage
            .lock()
            .get(proxy_id)
            .map(|u| u.usage_count)
            .unwrap_or(0)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            Err(CarouselError::DatabaseConnection(
                "injected write failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ProxyStore for MemoryStore {
    async fn load_active_configs(&self) -> Result<Vec<ProxyConfig>> {
        let mut configs: Vec<ProxyConfig> = self
            .configs
            .lock()
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        configs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(configs)
    }

    async fn load_all_health(&self) -> Result<HashMap<String, ProxyHealth>> {
        Ok(self.health.lock().clone())
    }

    async fn load_all_usage(&self) -> Result<HashMap<String, ProxyUsage>> {
        Ok(self.usage.lock().clone())
    }

    async fn upsert_health(&self, health: &ProxyHealth) -> Result<()> {
        self.check_writable()?;
        self.health
            .lock()
            .insert(health.proxy_id.clone(), health.clone());
        Ok(())
    }

    async fn record_usage(&self, proxy_id: &str, used_at: DateTime<Utc>) -> Result<()> {
        self.check_writable()?;
        let mut usage = self.usage.lock();
        let entry = usage
            .entry(proxy_id.to_string())
            .or_insert_with(|| ProxyUsage::for_proxy(proxy_id));
        entry.usage_count += 1;
        entry.last_used_at = used_at;
        Ok(())
    }
}
