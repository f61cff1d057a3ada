//! Periodic health monitoring
//!
//! Probes every proxy in the pool on a fixed interval and feeds the results
//! back into [`PoolState`]. Probe cycles never overlap: the loop awaits a
//! full pass before the next tick, so a proxy's probe always completes
//! before its next one begins.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{info, instrument};

use super::prober::HealthProber;
use super::state::PoolState;

/// Health monitor configuration
#[derive(Clone)]
pub struct MonitorConfig {
    /// Interval between probe cycles
    pub probe_interval: Duration,
    /// How many proxies are probed concurrently within one cycle
    pub workers: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_interval: Duration::from_secs(60),
            workers: 4,
        }
    }
}

/// Drives the probe cycle over the whole pool
pub struct HealthMonitor {
    state: Arc<PoolState>,
    prober: HealthProber,
    config: MonitorConfig,
}

impl HealthMonitor {
    pub fn new(state: Arc<PoolState>, prober: HealthProber, config: MonitorConfig) -> Self {
        Self {
            state,
            prober,
            config,
        }
    }

    /// Run the monitor loop (call in a spawned task)
    ///
    /// Assumes the caller already ran one synchronous [`run_cycle`] pass at
    /// startup, so the interval's immediate first tick is skipped.
    ///
    /// [`run_cycle`]: HealthMonitor::run_cycle
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting health monitor with {}s interval",
            self.config.probe_interval.as_secs()
        );

        let mut ticker = interval(self.config.probe_interval);
        ticker.tick().await; // The startup pass already ran.

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Health monitor shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Probe every proxy currently in the pool once
    pub async fn run_cycle(&self) {
        let proxies = self.state.active_configs().to_vec();
        info!("Probing {} proxies", proxies.len());

        let results = futures::stream::iter(proxies)
            .map(|proxy| async move {
                let outcome = self.prober.probe(&proxy).await;
                self.state
                    .apply_health_result(
                        &proxy.id,
                        outcome.healthy,
                        outcome.latency_ms,
                        outcome.error,
                    )
                    .await;
                outcome.healthy
            })
            .buffer_unordered(self.config.workers.max(1))
            .collect::<Vec<bool>>()
            .await;

        let healthy = results.iter().filter(|&&v| v).count();
        info!(
            "Probe cycle complete: {} healthy, {} unhealthy",
            healthy,
            results.len().saturating_sub(healthy)
        );
    }
}

/// Handle for stopping the health monitor
pub struct MonitorHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl MonitorHandle {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { shutdown_tx: tx }, rx)
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Default for MonitorHandle {
    fn default() -> Self {
        Self::new().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::prober::ProberConfig;
    use crate::pool::testing::{self, MemoryStore};
    use std::collections::HashMap;

    fn unreachable_proxy(id: &str) -> crate::models::ProxyConfig {
        let mut proxy = testing::config(id, None);
        proxy.host = "127.0.0.1".to_string();
        proxy.port = 9;
        proxy
    }

    #[tokio::test]
    async fn test_run_cycle_records_failures() {
        let configs = vec![unreachable_proxy("dead-1"), unreachable_proxy("dead-2")];
        let store = Arc::new(MemoryStore::new(configs.clone()));
        let state = Arc::new(PoolState::new(
            configs,
            HashMap::new(),
            HashMap::new(),
            store.clone(),
        ));

        let prober = HealthProber::new(&ProberConfig {
            check_url: "http://api.ipify.org/?format=json".to_string(),
            timeout: Duration::from_millis(500),
        });
        let monitor = HealthMonitor::new(
            state.clone(),
            prober,
            MonitorConfig {
                probe_interval: Duration::from_secs(60),
                workers: 2,
            },
        );

        monitor.run_cycle().await;

        for id in ["dead-1", "dead-2"] {
            let health = state.health_of(id);
            assert!(!health.is_healthy);
            assert_eq!(health.failure_count, 1);
            assert!(health.last_error.is_some());

            // The result reached the durable mirror too.
            assert!(!store.health_record(id).unwrap().is_healthy);
        }
    }

    #[tokio::test]
    async fn test_monitor_handle_shutdown_stops_run() {
        let store = Arc::new(MemoryStore::new(Vec::new()));
        let state = Arc::new(PoolState::new(
            Vec::new(),
            HashMap::new(),
            HashMap::new(),
            store,
        ));
        let monitor = HealthMonitor::new(
            state,
            HealthProber::new(&ProberConfig::default()),
            MonitorConfig::default(),
        );

        let (handle, shutdown_rx) = MonitorHandle::new();
        let task = tokio::spawn(async move {
            monitor.run(shutdown_rx).await;
        });

        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("monitor did not shut down")
            .unwrap();
    }
}
