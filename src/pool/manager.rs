//! Pool manager facade
//!
//! The single entry point the route layer talks to: select a proxy, report
//! stats, report an externally observed failure.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{CarouselError, Result};
use crate::models::{ProxyStats, SelectedProxy};
use crate::repository::ProxyStore;

use super::rotation::{RotationStrategy, Selector};
use super::state::PoolState;

/// Facade over the pool state and the rotation strategies
pub struct ProxyPool {
    state: Arc<PoolState>,
    selector: Selector,
}

impl ProxyPool {
    /// Load configs, health, and usage from the store into a fresh pool
    ///
    /// The caller is expected to run one synchronous probe cycle before
    /// serving selections (see [`crate::pool::HealthMonitor::run_cycle`]).
    pub async fn initialize(store: Arc<dyn ProxyStore>) -> Result<Self> {
        let configs = store.load_active_configs().await?;
        let health = store.load_all_health().await?;
        let usage = store.load_all_usage().await?;

        info!("Loaded {} active proxies", configs.len());

        let state = Arc::new(PoolState::new(configs, health, usage, store));
        Ok(Self {
            state,
            selector: Selector::new(),
        })
    }

    /// The shared pool state, for wiring up the health monitor
    pub fn state(&self) -> Arc<PoolState> {
        self.state.clone()
    }

    /// Select one proxy according to the strategy, recording its usage
    ///
    /// Every successful selection counts as usage for the returned proxy,
    /// including location-fallback picks.
    pub async fn select_proxy(
        &self,
        strategy: RotationStrategy,
        country_code: Option<&str>,
    ) -> Result<SelectedProxy> {
        // Location narrows the country itself so it can fall back to the
        // full healthy set; the other strategies get a pre-filtered set.
        let eligibility_filter = match strategy {
            RotationStrategy::Location => None,
            _ => country_code,
        };

        let eligible = self.state.eligible_configs(eligibility_filter);
        if eligible.is_empty() {
            warn!(
                strategy = %strategy,
                country = country_code.unwrap_or("-"),
                "No healthy proxies available"
            );
            return Err(CarouselError::NoHealthyProxy);
        }

        let healths = self.state.health_records();
        let chosen = self
            .selector
            .select(strategy, &eligible, &healths, country_code)
            .ok_or(CarouselError::NoHealthyProxy)?;

        self.state.apply_usage(&chosen.id).await;

        debug!(proxy_id = %chosen.id, strategy = %strategy, "Selected proxy");

        Ok(SelectedProxy {
            url: chosen.socks_url(),
            proxy: chosen,
        })
    }

    /// Config, health, and usage for every proxy, in stable config order
    pub fn stats(&self) -> Vec<ProxyStats> {
        self.state
            .active_configs()
            .iter()
            .map(|config| ProxyStats {
                proxy: config.clone(),
                health: self.state.health_of(&config.id),
                usage: self.state.usage_of(&config.id),
            })
            .collect()
    }

    /// How many proxies currently count as healthy
    pub fn healthy_count(&self) -> usize {
        self.state.eligible_configs(None).len()
    }

    /// Mark a proxy unhealthy on behalf of a caller that used it and saw it
    /// fail, without waiting for the next probe cycle
    ///
    /// Goes through the same path as a failed probe, so the failure counts
    /// in the proxy's history.
    pub async fn report_failure(&self, proxy_id: &str, error: &str) -> Result<()> {
        if !self.state.contains(proxy_id) {
            return Err(CarouselError::ProxyNotFound {
                id: proxy_id.to_string(),
            });
        }

        info!(proxy_id = %proxy_id, "Proxy failure reported externally: {}", error);
        self.state
            .apply_health_result(proxy_id, false, 0.0, Some(error.to_string()))
            .await;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::testing::{self, MemoryStore};

    async fn pool_with(configs: Vec<crate::models::ProxyConfig>) -> ProxyPool {
        let store = Arc::new(MemoryStore::new(configs));
        ProxyPool::initialize(store).await.unwrap()
    }

    /// A mixed pool: one healthy NL proxy, one unhealthy NL proxy, one healthy DE proxy
    async fn scenario_pool() -> ProxyPool {
        let pool = pool_with(vec![
            testing::config("a-nl", Some("NL")),
            testing::config("b-nl", Some("NL")),
            testing::config("c-de", Some("DE")),
        ])
        .await;
        pool.state
            .apply_health_result("b-nl", false, 0.0, Some("tunnel down".to_string()))
            .await;
        pool
    }

    const ALL_STRATEGIES: [RotationStrategy; 4] = [
        RotationStrategy::RoundRobin,
        RotationStrategy::Random,
        RotationStrategy::Performance,
        RotationStrategy::Location,
    ];

    #[tokio::test]
    async fn test_empty_pool_yields_no_healthy_proxy() {
        let pool = pool_with(Vec::new()).await;

        for strategy in ALL_STRATEGIES {
            let err = pool.select_proxy(strategy, None).await.unwrap_err();
            assert!(matches!(err, CarouselError::NoHealthyProxy));
        }
    }

    #[tokio::test]
    async fn test_unhealthy_and_inactive_proxies_are_never_selected() {
        let pool = scenario_pool().await;

        for strategy in ALL_STRATEGIES {
            for country in [None, Some("NL"), Some("DE")] {
                for _ in 0..20 {
                    match pool.select_proxy(strategy, country).await {
                        Ok(selected) => assert_ne!(selected.proxy.id, "b-nl"),
                        Err(CarouselError::NoHealthyProxy) => {}
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_round_robin_alternates_in_config_order() {
        let pool = scenario_pool().await;

        // B is excluded, so the cycle is a-nl, c-de, a-nl, c-de.
        let picks: Vec<String> = {
            let mut picks = Vec::new();
            for _ in 0..4 {
                picks.push(
                    pool.select_proxy(RotationStrategy::RoundRobin, None)
                        .await
                        .unwrap()
                        .proxy
                        .id,
                );
            }
            picks
        };
        assert_eq!(picks, vec!["a-nl", "c-de", "a-nl", "c-de"]);
    }

    #[tokio::test]
    async fn test_round_robin_visits_each_eligible_once_per_cycle() {
        let pool = pool_with(vec![
            testing::config("a", None),
            testing::config("b", None),
            testing::config("c", None),
        ])
        .await;

        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            let selected = pool
                .select_proxy(RotationStrategy::RoundRobin, None)
                .await
                .unwrap();
            seen.insert(selected.proxy.id);
        }
        assert_eq!(seen.len(), 3);
    }

    #[tokio::test]
    async fn test_location_always_picks_the_healthy_country_match() {
        let pool = scenario_pool().await;

        for _ in 0..20 {
            let selected = pool
                .select_proxy(RotationStrategy::Location, Some("NL"))
                .await
                .unwrap();
            assert_eq!(selected.proxy.id, "a-nl");
        }
    }

    #[tokio::test]
    async fn test_location_falls_back_when_country_matches_nothing() {
        let pool = scenario_pool().await;

        // No US proxies; the fallback draws from the full healthy set.
        for _ in 0..20 {
            let selected = pool
                .select_proxy(RotationStrategy::Location, Some("US"))
                .await
                .unwrap();
            assert!(["a-nl", "c-de"].contains(&selected.proxy.id.as_str()));
        }
    }

    #[tokio::test]
    async fn test_selection_url_format() {
        let pool = pool_with(vec![testing::config("a", None)]).await;

        let selected = pool
            .select_proxy(RotationStrategy::Random, None)
            .await
            .unwrap();
        assert_eq!(selected.url, "socks5://vpn-proxy-a:1080");
    }

    #[tokio::test]
    async fn test_selection_records_usage_including_fallback_picks() {
        let pool = pool_with(vec![testing::config("a-nl", Some("NL"))]).await;

        pool.select_proxy(RotationStrategy::Location, Some("US"))
            .await
            .unwrap();
        pool.select_proxy(RotationStrategy::RoundRobin, None)
            .await
            .unwrap();

        let stats = pool.stats();
        assert_eq!(stats[0].usage.usage_count, 2);
    }

    #[tokio::test]
    async fn test_report_failure_takes_effect_immediately() {
        let pool = pool_with(vec![testing::config("a", None), testing::config("b", None)]).await;

        pool.report_failure("a", "connection reset by peer")
            .await
            .unwrap();

        for _ in 0..20 {
            let selected = pool
                .select_proxy(RotationStrategy::Random, None)
                .await
                .unwrap();
            assert_eq!(selected.proxy.id, "b");
        }

        let health = pool.state.health_of("a");
        assert!(!health.is_healthy);
        assert_eq!(health.failure_count, 1);
        assert_eq!(
            health.last_error.as_deref(),
            Some("connection reset by peer")
        );
    }

    #[tokio::test]
    async fn test_report_failure_unknown_proxy() {
        let pool = pool_with(vec![testing::config("a", None)]).await;

        let err = pool.report_failure("ghost", "whatever").await.unwrap_err();
        assert!(matches!(err, CarouselError::ProxyNotFound { id } if id == "ghost"));
    }

    #[tokio::test]
    async fn test_stats_report_in_config_order_with_synthesized_records() {
        let pool = pool_with(vec![
            testing::config("b", None),
            testing::config("a", None),
        ])
        .await;
        pool.state.apply_health_result("a", true, 42.0, None).await;

        let stats = pool.stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].proxy.id, "a");
        assert_eq!(stats[0].health.success_count, 1);

        // b has never been probed or used; records are synthesized.
        assert_eq!(stats[1].proxy.id, "b");
        assert!(stats[1].health.is_healthy);
        assert_eq!(stats[1].usage.usage_count, 0);

        assert_eq!(pool.healthy_count(), 2);
    }
}
