//! Performance-weighted proxy selection
//!
//! Proxies are weighted by success rate scaled against response time, with
//! a floor so a struggling proxy keeps a small chance to prove itself
//! again. Selection is a weighted random draw via cumulative-weight scan.

use std::collections::HashMap;

use rand::Rng;

use crate::models::{ProxyConfig, ProxyHealth};

/// Floor weight; keeps every eligible proxy selectable
const MIN_WEIGHT: f64 = 0.1;

/// Weight for one proxy given its recorded health, if any
///
/// A proxy with no recorded history weighs 1.0.
fn weight(health: Option<&ProxyHealth>) -> f64 {
    let Some(health) = health else {
        return 1.0;
    };

    let score = health.success_rate() * (1000.0 / health.avg_response_time.max(1.0));
    score.max(MIN_WEIGHT)
}

/// Pick one proxy by weighted random draw
pub fn select<'a>(
    eligible: &'a [ProxyConfig],
    healths: &HashMap<String, ProxyHealth>,
) -> Option<&'a ProxyConfig> {
    if eligible.is_empty() {
        return None;
    }

    let weights: Vec<f64> = eligible
        .iter()
        .map(|p| weight(healths.get(&p.id)))
        .collect();
    let total_weight: f64 = weights.iter().sum();

    let mut draw = rand::thread_rng().gen::<f64>() * total_weight;
    for (proxy, w) in eligible.iter().zip(&weights) {
        draw -= w;
        if draw <= 0.0 {
            return Some(proxy);
        }
    }

    // Floating-point drift can leave a sliver of the draw unconsumed.
    eligible.last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::testing;

    fn health_with(id: &str, successes: i64, failures: i64, avg_ms: f64) -> ProxyHealth {
        let mut health = ProxyHealth::for_proxy(id);
        health.success_count = successes;
        health.failure_count = failures;
        health.avg_response_time = avg_ms;
        health
    }

    #[test]
    fn test_weight_defaults_to_one_without_record() {
        assert_eq!(weight(None), 1.0);
    }

    #[test]
    fn test_weight_floor_for_failing_proxy() {
        let health = health_with("p", 0, 10, 0.0);
        assert_eq!(weight(Some(&health)), MIN_WEIGHT);
    }

    #[test]
    fn test_weight_scales_with_latency_and_success_rate() {
        let fast = health_with("fast", 10, 0, 100.0);
        let slow = health_with("slow", 10, 0, 1000.0);
        assert!(weight(Some(&fast)) > weight(Some(&slow)));

        // 100% success at 1000ms: 1.0 * (1000 / 1000) = 1.0
        assert!((weight(Some(&slow)) - 1.0).abs() < 1e-9);

        let flaky = health_with("flaky", 5, 5, 100.0);
        assert!(weight(Some(&flaky)) < weight(Some(&fast)));
    }

    #[test]
    fn test_empty_returns_none() {
        assert!(select(&[], &HashMap::new()).is_none());
    }

    #[test]
    fn test_failing_proxy_is_selected_a_nonzero_minority_of_draws() {
        let eligible = vec![testing::config("good", None), testing::config("bad", None)];
        let mut healths = HashMap::new();
        healths.insert("good".to_string(), health_with("good", 100, 0, 100.0));
        healths.insert("bad".to_string(), health_with("bad", 0, 100, 0.0));

        let draws = 2000;
        let mut bad_picks = 0;
        for _ in 0..draws {
            if select(&eligible, &healths).unwrap().id == "bad" {
                bad_picks += 1;
            }
        }

        // Weight 10.0 vs 0.1: roughly 1% of draws, never zero in
        // expectation, never close to parity.
        assert!(bad_picks > 0, "floor weight must keep the proxy selectable");
        assert!(
            bad_picks < draws / 4,
            "failing proxy picked {} of {} draws",
            bad_picks,
            draws
        );
    }

    #[test]
    fn test_virgin_record_is_not_starved() {
        // One proxy has history, the other none at all.
        let eligible = vec![
            testing::config("seasoned", None),
            testing::config("fresh", None),
        ];
        let mut healths = HashMap::new();
        healths.insert(
            "seasoned".to_string(),
            health_with("seasoned", 50, 0, 1000.0),
        );

        let mut fresh_picks = 0;
        for _ in 0..1000 {
            if select(&eligible, &healths).unwrap().id == "fresh" {
                fresh_picks += 1;
            }
        }

        // Both weigh 1.0 here; the fresh proxy should take a fair share.
        assert!(fresh_picks > 300, "fresh proxy picked only {}", fresh_picks);
    }
}
