//! Proxy rotation strategies
//!
//! Stateless algorithms over the eligible subset of the pool. The only
//! cross-call state is the round-robin cursor, owned by [`Selector`] and
//! shared by every caller for the process lifetime.

mod location;
mod performance;
mod random;
mod round_robin;

use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;

use crate::models::{ProxyConfig, ProxyHealth};

/// Strategy types for proxy rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationStrategy {
    #[default]
    RoundRobin,
    Random,
    Performance,
    Location,
}

impl RotationStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "round-robin" | "round_robin" | "roundrobin" => Some(Self::RoundRobin),
            "random" => Some(Self::Random),
            "performance" => Some(Self::Performance),
            "location" => Some(Self::Location),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoundRobin => "round-robin",
            Self::Random => "random",
            Self::Performance => "performance",
            Self::Location => "location",
        }
    }
}

impl std::fmt::Display for RotationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Dispatches selection calls to the strategy algorithms
pub struct Selector {
    // One cursor across all callers; round-robin sequences must not restart
    // per request handler.
    cursor: AtomicUsize,
}

impl Selector {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }

    /// Pick one proxy from the eligible set
    ///
    /// `healths` is the raw record snapshot: proxies without a record weigh
    /// 1.0 under the performance strategy. `country_code` only matters to
    /// the location strategy; the other strategies receive an eligible set
    /// that is already country-filtered.
    pub fn select(
        &self,
        strategy: RotationStrategy,
        eligible: &[ProxyConfig],
        healths: &HashMap<String, ProxyHealth>,
        country_code: Option<&str>,
    ) -> Option<ProxyConfig> {
        match strategy {
            RotationStrategy::RoundRobin => round_robin::select(&self.cursor, eligible),
            RotationStrategy::Random => random::select(eligible),
            RotationStrategy::Performance => performance::select(eligible, healths),
            RotationStrategy::Location => location::select(eligible, country_code),
        }
        .cloned()
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}
