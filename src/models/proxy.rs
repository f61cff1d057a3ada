use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// VPN provider fronting a proxy endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProvider {
    Surfshark,
    Nordvpn,
    Namecheap,
}

impl ProxyProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyProvider::Surfshark => "surfshark",
            ProxyProvider::Nordvpn => "nordvpn",
            ProxyProvider::Namecheap => "namecheap",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "surfshark" => Some(ProxyProvider::Surfshark),
            "nordvpn" => Some(ProxyProvider::Nordvpn),
            "namecheap" => Some(ProxyProvider::Namecheap),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProxyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static configuration of one upstream proxy endpoint
///
/// Immutable at runtime except `is_active`, which gates eligibility.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProxyConfig {
    pub id: String,
    pub name: String,
    pub provider: String, // Stored as string in DB; new providers need no migration
    pub host: String,
    pub port: i32,
    pub location: Option<String>,
    pub country_code: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProxyConfig {
    /// Get the provider enum, if this is a known provider
    pub fn provider_enum(&self) -> Option<ProxyProvider> {
        ProxyProvider::from_str(&self.provider)
    }

    /// The SOCKS5 URL handed to clients. The scheme string is contractual.
    pub fn socks_url(&self) -> String {
        format!("socks5://{}:{}", self.host, self.port)
    }

    /// Check whether this proxy serves the given country
    pub fn matches_country(&self, country_code: &str) -> bool {
        self.country_code.as_deref() == Some(country_code)
    }
}

/// Mutable health record for one proxy
///
/// `success_count` and `failure_count` only ever increase. The average
/// response time is a mean over successful probes only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProxyHealth {
    pub proxy_id: String,
    pub is_healthy: bool,
    pub last_check_time: DateTime<Utc>,
    pub success_count: i64,
    pub failure_count: i64,
    pub avg_response_time: f64,
    pub last_error: Option<String>,
}

impl ProxyHealth {
    /// Synthesize the record for a proxy that has never been probed.
    ///
    /// A proxy with no health data is assumed healthy so that fresh pools
    /// can serve selections before the first probe cycle reports back.
    pub fn for_proxy(proxy_id: impl Into<String>) -> Self {
        Self {
            proxy_id: proxy_id.into(),
            is_healthy: true,
            last_check_time: Utc::now(),
            success_count: 0,
            failure_count: 0,
            avg_response_time: 0.0,
            last_error: None,
        }
    }

    /// Record a successful probe with the measured latency in milliseconds.
    ///
    /// `last_error` is deliberately left in place: it means "last seen
    /// error", not "current error".
    pub fn record_success(&mut self, latency_ms: f64, now: DateTime<Utc>) {
        self.avg_response_time = (self.avg_response_time * self.success_count as f64 + latency_ms)
            / (self.success_count + 1) as f64;
        self.success_count += 1;
        self.is_healthy = true;
        self.last_check_time = now;
    }

    /// Record a failed probe. The response-time average covers successful
    /// probes only and is not touched here.
    pub fn record_failure(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.failure_count += 1;
        self.is_healthy = false;
        self.last_error = Some(error.into());
        self.last_check_time = now;
    }

    /// Fraction of probes that succeeded, 0.0 with no samples
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            0.0
        } else {
            self.success_count as f64 / total as f64
        }
    }
}

/// Mutable usage record for one proxy
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProxyUsage {
    pub proxy_id: String,
    pub usage_count: i64,
    pub last_used_at: DateTime<Utc>,
    pub total_bytes: i64,
    // Reserved for request-path accounting; the selection path never writes it.
    pub errors: i64,
}

impl ProxyUsage {
    /// Synthesize the record for a proxy that has never been selected
    pub fn for_proxy(proxy_id: impl Into<String>) -> Self {
        Self {
            proxy_id: proxy_id.into(),
            usage_count: 0,
            last_used_at: Utc::now(),
            total_bytes: 0,
            errors: 0,
        }
    }

    /// Record one served selection
    pub fn record_selection(&mut self, now: DateTime<Utc>) {
        self.usage_count += 1;
        self.last_used_at = now;
    }
}

/// Config, health, and usage for one proxy, as reported by the stats API
#[derive(Debug, Clone, Serialize)]
pub struct ProxyStats {
    pub proxy: ProxyConfig,
    pub health: ProxyHealth,
    pub usage: ProxyUsage,
}

/// Result of a selection call: the client-facing URL plus the chosen config
#[derive(Debug, Clone, Serialize)]
pub struct SelectedProxy {
    pub url: String,
    pub proxy: ProxyConfig,
}
