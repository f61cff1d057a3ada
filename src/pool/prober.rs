//! Health probing for upstream proxies
//!
//! One probe dials the proxy as a SOCKS5 endpoint, tunnels to a stable
//! "what is my IP" endpoint, and issues a single HTTP GET. Timeouts,
//! connect failures, bad status lines, and malformed payloads all collapse
//! into one unhealthy outcome with a short message; nothing is retried
//! within a probe and nothing escapes as an error.

use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use tokio_socks::tcp::Socks5Stream;
use tracing::{debug, instrument, warn};

use crate::models::ProxyConfig;

/// Prober configuration
#[derive(Clone)]
pub struct ProberConfig {
    /// URL fetched through each proxy
    pub check_url: String,
    /// Timeout for the whole probe, connect included
    pub timeout: Duration,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            check_url: "http://api.ipify.org/?format=json".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Result of probing one proxy
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub healthy: bool,
    /// Elapsed wall time in milliseconds, measured for failures too; the
    /// health update rule only consumes it on success.
    pub latency_ms: f64,
    pub error: Option<String>,
}

/// Probes a single proxy's reachability
pub struct HealthProber {
    target_host: String,
    target_port: u16,
    target_path: String,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(config: &ProberConfig) -> Self {
        let (target_host, target_port, target_path) = match url::Url::parse(&config.check_url)
            .ok()
            .and_then(|u| {
                let host = u.host_str()?.to_string();
                let port = u.port_or_known_default()?;
                let path = match u.query() {
                    Some(q) => format!("{}?{}", u.path(), q),
                    None => u.path().to_string(),
                };
                Some((host, port, path))
            }) {
            Some(v) => v,
            None => (
                "api.ipify.org".to_string(),
                80,
                "/?format=json".to_string(),
            ),
        };

        Self {
            target_host,
            target_port,
            target_path,
            timeout: config.timeout,
        }
    }

    /// Probe one proxy, bounded by the configured timeout
    #[instrument(skip(self, proxy), fields(proxy_id = %proxy.id, proxy_host = %proxy.host))]
    pub async fn probe(&self, proxy: &ProxyConfig) -> ProbeOutcome {
        let started = Instant::now();
        let result = timeout(self.timeout, self.fetch_through(proxy)).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(Ok(())) => {
                debug!("Proxy {} is healthy ({:.0}ms)", proxy.id, latency_ms);
                ProbeOutcome {
                    healthy: true,
                    latency_ms,
                    error: None,
                }
            }
            Ok(Err(msg)) => {
                warn!("Proxy {} is unhealthy: {}", proxy.id, msg);
                ProbeOutcome {
                    healthy: false,
                    latency_ms,
                    error: Some(msg),
                }
            }
            Err(_) => {
                let msg = "health check timed out".to_string();
                warn!("Proxy {} is unhealthy: {}", proxy.id, msg);
                ProbeOutcome {
                    healthy: false,
                    latency_ms,
                    error: Some(msg),
                }
            }
        }
    }

    /// Fetch the check URL through the proxy's SOCKS5 tunnel
    async fn fetch_through(&self, proxy: &ProxyConfig) -> std::result::Result<(), String> {
        let proxy_addr = format!("{}:{}", proxy.host, proxy.port);

        let mut stream = Socks5Stream::connect(
            proxy_addr.as_str(),
            (self.target_host.as_str(), self.target_port),
        )
        .await
        .map_err(|e| format!("socks connect failed: {}", e))?;

        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            self.target_path, self.target_host
        );
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| format!("write failed: {}", e))?;

        let mut response = Vec::new();
        stream
            .read_to_end(&mut response)
            .await
            .map_err(|e| format!("read failed: {}", e))?;

        validate_response(&response)
    }
}

/// Check that a raw HTTP response is a 200 carrying an IP payload
fn validate_response(raw: &[u8]) -> std::result::Result<(), String> {
    let response = String::from_utf8_lossy(raw);
    let status_line = response.lines().next().unwrap_or("");

    if status_line.is_empty() {
        return Err("empty response".to_string());
    }
    if !status_line.starts_with("HTTP/1.1 200") && !status_line.starts_with("HTTP/1.0 200") {
        return Err(format!("unexpected status: {}", status_line));
    }

    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body)
        .unwrap_or("");
    if !body.contains("ip") {
        return Err("response body missing ip field".to_string());
    }

    Ok(())
}
