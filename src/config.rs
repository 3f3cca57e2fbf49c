//! Configuration types for nomad-dns.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::error::DnsError;

/// Upper bound for the record TTL, in seconds.
pub const MAX_TTL: u32 = 3600;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// DNS server configuration.
    pub dns: DnsConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// DNS server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsConfig {
    /// Address for DNS server to listen on (UDP and TCP).
    pub listen_addr: SocketAddr,

    /// Zone the server is authoritative for (e.g., "service.nomad").
    /// Services resolve as `<service>.<namespace>.<zone>`.
    #[serde(default = "default_zone")]
    pub zone: String,

    /// TTL for DNS records in seconds. Must be in `[0, 3600]`.
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Registry endpoint base URLs (e.g., "http://127.0.0.1:4646").
    /// Tried round-robin starting from the last known-good endpoint.
    pub endpoints: Vec<String>,

    /// Registry ACL token, sent as `X-Nomad-Token` on every request.
    #[serde(default)]
    pub token: Option<String>,
}

impl DnsConfig {
    /// Validate field ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), DnsError> {
        if self.ttl > MAX_TTL {
            return Err(DnsError::Config(format!(
                "ttl must be in range [0, {}]: {}",
                MAX_TTL, self.ttl
            )));
        }
        if self.endpoints.is_empty() {
            return Err(DnsError::Config(
                "at least one registry endpoint is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "nomad_dns=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_zone() -> String {
    "service.nomad".to_string()
}

fn default_ttl() -> u32 {
    30
}
