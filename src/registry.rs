//! Registry client for the Nomad services API.
//!
//! Each configured registry address becomes one [`HttpEndpoint`]. The
//! [`EndpointPool`](crate::pool::EndpointPool) probes endpoints through the
//! [`RegistryEndpoint`] trait, which also lets tests substitute in-memory
//! endpoints for deterministic failover scenarios.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::DnsError;

/// Header carrying the registry ACL token.
const TOKEN_HEADER: &str = "X-Nomad-Token";

/// One live, registered instance of a named service.
///
/// Wire model of a Nomad service registration. The address stays a string
/// here; it is parsed into an IP during record synthesis so that malformed
/// registry data maps to a SERVFAIL rather than a decode error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceInstance {
    /// Registered service name.
    pub service_name: String,
    /// Namespace the service is registered under.
    pub namespace: String,
    /// Instance address, IPv4 or IPv6, as reported by the registry.
    pub address: String,
    /// Instance port.
    pub port: u16,
}

/// One registry backend, as consumed by the endpoint pool.
#[async_trait]
pub trait RegistryEndpoint: Send + Sync {
    /// Configured address of this endpoint, for logging and metrics labels.
    fn address(&self) -> &str;

    /// Liveness probe (registry self-identification call).
    async fn probe(&self) -> Result<(), DnsError>;

    /// Fetch all registered instances of `service` in `namespace`.
    async fn fetch_instances(
        &self,
        service: &str,
        namespace: &str,
    ) -> Result<Vec<ServiceInstance>, DnsError>;
}

/// HTTP implementation of [`RegistryEndpoint`] against a Nomad agent.
pub struct HttpEndpoint {
    address: String,
    base: Url,
    client: Client,
    token: Option<String>,
}

impl HttpEndpoint {
    /// Create an endpoint for the given base address (e.g. "http://127.0.0.1:4646").
    pub fn new(address: &str, token: Option<String>, client: Client) -> Result<Self, DnsError> {
        let base = Url::parse(address)
            .map_err(|e| DnsError::Config(format!("invalid endpoint address {}: {}", address, e)))?;

        Ok(Self {
            address: address.to_string(),
            base,
            client,
            token,
        })
    }

    fn get(&self, path: &str) -> Result<reqwest::RequestBuilder, DnsError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| DnsError::Config(format!("invalid request path {}: {}", path, e)))?;
        let mut req = self.client.get(url);
        if let Some(ref token) = self.token {
            req = req.header(TOKEN_HEADER, token);
        }
        Ok(req)
    }
}

#[async_trait]
impl RegistryEndpoint for HttpEndpoint {
    fn address(&self) -> &str {
        &self.address
    }

    async fn probe(&self) -> Result<(), DnsError> {
        self.get("/v1/agent/self")?
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn fetch_instances(
        &self,
        service: &str,
        namespace: &str,
    ) -> Result<Vec<ServiceInstance>, DnsError> {
        debug!(endpoint = %self.address, service, namespace, "fetching service instances");
        let instances = self
            .get(&format!("/v1/service/{}", service))?
            .query(&[("namespace", namespace)])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<ServiceInstance>>()
            .await?;
        Ok(instances)
    }
}
