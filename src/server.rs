//! DNS server setup and lifecycle management.

use hickory_server::ServerFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DnsConfig;
use crate::error::DnsError;
use crate::pool::EndpointPool;
use crate::registry::{HttpEndpoint, RegistryEndpoint};
use crate::resolver::{NomadResolver, NotAuthoritative};

/// Interval for emitting pool metrics.
const METRICS_INTERVAL: Duration = Duration::from_secs(10);

/// Idle timeout for TCP DNS connections.
const TCP_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request timeout for registry calls (probe and fetch).
const REGISTRY_TIMEOUT: Duration = Duration::from_secs(5);

/// Periodically emit endpoint pool metrics.
async fn metrics_loop(pool: Arc<EndpointPool>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(METRICS_INTERVAL);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                pool.emit_metrics();
                debug!(
                    endpoints = pool.len(),
                    current = pool.current_index(),
                    "emitted pool metrics"
                );
            }
            _ = shutdown.cancelled() => {
                debug!("metrics loop shutting down");
                return;
            }
        }
    }
}

/// DNS server answering for services in the cluster registry.
pub struct DnsServer {
    config: DnsConfig,
}

impl DnsServer {
    /// Create a new DNS server with the given configuration.
    pub fn new(config: DnsConfig) -> Self {
        Self { config }
    }

    /// Run the DNS server until the shutdown token is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), DnsError> {
        self.config.validate()?;

        info!(
            listen_addr = %self.config.listen_addr,
            zone = %self.config.zone,
            endpoints = self.config.endpoints.len(),
            "Starting nomad-dns server"
        );

        // One HTTP client shared by every endpoint.
        let client = reqwest::Client::builder()
            .timeout(REGISTRY_TIMEOUT)
            .build()?;

        let endpoints = self
            .config
            .endpoints
            .iter()
            .map(|addr| {
                HttpEndpoint::new(addr, self.config.token.clone(), client.clone())
                    .map(|endpoint| Arc::new(endpoint) as Arc<dyn RegistryEndpoint>)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let pool = Arc::new(EndpointPool::new(endpoints));

        // Advance the cursor to the first reachable endpoint. The server
        // starts either way; queries answer SERVFAIL until one recovers.
        match pool.select_healthy().await {
            Some(endpoint) => {
                info!(endpoint = endpoint.address(), "initial registry endpoint selected")
            }
            None => warn!("no registry endpoint reachable at startup"),
        }

        let resolver = NomadResolver::new(self.config.clone(), Arc::clone(&pool), NotAuthoritative);
        let mut server = ServerFuture::new(resolver);

        // Bind UDP
        let udp_socket = UdpSocket::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS UDP listening");
        server.register_socket(udp_socket);

        // Bind TCP
        let tcp_listener = TcpListener::bind(self.config.listen_addr).await?;
        info!(addr = %self.config.listen_addr, "DNS TCP listening");
        server.register_listener(tcp_listener, TCP_TIMEOUT);

        info!(zone = %self.config.zone, "DNS server ready to serve queries");

        // Start metrics loop
        let metrics_pool = Arc::clone(&pool);
        let metrics_shutdown = shutdown.clone();
        let metrics_handle = tokio::spawn(async move {
            metrics_loop(metrics_pool, metrics_shutdown).await;
        });

        // Emit initial metrics
        pool.emit_metrics();

        // Run server until shutdown
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("DNS server shutdown requested");
            }
            result = server.block_until_done() => {
                if let Err(e) = result {
                    error!("DNS server error: {}", e);
                }
            }
        }

        // Wait for metrics loop to stop
        let _ = metrics_handle.await;

        info!("DNS server stopped");
        Ok(())
    }
}
