//! nomad-dns - An authoritative DNS server for Nomad service discovery.
//!
//! This crate provides a DNS server that answers A, AAAA, and SRV queries
//! for services registered in a Nomad cluster. Records are synthesized from
//! live registry data fetched per query; nothing is cached. Multiple
//! registry endpoints are supported with round-robin failover.
//!
//! ## Features
//!
//! - A, AAAA, and SRV records for `<service>.<namespace>.<zone>` names
//! - Authoritative negative answers (NXDOMAIN with SOA) for unknown services
//! - Round-robin failover across registry endpoints with liveness probing
//! - Chain delegation for query names outside the zone
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          nomad-dns                              │
//! │                                                                 │
//! │  ┌──────────────────┐    ┌──────────────────┐                  │
//! │  │  Endpoint Pool   │◀───│  NomadResolver   │◀── UDP/TCP :53   │
//! │  │ (probe, cursor)  │    │ (RequestHandler) │                  │
//! │  └────────┬─────────┘    └────────┬─────────┘                  │
//! │           │ /v1/agent/self        │                             │
//! │           ▼                       ▼                             │
//! │  ┌──────────────────┐    ┌──────────────────┐                  │
//! │  │  Nomad agents    │───▶│ Record Synthesis │                  │
//! │  │ /v1/service/:name│    │  (A/AAAA/SRV)    │                  │
//! │  └──────────────────┘    └──────────────────┘                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## DNS Resolution
//!
//! ```text
//! example.default.service.nomad.
//!   → parse (service = "example", namespace = "default")
//!   → select healthy registry endpoint (round-robin from last known-good)
//!   → fetch registered instances
//!   → synthesize records for the query type
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use nomad_dns::{DnsConfig, DnsServer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DnsConfig {
//!         listen_addr: "127.0.0.1:5353".parse().unwrap(),
//!         zone: "service.nomad".to_string(),
//!         ttl: 30,
//!         endpoints: vec!["http://127.0.0.1:4646".to_string()],
//!         token: None,
//!     };
//!
//!     let shutdown = CancellationToken::new();
//!     let server = DnsServer::new(config);
//!     server.run(shutdown).await.unwrap();
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod query;
pub mod records;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod telemetry;

// Re-export main types
pub use config::{Config, DnsConfig, TelemetryConfig};
pub use error::DnsError;
pub use pool::EndpointPool;
pub use resolver::{NomadResolver, NotAuthoritative};
pub use server::DnsServer;
