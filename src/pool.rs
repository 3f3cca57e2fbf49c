//! Round-robin endpoint pool with liveness probing.
//!
//! The pool owns a fixed, ordered set of registry endpoints and a cursor
//! pointing at the last known-good one. Selection probes at most one full
//! lap starting at the cursor, so a healthy current endpoint costs a single
//! probe while an outage degrades to one scan of the pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::metrics;
use crate::registry::RegistryEndpoint;

/// Ordered set of registry endpoints plus the last known-good cursor.
///
/// The cursor is shared by every in-flight query. Selections may race on it,
/// but a stale value only changes which endpoint is probed first; every
/// candidate is probed before being returned.
pub struct EndpointPool {
    endpoints: Vec<Arc<dyn RegistryEndpoint>>,
    current: AtomicUsize,
}

impl EndpointPool {
    /// Create a pool over the given endpoints. The cursor starts at the
    /// first endpoint; call [`select_healthy`](Self::select_healthy) once at
    /// startup to advance it to the first reachable one.
    pub fn new(endpoints: Vec<Arc<dyn RegistryEndpoint>>) -> Self {
        Self {
            endpoints,
            current: AtomicUsize::new(0),
        }
    }

    /// Number of configured endpoints.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// True if the pool has no endpoints.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Index of the last known-good endpoint.
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// Select a healthy endpoint, probing round-robin from the cursor.
    ///
    /// Probes at most `len()` endpoints. The first to answer its probe
    /// becomes the new cursor and is returned. Returns `None` when every
    /// endpoint fails, leaving the cursor unchanged.
    pub async fn select_healthy(&self) -> Option<Arc<dyn RegistryEndpoint>> {
        let len = self.endpoints.len();
        if len == 0 {
            return None;
        }

        let start = self.current.load(Ordering::Relaxed);
        for i in 0..len {
            let idx = (start + i) % len;
            let endpoint = &self.endpoints[idx];
            match endpoint.probe().await {
                Ok(()) => {
                    metrics::record_probe(endpoint.address(), true);
                    self.current.store(idx, Ordering::Relaxed);
                    return Some(Arc::clone(endpoint));
                }
                Err(e) => {
                    metrics::record_probe(endpoint.address(), false);
                    warn!(endpoint = endpoint.address(), error = %e, "endpoint probe failed");
                }
            }
        }
        None
    }

    /// Emit pool gauges.
    pub fn emit_metrics(&self) {
        metrics::record_pool_state(self.endpoints.len(), self.current_index());
    }
}
