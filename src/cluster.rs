//! The client's view of the cluster: seed endpoints and the believed leader.

use std::fmt::Debug;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::ClientInner;

/// Accept addresses either like 127.0.0.1:4001 or a full http URL
pub(crate) fn address_str(addr: &str) -> String {
    // Strip existing "http://" or "https://" prefixes if duplicated.
    let normalized = addr.trim_start_matches("http://").trim_start_matches("https://");
    // Re-add a single "http://" prefix.
    format!("http://{normalized}")
}

/// Shared cluster state behind every specialized client.
///
/// The leader address is advisory: it is where requests are aimed first,
/// not a guarantee. A stale value corrects itself through the
/// redirect-follow path, which calls [`update_leader`](Cluster::update_leader)
/// for every redirect it observes.
pub(crate) struct Cluster {
    endpoints: Vec<String>,
    leader: ArcSwap<String>,
}

impl Cluster {
    /// Builds the view from seed endpoints; the first seed is the initial
    /// leader guess.
    pub(crate) fn new(endpoints: Vec<String>) -> Self {
        let endpoints: Vec<String> = endpoints.iter().map(|e| address_str(e)).collect();
        let leader = ArcSwap::from_pointee(endpoints[0].clone());
        Self { endpoints, leader }
    }

    /// Current leader address. Never blocks; a concurrent update swaps the
    /// whole value, so readers see either the old or the new address,
    /// never a mix.
    pub(crate) fn leader(&self) -> Arc<String> {
        self.leader.load_full()
    }

    /// Atomically replaces the believed leader.
    pub(crate) fn update_leader(
        &self,
        addr: &str,
    ) {
        let addr = address_str(addr);
        debug!("leader updated to {}", addr);
        self.leader.store(Arc::new(addr));
    }

    pub(crate) fn endpoints(&self) -> &[String] {
        &self.endpoints
    }
}

/// Read access to the client's cluster view
///
/// Exposes what this client currently believes, without network traffic.
/// Actual cluster membership management is the server's business.
#[derive(Clone)]
pub struct ClusterClient {
    inner: Arc<ClientInner>,
}

impl Debug for ClusterClient {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ClusterClient").finish()
    }
}

impl ClusterClient {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Address of the node this client currently believes to be leader
    pub fn leader(&self) -> String {
        self.inner.cluster.leader().as_ref().clone()
    }

    /// Seed endpoints the client was built with, normalized
    pub fn endpoints(&self) -> Vec<String> {
        self.inner.cluster.endpoints().to_vec()
    }
}
