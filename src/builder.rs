use std::sync::Arc;
use std::time::Duration;

use reqwest::redirect;

use crate::cluster::Cluster;
use crate::cluster::ClusterClient;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::kv::KvClient;
use crate::watch::WatchClient;
use crate::Client;
use crate::ClientInner;

/// Configurable builder for [`Client`] instances
///
/// Implements the **builder pattern** for constructing clients with
/// customized connection parameters and timeouts.
///
/// # Typical Usage Flow
/// 1. Create with `ClientBuilder::new()`
/// 2. Chain configuration methods
/// 3. Finalize with `.build()`
///
/// # Default Configuration
/// - Connect Timeout: 1s
/// - Request Timeout: 3s
/// - Max Redirects: 10
pub struct ClientBuilder {
    config: ClientConfig,
    endpoints: Vec<String>,
}

impl ClientBuilder {
    /// Create a new builder with default config and specified endpoints
    ///
    /// # Panics
    /// Will panic if no endpoints provided
    pub fn new(endpoints: Vec<String>) -> Self {
        assert!(!endpoints.is_empty(), "At least one endpoint required");
        Self {
            config: ClientConfig::default(),
            endpoints,
        }
    }

    /// Set connection timeout (default: 1s)
    pub fn connect_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set point-operation request timeout (default: 3s)
    ///
    /// Watch long-polls are not subject to this timeout.
    pub fn request_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set how many conditional-write redirects to follow (default: 10)
    pub fn max_redirects(
        mut self,
        limit: usize,
    ) -> Self {
        self.config.max_redirects = limit;
        self
    }

    /// Completely replaces the default configuration
    ///
    /// # Warning: Configuration Override
    /// This will discard all previous settings configured through
    /// individual methods like
    /// [`connect_timeout`](ClientBuilder::connect_timeout).
    ///
    /// # Example: Full Configuration
    /// ```no_run
    /// use cairn_client::ClientBuilder;
    /// use cairn_client::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let custom_config = ClientConfig {
    ///     connect_timeout: Duration::from_secs(2),
    ///     request_timeout: Duration::from_secs(5),
    ///     ..ClientConfig::default()
    /// };
    ///
    /// let builder = ClientBuilder::new(vec!["http://node1:4001".into()])
    ///     .set_config(custom_config);
    /// ```
    pub fn set_config(
        mut self,
        config: ClientConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Build the client with current configuration
    ///
    /// No connection is opened here; the first operation does that.
    pub fn build(self) -> Result<Client> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.config.connect_timeout)
            // 307 handling belongs to the conditional-write loop, which
            // has to observe every hop to learn the leader.
            .redirect(redirect::Policy::none())
            .build()?;

        let inner = Arc::new(ClientInner {
            http,
            cluster: Cluster::new(self.endpoints),
            config: self.config,
        });

        Ok(Client {
            kv: KvClient::new(inner.clone()),
            watch: WatchClient::new(inner.clone()),
            cluster: ClusterClient::new(inner),
        })
    }
}
