//! # cairn-client
//!
//! Client library for Cairn clusters: a replicated key-value store served
//! over HTTP by `cairnd`, with a single write leader per cluster.
//!
//! The client keeps one piece of shared state, the address of the node it
//! currently believes to be leader. Reads go there directly. Conditional
//! writes follow the 307 redirects that non-leaders answer with, learning
//! the real leader as a side effect. Watches long-poll the change feed of
//! a key prefix and can be resumed from an index, streamed through a
//! channel, and cancelled mid-flight without leaking the connection.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cairn_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder(vec!["http://127.0.0.1:4001".into()]).build()?;
//!
//!     // Write and read data
//!     client.kv().set("greeting", "hello", 0).await?;
//!     let results = client.kv().get("greeting").await?;
//!     println!("{:?}", results);
//!
//!     // Take the lock only if nobody moved it first
//!     let swap = client.kv().test_and_set("lock", "free", "held", 30).await?;
//!     println!("acquired: {}", swap.swapped());
//!
//!     // Wait for the next change under /queue
//!     let change = client.watch().watch_once("queue", 0, None).await?;
//!     println!("{} changed at index {}", change.key, change.index);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Watch Streams
//!
//! A continuous watch pushes every change into an `mpsc` channel and only
//! fetches the next one once the consumer took the last, so a slow
//! consumer never piles up responses client-side:
//!
//! ```rust,ignore
//! let (tx, mut rx) = tokio::sync::mpsc::channel(8);
//! let stop = tokio_util::sync::CancellationToken::new();
//!
//! let watcher = client.watch().clone();
//! tokio::spawn(async move {
//!     watcher.watch("queue", 1, Some(tx), Some(stop)).await
//! });
//!
//! while let Some(change) = rx.recv().await {
//!     println!("#{} {} = {:?}", change.index, change.key, change.value);
//! }
//! ```
//!
//! ## Features
//!
//! This crate provides:
//! - [`Client`] - Main entry point holding the shared cluster view
//! - [`ClientBuilder`] - Configurable client construction
//! - [`KvClient`] - Reads, writes, deletes and conditional writes
//! - [`WatchClient`] - Single and continuous change watches
//! - [`ClusterClient`] - The client's view of leader and seed endpoints

mod builder;
mod cluster;
mod config;
mod error;
mod kv;
mod response;
mod scoped_timer;
mod transport;
mod watch;

pub use builder::ClientBuilder;
pub use cluster::ClusterClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use error::ClientError;
pub use error::Result;
pub use kv::KvClient;
pub use kv::TestAndSet;
pub use response::decode_response_list;
pub use response::Response;
pub use watch::WatchClient;

#[cfg(test)]
mod watch_test;

/// Main entry point for talking to a Cairn cluster
///
/// Hands out the specialized clients:
/// - Use [`kv()`](Client::kv) for data operations
/// - Use [`watch()`](Client::watch) for change feeds
/// - Use [`cluster()`](Client::cluster) for the client's cluster view
///
/// Created through the [`builder()`](Client::builder) method. Cloning is
/// cheap and clones share the same leader state.
#[derive(Clone)]
pub struct Client {
    pub(crate) kv: KvClient,
    pub(crate) watch: WatchClient,
    pub(crate) cluster: ClusterClient,
}

/// Shared guts of a client: the HTTP connection pool plus the cluster
/// view, handed around behind an `Arc` by every specialized client.
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) cluster: cluster::Cluster,
    pub(crate) config: ClientConfig,
}

impl Client {
    /// Create a configured client builder
    ///
    /// Starts client construction with the given seed endpoints. The
    /// first seed doubles as the initial leader guess. Chain
    /// configuration methods before calling
    /// [`build()`](ClientBuilder::build).
    ///
    /// # Panics
    /// Will panic if no endpoints provided
    pub fn builder(endpoints: Vec<String>) -> ClientBuilder {
        ClientBuilder::new(endpoints)
    }

    /// Key-value operations
    pub fn kv(&self) -> &KvClient {
        &self.kv
    }

    /// Watch operations
    pub fn watch(&self) -> &WatchClient {
        &self.watch
    }

    /// This client's view of the cluster
    pub fn cluster(&self) -> &ClusterClient {
        &self.cluster
    }
}
