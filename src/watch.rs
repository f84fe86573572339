//! Long-poll watches: a single blocking wait for the next change under a
//! prefix, and a loop that turns repeated waits into an ordered stream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::error::ClientError;
use crate::error::Result;
use crate::response::decode_response;
use crate::response::Response;
use crate::scoped_timer::ScopedTimer;
use crate::ClientInner;

/// Watch operations
#[derive(Clone)]
pub struct WatchClient {
    inner: Arc<ClientInner>,
}

impl WatchClient {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Waits for one change under `prefix`.
    ///
    /// With `since_index == 0` the server parks the request until the
    /// next change happens. With a nonzero index the server replays
    /// history from that index on and may answer immediately.
    ///
    /// A supplied `stop` token cancels the wait: the call returns
    /// [`ClientError::WatchStopped`] right away while the in-flight
    /// request is abandoned, its response dropped (and the connection
    /// released) whenever it lands. Cancelling after the response has
    /// arrived has no effect.
    pub async fn watch_once(
        &self,
        prefix: impl AsRef<str>,
        since_index: u64,
        stop: Option<CancellationToken>,
    ) -> Result<Response> {
        let _timer = ScopedTimer::new("client::watch_once");
        let prefix = prefix.as_ref();
        debug!("watch {} [{}]", prefix, self.inner.cluster.leader());

        let stop = match stop {
            Some(stop) => stop,
            None => return self.inner.watch_request(prefix, since_index).await,
        };

        let (tx, rx) = oneshot::channel();
        let inner = self.inner.clone();
        let owned_prefix = prefix.to_string();
        tokio::spawn(async move {
            let result = inner.watch_request(&owned_prefix, since_index).await;
            // A closed receiver means the watch was stopped; dropping the
            // result here is what releases the connection.
            let _ = tx.send(result);
        });

        tokio::select! {
            result = rx => match result {
                Ok(result) => result,
                Err(_) => {
                    warn!("watch {} request task dropped its result channel", prefix);
                    Err(ClientError::WatchStopped)
                }
            },
            _ = stop.cancelled() => {
                debug!("watch {} stopped by the caller", prefix);
                Err(ClientError::WatchStopped)
            }
        }
    }

    /// Streams changes under `prefix` in index order.
    ///
    /// Without a `sink` this is a single wait: the next change (or the
    /// first replayed one at `since_index`) comes back directly as
    /// `Some(response)`.
    ///
    /// With a `sink`, every change is pushed into it and the index is
    /// advanced past each result before the next wait, so a consumer
    /// sees strictly increasing indices with no gaps the server still
    /// remembers. The push waits for channel capacity: a slow consumer
    /// slows the loop down instead of piling responses up. The loop runs
    /// until an error (stop cancellation included) or until the consumer
    /// drops the receiving half, which ends the stream with `Ok(None)`.
    pub async fn watch(
        &self,
        prefix: impl AsRef<str>,
        mut since_index: u64,
        sink: Option<mpsc::Sender<Response>>,
        stop: Option<CancellationToken>,
    ) -> Result<Option<Response>> {
        let prefix = prefix.as_ref();

        let sink = match sink {
            Some(sink) => sink,
            None => return self.watch_once(prefix, since_index, stop).await.map(Some),
        };

        loop {
            let response = self.watch_once(prefix, since_index, stop.clone()).await?;
            since_index = response.index + 1;
            if sink.send(response).await.is_err() {
                debug!("watch {} consumer hung up, ending stream", prefix);
                return Ok(None);
            }
        }
    }
}

impl ClientInner {
    /// Issues the long-poll itself and decodes the answer.
    async fn watch_request(
        &self,
        prefix: &str,
        since_index: u64,
    ) -> Result<Response> {
        let url = self.leader_url(&watch_path(prefix));
        let form = (since_index != 0).then(|| vec![("index", since_index.to_string())]);
        let response = self.send_watch_request(&url, form.as_deref()).await?;
        let body = self.success_bytes(response).await?;

        // Watch answers are always a single record; the list-tolerant
        // decoding used for reads does not apply here.
        decode_response(&body)
    }
}

fn watch_path(prefix: &str) -> String {
    format!("watch/{}", prefix.trim_start_matches('/'))
}
