//! Point operations: reads, writes, deletes and the leader-seeking
//! conditional write.

use std::sync::Arc;

use reqwest::Method;
use tracing::debug;

use crate::cluster::address_str;
use crate::error::Result;
use crate::response::decode_response;
use crate::response::decode_response_list;
use crate::response::Response;
use crate::scoped_timer::ScopedTimer;
use crate::transport::build_url;
use crate::ClientInner;

/// Outcome of a conditional write.
///
/// A write whose condition does not hold is a normal result, not an
/// error: the transport worked and the store answered. Callers decide
/// what a failed comparison means for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestAndSet {
    /// The store held the expected previous value and now holds the new one
    Swapped(Response),
    /// The store answered, but not with the expected previous/new values
    ConditionNotMet(Response),
}

impl TestAndSet {
    /// True when the swap took place
    pub fn swapped(&self) -> bool {
        matches!(self, TestAndSet::Swapped(_))
    }

    /// The record the store answered with, whichever way the comparison went
    pub fn response(&self) -> &Response {
        match self {
            TestAndSet::Swapped(response) => response,
            TestAndSet::ConditionNotMet(response) => response,
        }
    }

    pub fn into_response(self) -> Response {
        match self {
            TestAndSet::Swapped(response) => response,
            TestAndSet::ConditionNotMet(response) => response,
        }
    }
}

/// Key-value operations
///
/// Reads target the believed leader directly and are not retried here.
/// The conditional write is the one operation that chases redirects, see
/// [`test_and_set`](KvClient::test_and_set).
#[derive(Clone)]
pub struct KvClient {
    inner: Arc<ClientInner>,
}

impl KvClient {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Reads a key from the believed leader.
    ///
    /// Returns one record for a plain key and one record per entry for a
    /// directory listing, in server order.
    pub async fn get(
        &self,
        key: impl AsRef<str>,
    ) -> Result<Vec<Response>> {
        let _timer = ScopedTimer::new("client::get");
        let key = key.as_ref();
        debug!("get {} [{}]", key, self.inner.cluster.leader());

        let url = self.inner.leader_url(&keys_path(key));
        let response = self.inner.send_request(Method::GET, &url, None).await?;
        let body = self.inner.success_bytes(response).await?;

        decode_response_list(&body)
    }

    /// Reads a key from an explicit node address instead of the leader.
    ///
    /// Mainly useful for diagnostics: comparing what individual nodes
    /// answer for the same key. The shared leader state is neither
    /// consulted nor touched.
    pub async fn get_from(
        &self,
        key: impl AsRef<str>,
        addr: impl AsRef<str>,
    ) -> Result<Vec<Response>> {
        let _timer = ScopedTimer::new("client::get_from");
        let key = key.as_ref();
        let addr = address_str(addr.as_ref());
        debug!("get {} [{}]", key, addr);

        let url = build_url(&addr, &keys_path(key));
        let response = self.inner.send_request(Method::GET, &url, None).await?;
        let body = self.inner.success_bytes(response).await?;

        decode_response_list(&body)
    }

    /// Writes `value` to `key`, expiring after `ttl` seconds when nonzero.
    pub async fn set(
        &self,
        key: impl AsRef<str>,
        value: impl AsRef<str>,
        ttl: u64,
    ) -> Result<Response> {
        let _timer = ScopedTimer::new("client::set");
        let key = key.as_ref();
        debug!("set {} [{}]", key, self.inner.cluster.leader());

        let mut form: Vec<(&str, String)> = vec![("value", value.as_ref().to_string())];
        if ttl > 0 {
            form.push(("ttl", ttl.to_string()));
        }

        let url = self.inner.leader_url(&keys_path(key));
        let response = self.inner.send_request(Method::POST, &url, Some(&form)).await?;
        let body = self.inner.success_bytes(response).await?;

        decode_response(&body)
    }

    /// Removes `key`.
    pub async fn delete(
        &self,
        key: impl AsRef<str>,
    ) -> Result<Response> {
        let _timer = ScopedTimer::new("client::delete");
        let key = key.as_ref();
        debug!("delete {} [{}]", key, self.inner.cluster.leader());

        let url = self.inner.leader_url(&keys_path(key));
        let response = self.inner.send_request(Method::DELETE, &url, None).await?;
        let body = self.inner.success_bytes(response).await?;

        decode_response(&body)
    }

    /// Atomically replaces `key`'s value with `value` if its current
    /// value equals `prev_value`. `ttl` applies to the new value when
    /// nonzero.
    ///
    /// Writes must reach the leader. A non-leader answers 307 with the
    /// leader's address in Location; the request is replayed there, the
    /// hint is recorded for later operations, and the loop repeats until
    /// a non-redirect answer arrives or the redirect budget runs out.
    ///
    /// Whatever status the final answer carries, its body is decoded as a
    /// single record and compared against the requested values. A
    /// mismatch, including the empty record an error payload decodes to,
    /// is reported as [`TestAndSet::ConditionNotMet`].
    pub async fn test_and_set(
        &self,
        key: impl AsRef<str>,
        prev_value: impl AsRef<str>,
        value: impl AsRef<str>,
        ttl: u64,
    ) -> Result<TestAndSet> {
        let _timer = ScopedTimer::new("client::test_and_set");
        let key = key.as_ref();
        let prev_value = prev_value.as_ref();
        let value = value.as_ref();
        debug!(
            "test_and_set {} {:?} -> {:?} [{}]",
            key,
            prev_value,
            value,
            self.inner.cluster.leader()
        );

        let mut form: Vec<(&str, String)> = vec![
            ("value", value.to_string()),
            ("prevValue", prev_value.to_string()),
        ];
        if ttl > 0 {
            form.push(("ttl", ttl.to_string()));
        }

        let response =
            self.inner.post_following_redirects(&test_and_set_path(key), &form).await?;
        let body = response.bytes().await?;
        let result = decode_response(&body)?;

        // Absent fields compare as empty, matching how the store reports
        // them.
        if result.prev_value.as_deref().unwrap_or_default() == prev_value
            && result.value.as_deref().unwrap_or_default() == value
        {
            Ok(TestAndSet::Swapped(result))
        } else {
            debug!("test_and_set condition not met for {}", key);
            Ok(TestAndSet::ConditionNotMet(result))
        }
    }
}

fn keys_path(key: &str) -> String {
    format!("keys/{}", key.trim_start_matches('/'))
}

fn test_and_set_path(key: &str) -> String {
    format!("testAndSet/{}", key.trim_start_matches('/'))
}
