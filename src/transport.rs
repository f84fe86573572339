//! HTTP plumbing shared by every operation: URL construction against the
//! current leader, request dispatch, the status-to-error convention and
//! the redirect-follow loop used by conditional writes.

use bytes::Bytes;
use reqwest::header;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::Url;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::error::ClientError;
use crate::error::Result;
use crate::ClientInner;

/// URL path prefix of the store's HTTP API
pub(crate) const API_VERSION: &str = "v1";

/// Joins `path` onto a base address under the API version prefix.
pub(crate) fn build_url(
    addr: &str,
    path: &str,
) -> String {
    format!(
        "{}/{}/{}",
        addr.trim_end_matches('/'),
        API_VERSION,
        path.trim_start_matches('/')
    )
}

/// Origin (scheme://host:port) of a redirect target, recorded as the new
/// leader address. Relative targets carry no node identity and yield
/// nothing.
fn url_origin(location: &str) -> Option<String> {
    let url = Url::parse(location).ok()?;
    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}://{}:{}", url.scheme(), host, port)),
        None => Some(format!("{}://{}", url.scheme(), host)),
    }
}

impl ClientInner {
    /// Joins `path` onto the current believed leader.
    pub(crate) fn leader_url(
        &self,
        path: &str,
    ) -> String {
        build_url(&self.cluster.leader(), path)
    }

    /// Dispatches one point operation against `url`.
    ///
    /// Applies the configured request timeout and, when given, encodes
    /// `form` as an urlencoded body. Redirects are not followed here; the
    /// one caller that wants them runs its own loop so it can observe
    /// every hop.
    pub(crate) async fn send_request(
        &self,
        method: Method,
        url: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<reqwest::Response> {
        debug!("{} {}", method, url);
        let mut request = self.http.request(method, url).timeout(self.config.request_timeout);
        if let Some(form) = form {
            request = request.form(form);
        }
        Ok(request.send().await?)
    }

    /// Dispatches one watch long-poll: GET without a replay index, POST
    /// with one. No request timeout on purpose, the server holds these
    /// open until something changes.
    pub(crate) async fn send_watch_request(
        &self,
        url: &str,
        form: Option<&[(&str, String)]>,
    ) -> Result<reqwest::Response> {
        let method = if form.is_some() { Method::POST } else { Method::GET };
        debug!("{} {}", method, url);
        let mut request = self.http.request(method, url);
        if let Some(form) = form {
            request = request.form(form);
        }
        Ok(request.send().await?)
    }

    /// Reads the body of `response`, converting non-success statuses into
    /// the structured error carried in their payload.
    pub(crate) async fn success_bytes(
        &self,
        response: reqwest::Response,
    ) -> Result<Bytes> {
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ClientError::from_status_body(status, &body));
        }
        Ok(body)
    }

    /// POSTs `form` to `path` on the believed leader, replaying the
    /// request wherever a 307 points until a non-redirect answer arrives.
    ///
    /// Every redirect observed also rewrites the shared leader address
    /// with the origin of the Location target, so later operations go
    /// straight to the right node. Bounded by
    /// [`ClientConfig::max_redirects`](crate::ClientConfig::max_redirects).
    pub(crate) async fn post_following_redirects(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let mut url = self.leader_url(path);
        let mut redirects = 0;

        loop {
            let response = self.send_request(Method::POST, &url, Some(form)).await?;
            if response.status() != StatusCode::TEMPORARY_REDIRECT {
                return Ok(response);
            }

            let location = match response
                .headers()
                .get(header::LOCATION)
                .and_then(|value| value.to_str().ok())
            {
                Some(location) => location.to_string(),
                None => {
                    warn!("redirected from {} without a Location header", url);
                    return Err(ClientError::MissingRedirectLocation);
                }
            };

            debug!("redirected to {}", location);
            if let Some(origin) = url_origin(&location) {
                self.cluster.update_leader(&origin);
            }

            if redirects == self.config.max_redirects {
                error!("still redirected after {} redirects, giving up", redirects);
                return Err(ClientError::TooManyRedirects(redirects));
            }
            redirects += 1;
            url = location;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url_joins_version_prefix() {
        assert_eq!(
            build_url("http://127.0.0.1:4001", "keys/foo"),
            "http://127.0.0.1:4001/v1/keys/foo"
        );
    }

    #[test]
    fn test_build_url_tolerates_slashes() {
        assert_eq!(
            build_url("http://127.0.0.1:4001/", "/keys/foo"),
            "http://127.0.0.1:4001/v1/keys/foo"
        );
    }

    #[test]
    fn test_url_origin_keeps_scheme_host_port() {
        assert_eq!(
            url_origin("http://10.0.0.9:4001/v1/testAndSet/k").as_deref(),
            Some("http://10.0.0.9:4001")
        );
        assert_eq!(
            url_origin("http://node7/v1/keys/k").as_deref(),
            Some("http://node7")
        );
    }

    #[test]
    fn test_url_origin_rejects_relative_targets() {
        assert_eq!(url_origin("v1/testAndSet/k"), None);
        assert_eq!(url_origin(""), None);
    }
}
