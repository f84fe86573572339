use std::time::Duration;

/// Client configuration parameters for connection management and the
/// redirect-follow policy.
///
/// # Key Configuration Areas
/// - Connection establishment (TCP handshake timeout)
/// - Point-operation request lifecycle
/// - Conditional-write redirect budget
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum time to wait for establishing a TCP connection
    /// Default: 1 second
    pub connect_timeout: Duration,

    /// Maximum time to wait for a complete point-operation response.
    /// Watch long-polls are exempt: the server parks those on purpose.
    /// Default: 3 seconds
    pub request_timeout: Duration,

    /// How many redirects a conditional write follows before giving up
    /// Default: 10
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(3000),
            max_redirects: 10,
        }
    }
}
