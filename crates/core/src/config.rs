use std::time::Duration;

/// Client-session configuration: the one documented tunable (`osd_timeout`,
/// §6) plus the session identity and request-pool sizing this expansion
/// adds as ambient configuration surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    client_inc: u32,
    osd_timeout: Duration,
    request_pool_size: usize,
}

impl ClientConfig {
    /// Starts building a [`ClientConfig`] for session incarnation
    /// `client_inc`.
    #[must_use]
    pub fn builder(client_inc: u32) -> ClientConfigBuilder {
        ClientConfigBuilder::new(client_inc)
    }

    /// This client session's incarnation number.
    #[must_use]
    pub const fn client_inc(&self) -> u32 {
        self.client_inc
    }

    /// Per-request timeout, the cadence the timeout worker sweeps at.
    #[must_use]
    pub const fn osd_timeout(&self) -> Duration {
        self.osd_timeout
    }

    /// Minimum number of request records the pool preallocates (§4.9 `init`:
    /// "≥10 preallocated records").
    #[must_use]
    pub const fn request_pool_size(&self) -> usize {
        self.request_pool_size
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfigBuilder::new(0).build()
    }
}

/// Builder for [`ClientConfig`], mirroring the teacher's
/// `ClientConfig`/`ClientConfigBuilder` split.
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    client_inc: u32,
    osd_timeout: Duration,
    request_pool_size: usize,
}

impl ClientConfigBuilder {
    /// Starts a builder for session incarnation `client_inc`, with the
    /// default timeout and pool size.
    #[must_use]
    pub const fn new(client_inc: u32) -> Self {
        Self {
            client_inc,
            osd_timeout: Duration::from_secs(30),
            request_pool_size: 10,
        }
    }

    /// Sets the timeout-worker cadence.
    #[must_use]
    pub const fn osd_timeout(mut self, timeout: Duration) -> Self {
        self.osd_timeout = timeout;
        self
    }

    /// Sets the request pool's minimum preallocated size.
    #[must_use]
    pub const fn request_pool_size(mut self, size: usize) -> Self {
        self.request_pool_size = size;
        self
    }

    /// Builds the final [`ClientConfig`].
    #[must_use]
    pub const fn build(self) -> ClientConfig {
        ClientConfig {
            client_inc: self.client_inc,
            osd_timeout: self.osd_timeout,
            request_pool_size: self.request_pool_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_a_positive_timeout_and_pool_floor() {
        let config = ClientConfig::default();
        assert!(config.osd_timeout() > Duration::ZERO);
        assert!(config.request_pool_size() >= 10);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = ClientConfig::builder(7)
            .osd_timeout(Duration::from_secs(5))
            .request_pool_size(16)
            .build();
        assert_eq!(config.client_inc(), 7);
        assert_eq!(config.osd_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_pool_size(), 16);
    }
}
