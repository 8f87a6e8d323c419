//! # Peer Configuration
//!
//! A fluent builder over [`PeerConfig`]: a handful of setters consuming and
//! returning `self`, finished off with `build()`.

use std::time::Duration;

/// Tunables for a [`crate::Peer`]. Everything here is in-process
/// configuration; there is no environment variable or file-based
/// configuration surface.
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// How long a `request` waits for a matching Response/ErrorResponse
    /// before its waiter is rejected with `REQUEST_TIMEOUT`.
    pub request_timeout: Duration,
    /// Initial capacity reserved by the peer's reusable encode buffer.
    pub builder_initial_size_bytes: usize,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(5000),
            builder_initial_size_bytes: 256,
        }
    }
}

impl PeerConfig {
    pub fn builder() -> PeerConfigBuilder {
        PeerConfigBuilder::new()
    }
}

/// Fluent builder for [`PeerConfig`].
#[derive(Debug, Clone)]
pub struct PeerConfigBuilder {
    config: PeerConfig,
}

impl PeerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: PeerConfig::default(),
        }
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn request_timeout_ms(mut self, millis: u64) -> Self {
        self.config.request_timeout = Duration::from_millis(millis);
        self
    }

    pub fn builder_initial_size_bytes(mut self, size: usize) -> Self {
        self.config.builder_initial_size_bytes = size;
        self
    }

    pub fn build(self) -> PeerConfig {
        self.config
    }
}

impl Default for PeerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
