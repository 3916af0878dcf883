//! Server configuration.
//!
//! Supplied once by the CLI layer at construction; immutable for the
//! process lifetime.

use std::time::Duration;

use flymcp_transport::Codec;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default global concurrency cap for tool calls.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Default bound on callers waiting for admission.
pub const DEFAULT_MAX_QUEUE_DEPTH: usize = 32;

/// Runtime limits for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum in-flight message body size in bytes.
    pub max_message_size: usize,
    /// Timeout applied when a tool has no override.
    pub default_timeout: Duration,
    /// Global cap on simultaneously executing tool calls.
    pub max_concurrency: usize,
    /// How many calls may wait for admission before new ones are
    /// rejected with an overload error.
    pub max_queue_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_message_size: Codec::DEFAULT_MAX_MESSAGE_SIZE,
            default_timeout: DEFAULT_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
        }
    }
}

impl ServerConfig {
    /// Sets the maximum message body size.
    #[must_use]
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Sets the default per-call timeout.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Sets the global concurrency cap (minimum 1).
    #[must_use]
    pub fn max_concurrency(mut self, cap: usize) -> Self {
        self.max_concurrency = cap.max(1);
        self
    }

    /// Sets the admission wait bound.
    #[must_use]
    pub fn max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = depth;
        self
    }
}
