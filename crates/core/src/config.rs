//! Client configuration

use std::time::Duration;

/// What a successful operation does to the recorded last error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LastErrorPolicy {
    /// A successful connect or send clears the last error
    #[default]
    ResetOnSuccess,
    /// The last error stays until the next failure overwrites it
    Persist,
}

/// Chat client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Last error handling
    pub last_error_policy: LastErrorPolicy,

    /// Timeout for establishing the TCP connection.
    /// Reads and writes never time out.
    pub connect_timeout: Option<Duration>,

    /// Disable Nagle's algorithm so short command lines go out immediately
    pub nodelay: bool,

    /// Capacity of channels handed out by `ChatClient::event_stream`
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            last_error_policy: LastErrorPolicy::default(),
            connect_timeout: None,
            nodelay: true,
            event_buffer: 256,
        }
    }
}

impl ClientConfig {
    /// Set last error policy
    pub fn with_last_error_policy(mut self, policy: LastErrorPolicy) -> Self {
        self.last_error_policy = policy;
        self
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Toggle TCP_NODELAY
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Set event stream capacity (at least 1)
    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}
