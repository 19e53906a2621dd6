use std::time::Duration;

/// Default time a command waits for its response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_millis(1500);

/// Default time `open` waits for the dispatch thread to report ready.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Session configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Applied uniformly to every command sent with a reply buffer.
    pub response_timeout: Duration,
    /// Upper bound on the open-time startup handshake.
    pub startup_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }
}

impl SessionConfig {
    /// Override the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Override the startup handshake timeout.
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }
}
