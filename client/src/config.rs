use std::time::Duration;

/// Fixed per-step budget: one HTTP request, or one WebSocket receive.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings shared by both transports.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Total time allowed for one REST request
    pub request_timeout: Duration,
    /// Time allowed for each awaited WebSocket frame (and the connect)
    pub receive_timeout: Duration,
    /// Accept any server certificate. Appliances ship with a self-signed
    /// certificate, so this is on unless a caller turns it off.
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            receive_timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: true,
            user_agent: format!("truenas-signal/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl TransportConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Sets both timeouts at once.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_request_timeout(timeout).with_receive_timeout(timeout)
    }

    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}
