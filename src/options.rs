use crate::RetryPolicy;

/// Configures timeout, retry and 404 handling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds, enforced by the transport.
    pub timeout_ms: u64,
    /// Pause before the single retry in milliseconds.
    pub retry_delay_ms: u64,
    /// Fault kinds that earn one retry.
    pub retry_policy: RetryPolicy,
    /// Map a 404 response to `None` instead of an error.
    pub dismiss_404: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            retry_delay_ms: 0,
            retry_policy: RetryPolicy::default(),
            dismiss_404: true,
        }
    }
}

impl ClientOptions {
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_dismiss_404(mut self, dismiss_404: bool) -> Self {
        self.dismiss_404 = dismiss_404;
        self
    }
}
