use core::time::Duration;

use types::redacting_url::RedactingUrl;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct Config {
    pub beacon_node_url: RedactingUrl,
    /// Number of additional attempts after a connection failure, a timeout,
    /// or a `429 Too Many Requests` / `503 Service Unavailable` response.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles with every subsequent attempt.
    pub retry_delay: Duration,
}

impl Config {
    #[must_use]
    pub const fn new(beacon_node_url: RedactingUrl) -> Self {
        Self {
            beacon_node_url,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay
            .saturating_mul(2_u32.saturating_pow(attempt))
    }
}
