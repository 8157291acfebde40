// Retry logic with exponential backoff

use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::HttpSettings;

/// How many times a transport call is attempted and how long to back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&HttpSettings::default())
    }
}

impl From<&HttpSettings> for RetryPolicy {
    fn from(http: &HttpSettings) -> Self {
        Self::new(http.max_attempts, Duration::from_millis(http.base_delay_ms))
    }
}

/// Marks an error that retrying cannot fix (e.g. 401, 400).
///
/// Providers attach it with `anyhow::Error::new(PermanentFailure(..))` so
/// [`with_retry`] gives up immediately.
#[derive(Debug)]
pub struct PermanentFailure(pub String);

impl fmt::Display for PermanentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for PermanentFailure {}

/// Execute a function with exponential backoff retry logic
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.downcast_ref::<PermanentFailure>().is_some() => return Err(e),
            Err(e) if attempt + 1 >= policy.max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Request failed (attempt {}/{}), retrying in {:?}: {:#}",
                    attempt + 1,
                    policy.max_attempts,
                    delay,
                    e
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
