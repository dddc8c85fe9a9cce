//! Fixed-delay retry for repository host calls.
//!
//! Every call is preceded by a short pause to stay under the search rate
//! limit. A transient failure gets exactly one more attempt after a longer
//! pause; a second failure is returned to the caller, who skips the unit.

use std::future::Future;
use std::time::Duration;

use harvest_config::CrawlConfig;
use harvest_github::GitHubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff {
    /// Pause before every attempt sequence.
    pub request_delay: Duration,
    /// Pause before the single retry.
    pub retry_delay: Duration,
}

impl FixedBackoff {
    #[must_use]
    pub const fn from_config(config: &CrawlConfig) -> Self {
        Self {
            request_delay: config.request_delay(),
            retry_delay: config.retry_delay(),
        }
    }

    /// No pauses at all.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            request_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
        }
    }

    /// Run `op`, retrying once if the first failure is transient.
    ///
    /// # Errors
    ///
    /// Returns the first error if it is permanent, otherwise the second.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, GitHubError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GitHubError>>,
    {
        tokio::time::sleep(self.request_delay).await;
        match op().await {
            Err(error) if error.is_transient() => {
                tracing::warn!(
                    what,
                    %error,
                    retry_in_ms = self.retry_delay.as_millis(),
                    "transient failure, retrying once"
                );
                tokio::time::sleep(self.retry_delay).await;
                op().await
            }
            other => other,
        }
    }
}
