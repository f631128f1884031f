//! Bounded retry for transient upstream failures.

use super::{CompletionRequest, TextModel};
use crate::config::ApiSettings;
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry2::strategy::ExponentialBackoff;
use tokio_retry2::{Retry, RetryError};
use tracing::warn;

const MAX_DELAY: Duration = Duration::from_secs(60);

/// Retry policy for transport-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(api: &ApiSettings) -> Self {
        Self {
            max_retries: api.max_retries,
            base_delay: Duration::from_millis(api.retry_base_delay_ms),
        }
    }

    /// Backoff schedule: `base_delay * 2^n`, one entry per allowed retry.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        // ExponentialBackoff yields factor * 2^(n+1) for base 2.
        let half_base = u64::try_from(self.base_delay.as_millis() / 2).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor(half_base)
            .max_delay(MAX_DELAY)
            .take(self.max_retries as usize)
    }

    /// Run `op`, retrying while it fails with a transient error.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_retries + 1;
        let mut attempt = 0u32;

        Retry::spawn(self.delays(), move || {
            attempt += 1;
            let current = attempt;
            let fut = op();
            async move {
                match fut.await {
                    Ok(value) => Ok(value),
                    Err(e) if e.is_transient() => {
                        if current < attempts {
                            warn!(
                                "{} failed (attempt {}/{}), retrying: {}",
                                label, current, attempts, e
                            );
                        }
                        Err(RetryError::Transient {
                            err: e,
                            retry_after: None,
                        })
                    }
                    Err(e) => Err(RetryError::Permanent(e)),
                }
            }
        })
        .await
    }
}

/// A [`TextModel`] decorator that applies a [`RetryPolicy`].
pub struct RetryingModel {
    inner: Arc<dyn TextModel>,
    policy: RetryPolicy,
}

impl RetryingModel {
    pub fn new(inner: Arc<dyn TextModel>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl TextModel for RetryingModel {
    fn provider(&self) -> &str {
        self.inner.provider()
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let label = format!("{} completion", self.inner.provider());
        self.policy
            .run(&label, || self.inner.complete(request))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PodscriptError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fails with the queued errors in order, then succeeds.
    struct FlakyModel {
        failures: Mutex<Vec<PodscriptError>>,
        calls: AtomicUsize,
    }

    impl FlakyModel {
        fn new(failures: Vec<PodscriptError>) -> Self {
            Self {
                failures: Mutex::new(failures),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextModel for FlakyModel {
        fn provider(&self) -> &str {
            "Flaky"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut failures = self.failures.lock().unwrap();
            if failures.is_empty() {
                Ok("done".to_string())
            } else {
                Err(failures.remove(0))
            }
        }
    }

    fn server_error() -> PodscriptError {
        PodscriptError::Upstream {
            provider: "Flaky".to_string(),
            status: Some(503),
            message: "unavailable".to_string(),
        }
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let inner = Arc::new(FlakyModel::new(vec![server_error(), server_error()]));
        let model = RetryingModel::new(inner.clone(), fast_policy(2));

        let text = model.complete(&CompletionRequest::new("x")).await.unwrap();
        assert_eq!(text, "done");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = Arc::new(FlakyModel::new(vec![
            server_error(),
            server_error(),
            server_error(),
        ]));
        let model = RetryingModel::new(inner.clone(), fast_policy(1));

        let err = model.complete(&CompletionRequest::new("x")).await.unwrap_err();
        assert!(err.is_transient());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let inner = Arc::new(FlakyModel::new(vec![PodscriptError::Upstream {
            provider: "Flaky".to_string(),
            status: Some(401),
            message: "bad key".to_string(),
        }]));
        let model = RetryingModel::new(inner.clone(), fast_policy(3));

        assert!(model.complete(&CompletionRequest::new("x")).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        };
        let delays: Vec<Duration> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000),
            ]
        );
    }

    #[test]
    fn test_no_retries_means_no_delays() {
        let policy = RetryPolicy {
            max_retries: 0,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delays().count(), 0);
    }
}
