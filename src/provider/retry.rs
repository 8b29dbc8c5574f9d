//! Retry with exponential backoff and jitter.
//!
//! A call is attempted up to `retries + 1` times. After failed attempt `i`
//! (0-based) the next attempt waits
//!
//! ```text
//! base_delay * factor^i * (1 + random() * jitter)
//! ```
//!
//! with `random()` uniform in `[0, 1)`. The wait is a `tokio` sleep, so other
//! tasks keep running. Attempts of one call are strictly sequential. When
//! every attempt fails the last error is returned unchanged.

use super::{ImageProvider, ProviderError};
use crate::types::ImageSize;
use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            base_delay: Duration::from_millis(400),
            factor: 2.0,
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// Policy that tries once and never waits.
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    /// Wait after failed attempt `attempt` (0-based), given a uniform sample
    /// `unit` in `[0, 1)`. Rounded to whole milliseconds.
    pub fn delay_for(&self, attempt: u32, unit: f64) -> Duration {
        let base = self.base_delay.as_millis() as f64;
        let ms = base * self.factor.powi(attempt as i32) * (1.0 + unit * self.jitter);
        Duration::from_millis(ms.round().max(0.0) as u64)
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or
    /// `retries + 1` attempts have failed. `call` receives the 0-based
    /// attempt index.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0;
        loop {
            match call(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempts = attempt + 1, "provider call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.retries => {
                    warn!(operation, attempts = attempt + 1, error = %e, "provider call failed after retries");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.delay_for(attempt, rand::random::<f64>());
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "provider call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Runs every call of the wrapped provider under a [`RetryPolicy`].
#[derive(Debug)]
pub struct Retrying<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P: ImageProvider> Retrying<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<P: ImageProvider> ImageProvider for Retrying<P> {
    async fn generate(
        &self,
        prompt: &str,
        size: ImageSize,
        count: u32,
    ) -> Result<Vec<Vec<u8>>, ProviderError> {
        let inner = &self.inner;
        self.policy
            .run("generate", move |_| inner.generate(prompt, size, count))
            .await
    }

    async fn edit(
        &self,
        image_path: &Path,
        prompt: &str,
        size: ImageSize,
        transparent: bool,
    ) -> Result<Vec<u8>, ProviderError> {
        let inner = &self.inner;
        self.policy
            .run("edit", move |_| inner.edit(image_path, prompt, size, transparent))
            .await
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}
