//! # Backoff Retrier
//!
//! Bounded retry with exponential backoff for a single fallible async operation.
//!
//! The policy is uniform across every call site: up to `max_attempts` attempts,
//! waiting `2^(attempt-1) * base_delay` between them (1s, 2s, ... with the default
//! 1000 ms base), no jitter. On exhaustion the last error is returned with context
//! naming the operation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let forking = with_retry("universe.isForking", 3, Duration::from_millis(1000), || {
//!     chain.is_forking()
//! })
//! .await?;
//! ```

use anyhow::{Error, Result};
use log::{info, warn};
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;

use crate::settings::Settings;

/// Delays slept between attempts: `base * 2^0, base * 2^1, ...`, one fewer than
/// the number of attempts.
pub fn backoff_delays(max_attempts: usize, base_delay: Duration) -> impl Iterator<Item = Duration> {
    // ExponentialBackoff yields factor * 2^n for n = 1, 2, ...; halving the base
    // as factor makes the first delay equal to the base.
    let factor = (base_delay.as_millis() as u64 / 2).max(1);
    ExponentialBackoff::from_millis(2)
        .factor(factor)
        .take(max_attempts.saturating_sub(1))
}

/// Runs `op` with the retry policy from `settings.retry`.
pub async fn with_settings_retry<T, F, Fut>(operation: &str, settings: &Settings, op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry(
        operation,
        settings.retry.max_attempts,
        Duration::from_millis(settings.retry.base_delay_ms),
        op,
    )
    .await
}

/// Executes `op` up to `max_attempts` times.
pub async fn with_retry<T, F, Fut>(
    operation: &str,
    max_attempts: usize,
    base_delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0usize;

    let action = || {
        attempt += 1;
        let current = attempt;
        let fut = op();
        async move {
            match fut.await {
                Ok(value) => {
                    if current > 1 {
                        info!("✅ [Retry] {} succeeded on attempt {}/{}", operation, current, max_attempts);
                    }
                    Ok(value)
                }
                Err(e) => {
                    warn!(
                        "⚠️ [Retry] {} attempt {}/{} failed: {:#}",
                        operation, current, max_attempts, e
                    );
                    Err(e)
                }
            }
        }
    };

    Retry::spawn(backoff_delays(max_attempts, base_delay), action)
        .await
        .map_err(|e: Error| e.context(format!("{} failed after {} attempts", operation, max_attempts)))
}
