//! Bounded exponential backoff retry, shared by the compensating CMI-index
//! retry (spec §4.5) and available to the reconciliation job.

use crate::error::{backoff_delay, FedMemError, Result};
use std::future::Future;
use std::time::{Duration, Instant};

const DEFAULT_BASE: Duration = Duration::from_millis(500);
const DEFAULT_CAP: Duration = Duration::from_secs(30);

/// Retries `op` with bounded exponential backoff as long as it returns a
/// transient `FedMemError` and `horizon` has not elapsed, per spec §4.5:
/// "retries with exponential backoff up to a bounded horizon (e.g. 30
/// minutes)". Non-transient errors propagate immediately.
pub async fn retry_with_backoff<F, Fut, T>(horizon: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if started.elapsed() >= horizon {
                    return Err(e);
                }
                let delay = backoff_delay(attempt, DEFAULT_BASE, DEFAULT_CAP);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Same as `retry_with_backoff`, but surfaces a horizon timeout as
/// `DeadlineExceeded` rather than the last transient error — used where the
/// caller cares only that the retry window closed, not the last cause.
pub async fn retry_until_horizon<F, Fut, T>(horizon: Duration, op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_with_backoff(horizon, op).await.map_err(|e| {
        if e.is_transient() {
            FedMemError::DeadlineExceeded
        } else {
            e
        }
    })
}
