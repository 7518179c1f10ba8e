use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Bounded-retry parameters shared by the lock-acquisition loop and the
/// consumer's handler retry. `max_retries` counts retries, not attempts:
/// an operation runs at most `max_retries + 1` times.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 100,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.3,
        }
    }
}

/// Capped exponential backoff with randomized jitter. The jitter is additive
/// on top of the capped delay so the floor never drops below the deterministic
/// schedule.
pub fn backoff_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let exponential = policy.base_delay_ms as f64 * policy.backoff_multiplier.powi(attempt as i32);
    let capped = exponential.min(policy.max_delay_ms as f64);
    let jitter = capped * policy.jitter_factor * rand::thread_rng().gen::<f64>();
    Duration::from_millis((capped + jitter) as u64)
}

// SQLSTATE codes worth retrying: serialization_failure, deadlock_detected,
// connection establishment/loss, admin_shutdown.
const TRANSIENT_SQLSTATES: &[&str] = &["40001", "40P01", "08001", "08006", "57P01"];

const TRANSIENT_MESSAGE_PATTERNS: &[&str] = &[
    "connection",
    "timeout",
    "temporarily unavailable",
    "too many connections",
    "deadlock",
];

/// Classifies an error as worth retrying, by SQLSTATE when the caller has one
/// and by message pattern otherwise.
pub fn is_transient(code: Option<&str>, message: &str) -> bool {
    if let Some(code) = code {
        if TRANSIENT_SQLSTATES.contains(&code) {
            return true;
        }
    }
    let lower = message.to_lowercase();
    TRANSIENT_MESSAGE_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Run `f` until it succeeds, the classifier declares the error terminal, or
/// the retry budget is exhausted. The last error is surfaced unchanged.
pub async fn with_retry<T, E, F, Fut, C>(
    op_name: &str,
    policy: &RetryPolicy,
    is_retryable: C,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) || attempt >= policy.max_retries {
                    if attempt > 0 {
                        warn!(op = op_name, attempts = attempt + 1, error = %err, "giving up after retries");
                    }
                    return Err(err);
                }
                let delay = backoff_delay(attempt, policy);
                warn!(
                    op = op_name,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
