use std::sync::atomic::{AtomicU32, Ordering};

use common_retry::{backoff_delay, is_transient, with_retry, RetryPolicy};

fn policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 3,
        base_delay_ms: 100,
        max_delay_ms: 1_000,
        backoff_multiplier: 2.0,
        jitter_factor: 0.3,
    }
}

#[test]
fn backoff_grows_exponentially_within_jitter_band() {
    let p = policy();
    // attempt 0 -> 100ms, attempt 1 -> 200ms, attempt 2 -> 400ms, plus up to 30% jitter
    for (attempt, base) in [(0u32, 100u64), (1, 200), (2, 400)] {
        let d = backoff_delay(attempt, &p).as_millis() as u64;
        assert!(d >= base, "attempt {attempt}: {d}ms below base {base}ms");
        assert!(d <= base + base * 3 / 10 + 1, "attempt {attempt}: {d}ms above jitter band");
    }
}

#[test]
fn backoff_is_capped() {
    let p = policy();
    // 100 * 2^10 far exceeds the cap; jitter applies to the capped value
    let d = backoff_delay(10, &p).as_millis() as u64;
    assert!(d >= 1_000);
    assert!(d <= 1_300 + 1);
}

#[test]
fn sqlstate_serialization_failure_is_transient() {
    assert!(is_transient(Some("40001"), "could not serialize access"));
    assert!(is_transient(Some("40P01"), "deadlock detected"));
    assert!(is_transient(Some("08006"), "server closed the connection"));
}

#[test]
fn message_patterns_classify_without_code() {
    assert!(is_transient(None, "Connection reset by peer"));
    assert!(is_transient(None, "statement timeout"));
    assert!(is_transient(None, "FATAL: too many connections"));
    assert!(!is_transient(None, "duplicate key value violates unique constraint"));
    assert!(!is_transient(Some("23505"), "duplicate key value violates unique constraint"));
}

#[tokio::test]
async fn with_retry_retries_transient_then_succeeds() {
    let calls = AtomicU32::new(0);
    let p = RetryPolicy { base_delay_ms: 1, max_delay_ms: 2, ..policy() };
    let result: Result<u32, String> = with_retry("test-op", &p, |_| true, || {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < 2 {
                Err("connection refused".to_string())
            } else {
                Ok(n)
            }
        }
    })
    .await;
    assert_eq!(result.unwrap(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn with_retry_surfaces_terminal_error_immediately() {
    let calls = AtomicU32::new(0);
    let result: Result<(), String> = with_retry("test-op", &policy(), |_| false, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err("conflict".to_string()) }
    })
    .await;
    assert_eq!(result.unwrap_err(), "conflict");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn with_retry_exhausts_budget() {
    let calls = AtomicU32::new(0);
    let p = RetryPolicy { max_retries: 2, base_delay_ms: 1, max_delay_ms: 2, ..policy() };
    let result: Result<(), String> = with_retry("test-op", &p, |_| true, || {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Err("timeout".to_string()) }
    })
    .await;
    assert!(result.is_err());
    // max_retries = 2 means three attempts in total
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
