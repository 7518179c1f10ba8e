use std::future::Future;
use std::time::Duration;

use common_http_errors::ApiError;
use common_retry::{backoff_delay, RetryPolicy};
use tracing::{debug, warn};
use uuid::Uuid;

const LOCK_PREFIX: &str = "lock:";

// Compare-and-delete must happen inside Redis; a GET/DEL pair from here would
// race with TTL expiry and delete someone else's lock.
const RELEASE_SCRIPT: &str = r#"
if redis.call("get", KEYS[1]) == ARGV[1] then
  return redis.call("del", KEYS[1])
else
  return 0
end
"#;

fn default_acquire_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 10,
        base_delay_ms: 50,
        max_delay_ms: 2_000,
        backoff_multiplier: 2.0,
        jitter_factor: 0.3,
    }
}

/// Cross-process mutual exclusion over an arbitrary resource key, backed by
/// Redis. A lock never outlives its TTL, so a crashed holder only blocks the
/// resource for a bounded time.
#[derive(Clone)]
pub struct RedisLockManager {
    client: redis::Client,
    retry: RetryPolicy,
}

impl RedisLockManager {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            retry: default_acquire_retry(),
        }
    }

    pub fn from_url(url: &str) -> redis::RedisResult<Self> {
        Ok(Self::new(redis::Client::open(url)?))
    }

    /// Non-blocking acquire. Returns the ownership token on success, `None`
    /// when the resource is already held.
    pub async fn acquire(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<String>, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{LOCK_PREFIX}{resource}");
        let token = Uuid::new_v4().to_string();

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        match reply.as_deref() {
            Some("OK") => {
                debug!(resource, "lock acquired");
                Ok(Some(token))
            }
            _ => {
                debug!(resource, "failed to acquire lock");
                Ok(None)
            }
        }
    }

    /// Releasing with a stale or foreign token is a no-op returning false.
    pub async fn release(&self, resource: &str, token: &str) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = format!("{LOCK_PREFIX}{resource}");

        let deleted: i32 = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(token)
            .invoke_async(&mut conn)
            .await?;

        if deleted == 1 {
            debug!(resource, "lock released");
            Ok(true)
        } else {
            warn!(resource, "lock release skipped, token mismatch");
            Ok(false)
        }
    }

    /// Retries `acquire` with capped exponential backoff plus jitter until
    /// success or the retry budget runs out.
    pub async fn acquire_with_retry(
        &self,
        resource: &str,
        ttl: Duration,
    ) -> Result<Option<String>, redis::RedisError> {
        let attempts = self.retry.max_retries;
        for attempt in 0..attempts {
            if let Some(token) = self.acquire(resource, ttl).await? {
                if attempt > 0 {
                    debug!(resource, attempts = attempt + 1, "lock acquired after retries");
                }
                return Ok(Some(token));
            }
            if attempt + 1 < attempts {
                tokio::time::sleep(backoff_delay(attempt, &self.retry)).await;
            }
        }
        warn!(resource, attempts, "failed to acquire lock, budget exhausted");
        Ok(None)
    }

    /// Scoped acquisition: runs `f` under the lock and releases on every exit
    /// path, surfacing `f`'s own result unchanged. Fails fast with
    /// `resource_busy` when the lock cannot be acquired at all.
    pub async fn with_lock<T, F, Fut>(
        &self,
        resource: &str,
        ttl: Duration,
        f: F,
    ) -> Result<T, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let token = self
            .acquire_with_retry(resource, ttl)
            .await
            .map_err(ApiError::internal)?;
        let Some(token) = token else {
            return Err(ApiError::conflict(
                "resource_busy",
                format!("Could not acquire lock for resource: {resource}"),
            ));
        };

        let result = f().await;

        if let Err(err) = self.release(resource, &token).await {
            warn!(resource, error = %err, "failed to release lock");
        }
        result
    }
}

/// Canonical resource key for a multi-seat operation. Seat ids are sorted
/// before concatenation so two requests naming the same seat set in different
/// orders always collide on the same key.
pub fn seat_lock_resource(session_id: Uuid, seat_ids: &[Uuid]) -> String {
    let mut sorted: Vec<Uuid> = seat_ids.to_vec();
    sorted.sort();
    let joined = sorted
        .iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("session:{session_id}:seats:{joined}")
}
