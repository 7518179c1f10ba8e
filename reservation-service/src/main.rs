use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use common_events::EventPublisher;
use common_observability::ReservationMetrics;
use rdkafka::producer::FutureProducer;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tracing::{info, warn};

use reservation_service::{
    build_router, AppState, ExpirationSweeper, RedisLockManager, DEFAULT_EXPIRATION_BATCH_LIMIT,
};

const DEFAULT_RESERVATION_TTL_SECS: u64 = 30;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10;
const DEFAULT_LOCK_TTL_MS: u64 = 10_000;

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = PgPool::connect(&database_url).await?;

    let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let locks = RedisLockManager::from_url(&redis_url)?;

    let publisher = match env::var("KAFKA_BOOTSTRAP") {
        Ok(bootstrap) => {
            let producer: FutureProducer = rdkafka::ClientConfig::new()
                .set("bootstrap.servers", &bootstrap)
                .create()
                .expect("failed to create kafka producer");
            EventPublisher::new(Some(producer))
        }
        Err(_) => {
            warn!("KAFKA_BOOTSTRAP not configured, messaging disabled");
            EventPublisher::disabled()
        }
    };

    let reservation_ttl =
        Duration::from_secs(env_u64("RESERVATION_TTL_SECONDS", DEFAULT_RESERVATION_TTL_SECS));
    let sweep_interval =
        Duration::from_secs(env_u64("EXPIRATION_SWEEP_SECONDS", DEFAULT_SWEEP_INTERVAL_SECS));
    let lock_ttl = Duration::from_millis(env_u64("LOCK_TTL_MS", DEFAULT_LOCK_TTL_MS));
    let expiration_batch_limit = env_u64(
        "EXPIRATION_BATCH_LIMIT",
        DEFAULT_EXPIRATION_BATCH_LIMIT as u64,
    ) as i64;

    let metrics = Arc::new(ReservationMetrics::new());
    let state = AppState {
        db,
        locks,
        publisher,
        metrics,
        reservation_ttl,
        lock_ttl,
        sweep_interval,
        expiration_batch_limit,
    };

    ExpirationSweeper::new(state.clone()).spawn();

    let app = build_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);
    let ip: std::net::IpAddr = host.parse()?;
    let addr = SocketAddr::from((ip, port));
    info!(%addr, "starting reservation-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
