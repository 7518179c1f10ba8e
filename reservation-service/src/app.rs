use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderName, HeaderValue, Method, StatusCode,
};
use axum::{
    body::Body,
    extract::State,
    middleware,
    routing::{get, post},
    Router,
};
use common_events::{CinemaEvent, EventPublisher};
use common_observability::ReservationMetrics;
use prometheus::{Encoder, TextEncoder};
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::lock::RedisLockManager;
use crate::payment_handlers::{confirm_payment, purchase_history};
use crate::reservation_handlers::{cancel_reservation, create_reservation, get_reservation};
use crate::session_handlers::session_seats;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub locks: RedisLockManager,
    pub publisher: EventPublisher,
    pub metrics: Arc<ReservationMetrics>,
    pub reservation_ttl: Duration,
    pub lock_ttl: Duration,
    pub sweep_interval: Duration,
    pub expiration_batch_limit: i64,
}

pub async fn health() -> &'static str {
    "ok"
}

async fn metrics_endpoint(State(state): State<AppState>) -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let families = state.metrics.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (StatusCode::OK, String::from_utf8_lossy(&buf).to_string())
}

async fn error_metrics_mw(
    State(metrics): State<Arc<ReservationMetrics>>,
    req: axum::http::Request<Body>,
    next: middleware::Next,
) -> axum::response::Response {
    let resp = next.run(req).await;
    let status = resp.status();
    if status.as_u16() >= 400 {
        let code = resp
            .headers()
            .get("x-error-code")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown");
        metrics
            .http_errors_total
            .with_label_values(&["reservation-service", code, status.as_str()])
            .inc();
    }
    resp
}

/// After a commit a publish failure must not surface; log it and count it.
pub(crate) async fn publish_best_effort(state: &AppState, event: CinemaEvent) {
    if let Err(err) = state.publisher.publish(&event).await {
        warn!(event_type = event.routing_key(), error = %err, "failed to publish event");
        state.metrics.event_publish_failures.inc();
    }
}

pub fn build_router(state: AppState) -> Router {
    let allowed_origins = [
        "http://localhost:3000",
        "http://localhost:3001",
        "http://localhost:5173",
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(
            allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            ACCEPT,
            CONTENT_TYPE,
            HeaderName::from_static("idempotency-key"),
        ]);

    let metrics = state.metrics.clone();
    Router::new()
        .route("/healthz", get(health))
        .route("/reservations", post(create_reservation))
        .route(
            "/reservations/:id",
            get(get_reservation).delete(cancel_reservation),
        )
        .route("/payments/confirm", post(confirm_payment))
        .route("/users/:user_id/purchases", get(purchase_history))
        .route("/sessions/:session_id/seats", get(session_seats))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .layer(middleware::from_fn_with_state(metrics, error_metrics_mw))
        .layer(cors)
}
