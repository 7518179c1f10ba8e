use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::{query_as, PgExecutor};
use uuid::Uuid;

use crate::model::{Reservation, ReservationStatus, Sale, Seat, SeatStatus, Session};

const RESERVATION_COLUMNS: &str =
    "id, user_id, session_id, status, expires_at, idempotency_key, total_amount, created_at, updated_at";
const SALE_COLUMNS: &str =
    "id, reservation_id, user_id, session_id, total_amount, payment_confirmed_at";
const SEAT_COLUMNS: &str = "id, session_id, seat_label, status, version";

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

pub async fn find_session(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> sqlx::Result<Option<Session>> {
    query_as::<_, Session>(
        "SELECT id, movie_title, room, start_time, ticket_price FROM sessions WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}

/// Row-locks the requested seats. The lock is a fast path; the serializable
/// transaction around this call is what actually guarantees correctness.
pub async fn seats_for_update(
    executor: impl PgExecutor<'_>,
    session_id: Uuid,
    seat_ids: &[Uuid],
) -> sqlx::Result<Vec<Seat>> {
    query_as::<_, Seat>(&format!(
        "SELECT {SEAT_COLUMNS} FROM seats \
         WHERE session_id = $1 AND id = ANY($2) \
         ORDER BY id FOR UPDATE"
    ))
    .bind(session_id)
    .bind(seat_ids)
    .fetch_all(executor)
    .await
}

pub async fn seats_by_session(
    executor: impl PgExecutor<'_>,
    session_id: Uuid,
) -> sqlx::Result<Vec<Seat>> {
    query_as::<_, Seat>(&format!(
        "SELECT {SEAT_COLUMNS} FROM seats WHERE session_id = $1 ORDER BY seat_label"
    ))
    .bind(session_id)
    .fetch_all(executor)
    .await
}

pub async fn seats_of_reservation(
    executor: impl PgExecutor<'_>,
    reservation_id: Uuid,
) -> sqlx::Result<Vec<Seat>> {
    query_as::<_, Seat>(
        "SELECT s.id, s.session_id, s.seat_label, s.status, s.version FROM seats s \
         JOIN reservation_seats rs ON rs.seat_id = s.id \
         WHERE rs.reservation_id = $1 ORDER BY s.seat_label",
    )
    .bind(reservation_id)
    .fetch_all(executor)
    .await
}

pub async fn update_seats_status(
    executor: impl PgExecutor<'_>,
    seat_ids: &[Uuid],
    status: SeatStatus,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE seats SET status = $2 WHERE id = ANY($1)")
        .bind(seat_ids)
        .bind(status.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn find_reservation(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> sqlx::Result<Option<Reservation>> {
    query_as::<_, Reservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn find_reservation_by_idempotency_key(
    executor: impl PgExecutor<'_>,
    key: &str,
) -> sqlx::Result<Option<Reservation>> {
    query_as::<_, Reservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE idempotency_key = $1"
    ))
    .bind(key)
    .fetch_optional(executor)
    .await
}

pub async fn reservation_for_update(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> sqlx::Result<Option<Reservation>> {
    query_as::<_, Reservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_reservation(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
    session_id: Uuid,
    expires_at: DateTime<Utc>,
    idempotency_key: Option<&str>,
    total_amount: &BigDecimal,
) -> sqlx::Result<Reservation> {
    query_as::<_, Reservation>(&format!(
        "INSERT INTO reservations (user_id, session_id, status, expires_at, idempotency_key, total_amount) \
         VALUES ($1, $2, 'PENDING', $3, $4, $5) \
         RETURNING {RESERVATION_COLUMNS}"
    ))
    .bind(user_id)
    .bind(session_id)
    .bind(expires_at)
    .bind(idempotency_key)
    .bind(total_amount)
    .fetch_one(executor)
    .await
}

pub async fn link_reservation_seats(
    executor: impl PgExecutor<'_>,
    reservation_id: Uuid,
    seat_ids: &[Uuid],
) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO reservation_seats (reservation_id, seat_id) SELECT $1, unnest($2::uuid[])")
        .bind(reservation_id)
        .bind(seat_ids)
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn update_reservation_status(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    status: ReservationStatus,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE reservations SET status = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(status.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

/// Locked read of the expired PENDING batch. SKIP LOCKED keeps overlapping
/// sweeps (other instances, slow previous runs) on disjoint row sets instead
/// of blocking on each other.
pub async fn expired_pending_for_update(
    executor: impl PgExecutor<'_>,
    now: DateTime<Utc>,
    limit: i64,
) -> sqlx::Result<Vec<Reservation>> {
    query_as::<_, Reservation>(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations \
         WHERE status = 'PENDING' AND expires_at < $1 \
         ORDER BY expires_at \
         FOR UPDATE SKIP LOCKED \
         LIMIT $2"
    ))
    .bind(now)
    .bind(limit)
    .fetch_all(executor)
    .await
}

pub async fn find_sale_by_reservation(
    executor: impl PgExecutor<'_>,
    reservation_id: Uuid,
) -> sqlx::Result<Option<Sale>> {
    query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE reservation_id = $1"
    ))
    .bind(reservation_id)
    .fetch_optional(executor)
    .await
}

pub async fn insert_sale(
    executor: impl PgExecutor<'_>,
    reservation: &Reservation,
) -> sqlx::Result<Sale> {
    query_as::<_, Sale>(&format!(
        "INSERT INTO sales (reservation_id, user_id, session_id, total_amount) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {SALE_COLUMNS}"
    ))
    .bind(reservation.id)
    .bind(reservation.user_id)
    .bind(reservation.session_id)
    .bind(&reservation.total_amount)
    .fetch_one(executor)
    .await
}

pub async fn sales_by_user(
    executor: impl PgExecutor<'_>,
    user_id: Uuid,
) -> sqlx::Result<Vec<Sale>> {
    query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await
}
