use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use common_events::CinemaEvent;
use common_http_errors::ApiError;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::{publish_best_effort, AppState};
use crate::lock::seat_lock_resource;
use crate::model::{
    compute_total_amount, unavailable_seat_labels, Reservation, ReservationResponse,
    ReservationStatus, SeatStatus,
};
use crate::repo;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub seat_ids: Vec<Uuid>,
}

pub async fn create_reservation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if payload.seat_ids.is_empty() {
        return Err(ApiError::bad_request(
            "empty_reservation",
            "Reservation must include at least one seat",
        ));
    }

    let mut seat_ids = payload.seat_ids.clone();
    seat_ids.sort();
    seat_ids.dedup();

    if let Some(key) = idempotency_key.as_deref() {
        if let Some(existing) = repo::find_reservation_by_idempotency_key(&state.db, key)
            .await
            .map_err(ApiError::internal)?
        {
            info!(reservation_id = %existing.id, "returning existing reservation for idempotency key");
            let response = reservation_response(&state, existing).await?;
            return Ok((StatusCode::CREATED, Json(response)));
        }
    }

    let resource = seat_lock_resource(payload.session_id, &seat_ids);
    let response = state
        .locks
        .with_lock(&resource, state.lock_ttl, || {
            create_reservation_tx(&state, &payload, idempotency_key.as_deref(), &seat_ids)
        })
        .await
        .map_err(|err| {
            if let ApiError::Conflict { code, .. } = &err {
                if *code == "resource_busy" {
                    state.metrics.lock_busy.inc();
                }
            }
            err
        })?;

    Ok((StatusCode::CREATED, Json(response)))
}

async fn create_reservation_tx(
    state: &AppState,
    payload: &CreateReservationRequest,
    idempotency_key: Option<&str>,
    seat_ids: &[Uuid],
) -> Result<ReservationResponse, ApiError> {
    let mut tx = state.db.begin().await.map_err(ApiError::internal)?;
    // The distributed lock is a fast path only; serializable isolation is the
    // correctness guarantee against whatever the lock did not cover.
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

    let session = repo::find_session(&mut *tx, payload.session_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| {
            ApiError::not_found(
                "session_not_found",
                format!("Session with ID {} not found", payload.session_id),
            )
        })?;

    let seats = repo::seats_for_update(&mut *tx, payload.session_id, seat_ids)
        .await
        .map_err(ApiError::internal)?;
    if seats.len() != seat_ids.len() {
        return Err(ApiError::not_found(
            "seats_not_found",
            "One or more seats not found",
        ));
    }

    let unavailable = unavailable_seat_labels(&seats);
    if !unavailable.is_empty() {
        state.metrics.seat_conflicts.inc();
        return Err(ApiError::conflict(
            "seats_unavailable",
            format!("Seats not available: {}", unavailable.join(", ")),
        ));
    }

    let total_amount = compute_total_amount(seats.len(), &session.ticket_price);
    let ttl = chrono::Duration::from_std(state.reservation_ttl).map_err(ApiError::internal)?;
    let expires_at = Utc::now() + ttl;

    let inserted = repo::insert_reservation(
        &mut *tx,
        payload.user_id,
        payload.session_id,
        expires_at,
        idempotency_key,
        &total_amount,
    )
    .await;
    let reservation = match inserted {
        Ok(reservation) => reservation,
        Err(err) if repo::is_unique_violation(&err) => {
            // A concurrent writer won the idempotency-key race between the
            // pre-check and this insert; hand back the winner's reservation.
            drop(tx);
            if let Some(key) = idempotency_key {
                if let Some(existing) =
                    repo::find_reservation_by_idempotency_key(&state.db, key)
                        .await
                        .map_err(ApiError::internal)?
                {
                    info!(reservation_id = %existing.id, "returning existing reservation after idempotency-key race");
                    return reservation_response(state, existing).await;
                }
            }
            return Err(ApiError::internal(err));
        }
        Err(err) => return Err(ApiError::internal(err)),
    };

    repo::link_reservation_seats(&mut *tx, reservation.id, seat_ids)
        .await
        .map_err(ApiError::internal)?;
    repo::update_seats_status(&mut *tx, seat_ids, SeatStatus::Reserved)
        .await
        .map_err(ApiError::internal)?;
    let seats = repo::seats_of_reservation(&mut *tx, reservation.id)
        .await
        .map_err(ApiError::internal)?;

    tx.commit().await.map_err(ApiError::internal)?;

    state.metrics.reservations_created.inc();
    info!(reservation_id = %reservation.id, seats = seats.len(), "reservation created");

    let event = CinemaEvent::reservation_created(
        reservation.id,
        reservation.user_id,
        reservation.session_id,
        seat_ids.to_vec(),
    );
    publish_best_effort(state, event).await;

    Ok(ReservationResponse::new(&reservation, seats))
}

pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = repo::find_reservation(&state.db, id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| {
            ApiError::not_found(
                "reservation_not_found",
                format!("Reservation with ID {id} not found"),
            )
        })?;
    let response = reservation_response(&state, reservation).await?;
    Ok(Json(response))
}

pub async fn cancel_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let mut tx = state.db.begin().await.map_err(ApiError::internal)?;

    let mut reservation = repo::reservation_for_update(&mut *tx, id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| {
            ApiError::not_found(
                "reservation_not_found",
                format!("Reservation with ID {id} not found"),
            )
        })?;

    if reservation.status != ReservationStatus::Pending.as_str() {
        return Err(ApiError::bad_request(
            "reservation_not_pending",
            "Only pending reservations can be cancelled",
        ));
    }

    let seat_ids: Vec<Uuid> = repo::seats_of_reservation(&mut *tx, id)
        .await
        .map_err(ApiError::internal)?
        .iter()
        .map(|s| s.id)
        .collect();

    repo::update_reservation_status(&mut *tx, id, ReservationStatus::Cancelled)
        .await
        .map_err(ApiError::internal)?;
    if !seat_ids.is_empty() {
        repo::update_seats_status(&mut *tx, &seat_ids, SeatStatus::Available)
            .await
            .map_err(ApiError::internal)?;
    }
    let seats = repo::seats_of_reservation(&mut *tx, id)
        .await
        .map_err(ApiError::internal)?;

    tx.commit().await.map_err(ApiError::internal)?;

    reservation.status = ReservationStatus::Cancelled.as_str().to_string();
    state.metrics.reservations_cancelled.inc();
    info!(reservation_id = %id, "reservation cancelled");

    publish_best_effort(
        &state,
        CinemaEvent::seat_released(reservation.session_id, seat_ids),
    )
    .await;

    Ok(Json(ReservationResponse::new(&reservation, seats)))
}

async fn reservation_response(
    state: &AppState,
    reservation: Reservation,
) -> Result<ReservationResponse, ApiError> {
    let seats = repo::seats_of_reservation(&state.db, reservation.id)
        .await
        .map_err(ApiError::internal)?;
    Ok(ReservationResponse::new(&reservation, seats))
}
