use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use common_events::CinemaEvent;
use common_http_errors::ApiError;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::app::{publish_best_effort, AppState};
use crate::model::{amount_as_f64, ReservationStatus, SaleResponse, SeatStatus};
use crate::repo;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    pub reservation_id: Uuid,
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<(StatusCode, Json<SaleResponse>), ApiError> {
    let mut tx = state.db.begin().await.map_err(ApiError::internal)?;

    let reservation = repo::reservation_for_update(&mut *tx, payload.reservation_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| {
            ApiError::not_found(
                "reservation_not_found",
                format!("Reservation with ID {} not found", payload.reservation_id),
            )
        })?;

    // A retried confirm is a no-op, not an error.
    if let Some(existing) = repo::find_sale_by_reservation(&mut *tx, reservation.id)
        .await
        .map_err(ApiError::internal)?
    {
        tx.commit().await.map_err(ApiError::internal)?;
        info!(reservation_id = %reservation.id, sale_id = %existing.id, "payment already confirmed");
        return Ok((StatusCode::CREATED, Json(SaleResponse::from(&existing))));
    }

    if reservation.status != ReservationStatus::Pending.as_str() {
        return Err(ApiError::bad_request(
            "reservation_not_pending",
            format!(
                "Reservation is {}, cannot confirm payment",
                reservation.status.to_lowercase()
            ),
        ));
    }

    if Utc::now() > reservation.expires_at {
        return Err(ApiError::bad_request(
            "reservation_expired",
            "Reservation has expired",
        ));
    }

    repo::update_reservation_status(&mut *tx, reservation.id, ReservationStatus::Confirmed)
        .await
        .map_err(ApiError::internal)?;

    let seat_ids: Vec<Uuid> = repo::seats_of_reservation(&mut *tx, reservation.id)
        .await
        .map_err(ApiError::internal)?
        .iter()
        .map(|s| s.id)
        .collect();
    if !seat_ids.is_empty() {
        repo::update_seats_status(&mut *tx, &seat_ids, SeatStatus::Sold)
            .await
            .map_err(ApiError::internal)?;
    }

    let sale = match repo::insert_sale(&mut *tx, &reservation).await {
        Ok(sale) => sale,
        Err(err) if repo::is_unique_violation(&err) => {
            // The row lock should have serialized us; the unique constraint on
            // reservation_id is the final backstop. A racing confirm already
            // recorded the sale, so return it.
            drop(tx);
            let existing = repo::find_sale_by_reservation(&state.db, reservation.id)
                .await
                .map_err(ApiError::internal)?
                .ok_or_else(|| ApiError::internal(err))?;
            info!(reservation_id = %reservation.id, sale_id = %existing.id, "payment already confirmed by concurrent request");
            return Ok((StatusCode::CREATED, Json(SaleResponse::from(&existing))));
        }
        Err(err) => return Err(ApiError::internal(err)),
    };

    tx.commit().await.map_err(ApiError::internal)?;

    state.metrics.sales_confirmed.inc();
    info!(sale_id = %sale.id, reservation_id = %reservation.id, "payment confirmed");

    let event = CinemaEvent::payment_confirmed(
        sale.id,
        reservation.id,
        reservation.user_id,
        reservation.session_id,
        amount_as_f64(&sale.total_amount),
    );
    publish_best_effort(&state, event).await;

    Ok((StatusCode::CREATED, Json(SaleResponse::from(&sale))))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseHistoryResponse {
    pub user_id: Uuid,
    pub purchases: Vec<SaleResponse>,
    pub total_purchases: usize,
}

pub async fn purchase_history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PurchaseHistoryResponse>, ApiError> {
    let sales = repo::sales_by_user(&state.db, user_id)
        .await
        .map_err(ApiError::internal)?;
    let purchases: Vec<SaleResponse> = sales.iter().map(SaleResponse::from).collect();
    Ok(Json(PurchaseHistoryResponse {
        user_id,
        total_purchases: purchases.len(),
        purchases,
    }))
}
