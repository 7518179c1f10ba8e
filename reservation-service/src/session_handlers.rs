use axum::extract::{Path, State};
use axum::Json;
use common_http_errors::ApiError;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::model::{count_seats_by_status, SeatResponse, SeatStatusCount};
use crate::repo;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAvailabilityResponse {
    pub session_id: Uuid,
    pub seats: Vec<SeatResponse>,
    pub summary: SeatStatusCount,
}

pub async fn session_seats(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SeatAvailabilityResponse>, ApiError> {
    let session = repo::find_session(&state.db, session_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| {
            ApiError::not_found(
                "session_not_found",
                format!("Session with ID {session_id} not found"),
            )
        })?;

    let seats = repo::seats_by_session(&state.db, session.id)
        .await
        .map_err(ApiError::internal)?;
    let summary = count_seats_by_status(&seats);

    Ok(Json(SeatAvailabilityResponse {
        session_id: session.id,
        seats: seats.iter().map(SeatResponse::from).collect(),
        summary,
    }))
}
