use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Available,
    Reserved,
    Sold,
}

impl SeatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatStatus::Available => "AVAILABLE",
            SeatStatus::Reserved => "RESERVED",
            SeatStatus::Sold => "SOLD",
        }
    }

    pub fn from_str(s: &str) -> Option<SeatStatus> {
        match s {
            "AVAILABLE" => Some(SeatStatus::Available),
            "RESERVED" => Some(SeatStatus::Reserved),
            "SOLD" => Some(SeatStatus::Sold),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Expired,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Expired => "EXPIRED",
            ReservationStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<ReservationStatus> {
        match s {
            "PENDING" => Some(ReservationStatus::Pending),
            "CONFIRMED" => Some(ReservationStatus::Confirmed),
            "EXPIRED" => Some(ReservationStatus::Expired),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

/// Valid transitions:
/// AVAILABLE -> RESERVED
/// RESERVED -> SOLD | AVAILABLE
/// SOLD is terminal.
pub fn is_valid_seat_transition(from_status: &str, to: SeatStatus) -> bool {
    match SeatStatus::from_str(from_status) {
        Some(SeatStatus::Available) => matches!(to, SeatStatus::Reserved),
        Some(SeatStatus::Reserved) => matches!(to, SeatStatus::Sold | SeatStatus::Available),
        Some(SeatStatus::Sold) => false,
        None => false,
    }
}

/// PENDING is the only non-terminal reservation state.
pub fn is_valid_reservation_transition(from_status: &str, to: ReservationStatus) -> bool {
    match ReservationStatus::from_str(from_status) {
        Some(ReservationStatus::Pending) => matches!(
            to,
            ReservationStatus::Confirmed | ReservationStatus::Expired | ReservationStatus::Cancelled
        ),
        Some(_) => false,
        None => false,
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Seat {
    pub id: Uuid,
    pub session_id: Uuid,
    pub seat_label: String,
    pub status: String,
    pub version: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: Uuid,
    pub movie_title: String,
    pub room: String,
    pub start_time: DateTime<Utc>,
    pub ticket_price: BigDecimal,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub idempotency_key: Option<String>,
    pub total_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Sale {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub total_amount: BigDecimal,
    pub payment_confirmed_at: DateTime<Utc>,
}

pub fn unavailable_seat_labels(seats: &[Seat]) -> Vec<String> {
    seats
        .iter()
        .filter(|s| s.status != SeatStatus::Available.as_str())
        .map(|s| s.seat_label.clone())
        .collect()
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeatStatusCount {
    pub available: usize,
    pub reserved: usize,
    pub sold: usize,
    pub total: usize,
}

pub fn count_seats_by_status(seats: &[Seat]) -> SeatStatusCount {
    let mut counts = SeatStatusCount {
        total: seats.len(),
        ..SeatStatusCount::default()
    };
    for seat in seats {
        match SeatStatus::from_str(&seat.status) {
            Some(SeatStatus::Available) => counts.available += 1,
            Some(SeatStatus::Reserved) => counts.reserved += 1,
            Some(SeatStatus::Sold) => counts.sold += 1,
            None => {}
        }
    }
    counts
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatResponse {
    pub id: Uuid,
    pub seat_label: String,
    pub status: String,
}

impl From<&Seat> for SeatResponse {
    fn from(seat: &Seat) -> Self {
        SeatResponse {
            id: seat.id,
            seat_label: seat.seat_label.clone(),
            status: seat.status.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub total_amount: f64,
    pub seats: Vec<SeatResponse>,
}

impl ReservationResponse {
    pub fn new(reservation: &Reservation, mut seats: Vec<Seat>) -> Self {
        seats.sort_by(|a, b| a.seat_label.cmp(&b.seat_label));
        ReservationResponse {
            id: reservation.id,
            user_id: reservation.user_id,
            session_id: reservation.session_id,
            status: reservation.status.clone(),
            expires_at: reservation.expires_at,
            total_amount: amount_as_f64(&reservation.total_amount),
            seats: seats.iter().map(SeatResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleResponse {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub total_amount: f64,
    pub payment_confirmed_at: DateTime<Utc>,
}

impl From<&Sale> for SaleResponse {
    fn from(sale: &Sale) -> Self {
        SaleResponse {
            id: sale.id,
            reservation_id: sale.reservation_id,
            user_id: sale.user_id,
            session_id: sale.session_id,
            total_amount: amount_as_f64(&sale.total_amount),
            payment_confirmed_at: sale.payment_confirmed_at,
        }
    }
}

pub fn amount_as_f64(amount: &BigDecimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

pub fn compute_total_amount(seat_count: usize, ticket_price: &BigDecimal) -> BigDecimal {
    BigDecimal::from(seat_count as i64) * ticket_price
}
