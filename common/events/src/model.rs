use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub const TOPIC_PREFIX: &str = "cinema.";
pub const DLQ_TOPIC: &str = "cinema.dlq";

/// Topics the consumer subscribes to, one per routing key.
pub const EVENT_TOPICS: [&str; 4] = [
    "cinema.reservation.created",
    "cinema.reservation.expired",
    "cinema.payment.confirmed",
    "cinema.seat.released",
];

pub const BATCH_SIZE: usize = 10;
pub const BATCH_TIMEOUT_MS: u64 = 1000;
pub const PREFETCH_MULTIPLIER: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationEvent {
    pub event_id: Uuid,
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub event_id: Uuid,
    pub sale_id: Uuid,
    pub reservation_id: Uuid,
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatEvent {
    pub event_id: Uuid,
    pub session_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    pub timestamp: DateTime<Utc>,
}

/// One fact per state transition. The tag doubles as the routing key, so the
/// wire envelope is `{"type": "reservation.created", "eventId": ..., ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CinemaEvent {
    #[serde(rename = "reservation.created")]
    ReservationCreated(ReservationEvent),
    #[serde(rename = "reservation.expired")]
    ReservationExpired(ReservationEvent),
    #[serde(rename = "payment.confirmed")]
    PaymentConfirmed(PaymentEvent),
    #[serde(rename = "seat.released")]
    SeatReleased(SeatEvent),
}

impl CinemaEvent {
    pub fn reservation_created(
        reservation_id: Uuid,
        user_id: Uuid,
        session_id: Uuid,
        seat_ids: Vec<Uuid>,
    ) -> Self {
        Self::ReservationCreated(ReservationEvent {
            event_id: Uuid::new_v4(),
            reservation_id,
            user_id,
            session_id,
            seat_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn reservation_expired(
        reservation_id: Uuid,
        user_id: Uuid,
        session_id: Uuid,
        seat_ids: Vec<Uuid>,
    ) -> Self {
        Self::ReservationExpired(ReservationEvent {
            event_id: Uuid::new_v4(),
            reservation_id,
            user_id,
            session_id,
            seat_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn payment_confirmed(
        sale_id: Uuid,
        reservation_id: Uuid,
        user_id: Uuid,
        session_id: Uuid,
        amount: f64,
    ) -> Self {
        Self::PaymentConfirmed(PaymentEvent {
            event_id: Uuid::new_v4(),
            sale_id,
            reservation_id,
            user_id,
            session_id,
            amount,
            timestamp: Utc::now(),
        })
    }

    pub fn seat_released(session_id: Uuid, seat_ids: Vec<Uuid>) -> Self {
        Self::SeatReleased(SeatEvent {
            event_id: Uuid::new_v4(),
            session_id,
            seat_ids,
            timestamp: Utc::now(),
        })
    }

    pub fn event_id(&self) -> Uuid {
        match self {
            Self::ReservationCreated(e) | Self::ReservationExpired(e) => e.event_id,
            Self::PaymentConfirmed(e) => e.event_id,
            Self::SeatReleased(e) => e.event_id,
        }
    }

    pub fn routing_key(&self) -> &'static str {
        match self {
            Self::ReservationCreated(_) => "reservation.created",
            Self::ReservationExpired(_) => "reservation.expired",
            Self::PaymentConfirmed(_) => "payment.confirmed",
            Self::SeatReleased(_) => "seat.released",
        }
    }

    pub fn topic(&self) -> String {
        format!("{TOPIC_PREFIX}{}", self.routing_key())
    }

    /// Messages for one session stay on one partition so consumers observe a
    /// session's transitions in order.
    pub fn partition_key(&self) -> String {
        match self {
            Self::ReservationCreated(e) | Self::ReservationExpired(e) => e.session_id.to_string(),
            Self::PaymentConfirmed(e) => e.session_id.to_string(),
            Self::SeatReleased(e) => e.session_id.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("producer not configured")]
    NotConfigured,
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("kafka error: {0}")]
    Kafka(String),
}

pub type EventResult<T> = Result<T, EventError>;
