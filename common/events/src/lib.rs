pub mod model;
pub mod publisher;

pub use model::{
    CinemaEvent, EventError, EventResult, PaymentEvent, ReservationEvent, SeatEvent,
    BATCH_SIZE, BATCH_TIMEOUT_MS, DLQ_TOPIC, EVENT_TOPICS, PREFETCH_MULTIPLIER, TOPIC_PREFIX,
};
pub use publisher::EventPublisher;
