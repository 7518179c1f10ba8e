use crate::{CinemaEvent, EventError, EventResult};
use rdkafka::message::OwnedHeaders;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::time::Duration;
use tracing::debug;

const ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Publishes committed facts to the broker. Awaiting the delivery report is
/// the publisher acknowledgement; callers decide whether a failure matters
/// (after a commit it never does: log, count, move on).
#[derive(Clone)]
pub struct EventPublisher {
    inner: Option<FutureProducer>,
}

impl EventPublisher {
    pub fn new(inner: Option<FutureProducer>) -> Self {
        Self { inner }
    }

    /// Messaging disabled at runtime; every publish returns `NotConfigured`.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub async fn publish(&self, event: &CinemaEvent) -> EventResult<()> {
        let Some(producer) = &self.inner else {
            return Err(EventError::NotConfigured);
        };
        let payload =
            serde_json::to_vec(event).map_err(|e| EventError::Serialization(e.to_string()))?;
        let topic = event.topic();
        let key = event.partition_key();
        let event_id = event.event_id().to_string();
        let headers = OwnedHeaders::new()
            .add("messageId", &event_id)
            .add("type", event.routing_key());
        let record = FutureRecord::to(&topic)
            .key(&key)
            .payload(&payload)
            .headers(headers);
        match producer.send(record, ACK_TIMEOUT).await {
            Ok(_) => {
                debug!(topic = %topic, event_id = %event_id, "event published");
                Ok(())
            }
            Err((e, _)) => Err(EventError::Kafka(e.to_string())),
        }
    }
}
