use common_events::{CinemaEvent, EVENT_TOPICS, TOPIC_PREFIX};
use uuid::Uuid;

#[test]
fn created_event_envelope_shape() {
    let session_id = Uuid::new_v4();
    let event = CinemaEvent::reservation_created(
        Uuid::new_v4(),
        Uuid::new_v4(),
        session_id,
        vec![Uuid::new_v4(), Uuid::new_v4()],
    );

    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "reservation.created");
    assert!(value["eventId"].is_string());
    assert!(value["reservationId"].is_string());
    assert!(value["userId"].is_string());
    assert_eq!(value["sessionId"], session_id.to_string());
    assert_eq!(value["seatIds"].as_array().unwrap().len(), 2);
    assert!(value["timestamp"].is_string());
}

#[test]
fn payment_event_round_trips_through_tag() {
    let event = CinemaEvent::payment_confirmed(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        Uuid::new_v4(),
        45.50,
    );
    let json = serde_json::to_string(&event).unwrap();
    let back: CinemaEvent = serde_json::from_str(&json).unwrap();
    match back {
        CinemaEvent::PaymentConfirmed(e) => assert_eq!(e.amount, 45.50),
        other => panic!("wrong variant: {other:?}"),
    }
}

#[test]
fn routing_keys_map_to_subscribed_topics() {
    let session_id = Uuid::new_v4();
    let events = [
        CinemaEvent::reservation_created(Uuid::new_v4(), Uuid::new_v4(), session_id, vec![]),
        CinemaEvent::reservation_expired(Uuid::new_v4(), Uuid::new_v4(), session_id, vec![]),
        CinemaEvent::payment_confirmed(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), session_id, 1.0),
        CinemaEvent::seat_released(session_id, vec![]),
    ];
    for event in &events {
        let topic = event.topic();
        assert!(topic.starts_with(TOPIC_PREFIX));
        assert!(EVENT_TOPICS.contains(&topic.as_str()), "unknown topic {topic}");
        assert_eq!(event.partition_key(), session_id.to_string());
    }
}

#[test]
fn malformed_payload_is_rejected() {
    let err = serde_json::from_str::<CinemaEvent>(r#"{"type":"seat.broken"}"#);
    assert!(err.is_err());
    let err = serde_json::from_str::<CinemaEvent>("not json at all");
    assert!(err.is_err());
}
