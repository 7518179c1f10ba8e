use reservation_service::model::{
    count_seats_by_status, is_valid_reservation_transition, is_valid_seat_transition,
    unavailable_seat_labels, ReservationStatus, Seat, SeatStatus,
};
use uuid::Uuid;

fn seat(label: &str, status: SeatStatus) -> Seat {
    Seat {
        id: Uuid::new_v4(),
        session_id: Uuid::new_v4(),
        seat_label: label.to_string(),
        status: status.as_str().to_string(),
        version: 1,
    }
}

#[test]
fn seat_lifecycle_transitions() {
    assert!(is_valid_seat_transition("AVAILABLE", SeatStatus::Reserved));
    assert!(is_valid_seat_transition("RESERVED", SeatStatus::Sold));
    assert!(is_valid_seat_transition("RESERVED", SeatStatus::Available));

    // SOLD is terminal
    assert!(!is_valid_seat_transition("SOLD", SeatStatus::Available));
    assert!(!is_valid_seat_transition("SOLD", SeatStatus::Reserved));
    // no skipping straight to SOLD
    assert!(!is_valid_seat_transition("AVAILABLE", SeatStatus::Sold));
    assert!(!is_valid_seat_transition("bogus", SeatStatus::Reserved));
}

#[test]
fn pending_is_the_only_non_terminal_reservation_state() {
    for to in [
        ReservationStatus::Confirmed,
        ReservationStatus::Expired,
        ReservationStatus::Cancelled,
    ] {
        assert!(is_valid_reservation_transition("PENDING", to));
    }
    for from in ["CONFIRMED", "EXPIRED", "CANCELLED"] {
        assert!(!is_valid_reservation_transition(from, ReservationStatus::Pending));
        assert!(!is_valid_reservation_transition(from, ReservationStatus::Confirmed));
    }
}

#[test]
fn status_round_trips_through_strings() {
    for status in [SeatStatus::Available, SeatStatus::Reserved, SeatStatus::Sold] {
        assert_eq!(SeatStatus::from_str(status.as_str()), Some(status));
    }
    assert_eq!(SeatStatus::from_str("available"), None);
    assert_eq!(ReservationStatus::from_str("PENDING"), Some(ReservationStatus::Pending));
}

#[test]
fn unavailable_labels_name_only_the_offending_seats() {
    let seats = vec![
        seat("A1", SeatStatus::Reserved),
        seat("A2", SeatStatus::Available),
        seat("A3", SeatStatus::Sold),
    ];
    assert_eq!(unavailable_seat_labels(&seats), vec!["A1", "A3"]);

    let all_free = vec![seat("B1", SeatStatus::Available)];
    assert!(unavailable_seat_labels(&all_free).is_empty());
}

#[test]
fn seat_counts_by_status() {
    let seats = vec![
        seat("A1", SeatStatus::Available),
        seat("A2", SeatStatus::Available),
        seat("A3", SeatStatus::Reserved),
        seat("A4", SeatStatus::Sold),
    ];
    let counts = count_seats_by_status(&seats);
    assert_eq!(counts.available, 2);
    assert_eq!(counts.reserved, 1);
    assert_eq!(counts.sold, 1);
    assert_eq!(counts.total, 4);
}
