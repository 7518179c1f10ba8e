use reservation_service::seat_lock_resource;
use uuid::Uuid;

#[test]
fn same_seat_set_in_any_order_yields_same_resource() {
    let session = Uuid::new_v4();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let c = Uuid::new_v4();

    let key1 = seat_lock_resource(session, &[a, b, c]);
    let key2 = seat_lock_resource(session, &[c, a, b]);
    let key3 = seat_lock_resource(session, &[b, c, a]);
    assert_eq!(key1, key2);
    assert_eq!(key2, key3);
}

#[test]
fn resource_embeds_session_and_all_seats() {
    let session = Uuid::new_v4();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    let key = seat_lock_resource(session, &[a, b]);
    assert!(key.starts_with(&format!("session:{session}:seats:")));
    assert!(key.contains(&a.to_string()));
    assert!(key.contains(&b.to_string()));
}

#[test]
fn different_seat_sets_do_not_collide() {
    let session = Uuid::new_v4();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    assert_ne!(
        seat_lock_resource(session, &[a]),
        seat_lock_resource(session, &[b])
    );
    assert_ne!(
        seat_lock_resource(session, &[a]),
        seat_lock_resource(session, &[a, b])
    );
}
