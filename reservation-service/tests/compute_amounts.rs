use bigdecimal::BigDecimal;
use reservation_service::model::{amount_as_f64, compute_total_amount};
use std::str::FromStr;

#[test]
fn total_is_seat_count_times_ticket_price() {
    let price = BigDecimal::from_str("25.50").unwrap();
    let total = compute_total_amount(3, &price);
    assert_eq!(total, BigDecimal::from_str("76.50").unwrap());
}

#[test]
fn single_seat_total_equals_price() {
    let price = BigDecimal::from_str("12.00").unwrap();
    assert_eq!(compute_total_amount(1, &price), price);
}

#[test]
fn amounts_survive_decimal_cents() {
    // 7 * 9.99 = 69.93 exactly in decimal, which f64 alone would not keep
    let price = BigDecimal::from_str("9.99").unwrap();
    let total = compute_total_amount(7, &price);
    assert_eq!(total, BigDecimal::from_str("69.93").unwrap());
    assert!((amount_as_f64(&total) - 69.93).abs() < 1e-9);
}
