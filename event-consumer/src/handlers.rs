use common_events::CinemaEvent;
use tracing::info;

pub fn dispatch(event: &CinemaEvent) -> anyhow::Result<()> {
    match event {
        CinemaEvent::ReservationCreated(e) => {
            info!(event_id = %e.event_id, reservation_id = %e.reservation_id, user_id = %e.user_id, "reservation created");
        }
        CinemaEvent::ReservationExpired(e) => {
            info!(event_id = %e.event_id, reservation_id = %e.reservation_id, "reservation expired");
        }
        CinemaEvent::PaymentConfirmed(e) => {
            info!(event_id = %e.event_id, sale_id = %e.sale_id, amount = e.amount, "payment confirmed");
        }
        CinemaEvent::SeatReleased(e) => {
            info!(event_id = %e.event_id, session_id = %e.session_id, seats = e.seat_ids.len(), "seats released");
        }
    }
    Ok(())
}
