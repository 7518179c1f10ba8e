use prometheus::{IntCounter, Histogram, Registry, IntCounterVec};

#[derive(Clone)]
pub struct ReservationMetrics {
    pub registry: Registry,
    pub reservations_created: IntCounter,
    pub reservations_cancelled: IntCounter,
    pub reservations_expired: IntCounter,
    pub sales_confirmed: IntCounter,
    pub seat_conflicts: IntCounter,
    pub lock_busy: IntCounter,
    pub event_publish_failures: IntCounter,
    pub sweeper_duration_seconds: Histogram,
    pub http_errors_total: IntCounterVec,
}

impl ReservationMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();
        let reservations_created = IntCounter::new(
            "reservations_created_total",
            "Reservations created",
        ).unwrap();
        let reservations_cancelled = IntCounter::new(
            "reservations_cancelled_total",
            "Reservations cancelled by the user",
        ).unwrap();
        let reservations_expired = IntCounter::new(
            "reservations_expired_total",
            "Reservations expired by the sweeper",
        ).unwrap();
        let sales_confirmed = IntCounter::new(
            "sales_confirmed_total",
            "Payments confirmed into sales",
        ).unwrap();
        let seat_conflicts = IntCounter::new(
            "seat_conflicts_total",
            "Reservation attempts rejected because a seat was taken",
        ).unwrap();
        let lock_busy = IntCounter::new(
            "lock_busy_total",
            "Reservation attempts rejected because the seat lock stayed busy",
        ).unwrap();
        let event_publish_failures = IntCounter::new(
            "event_publish_failures_total",
            "Event emissions that failed after commit",
        ).unwrap();
        let sweeper_duration_seconds = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "reservation_sweeper_duration_seconds",
                "Duration of a reservation expiration sweep"
            ).buckets(vec![0.01,0.05,0.1,0.25,0.5,1.0,2.0,5.0])
        ).unwrap();
        let http_errors_total = IntCounterVec::new(
            prometheus::Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)"
            ),
            &["service", "code", "status"]
        ).unwrap();
        let _ = registry.register(Box::new(reservations_created.clone()));
        let _ = registry.register(Box::new(reservations_cancelled.clone()));
        let _ = registry.register(Box::new(reservations_expired.clone()));
        let _ = registry.register(Box::new(sales_confirmed.clone()));
        let _ = registry.register(Box::new(seat_conflicts.clone()));
        let _ = registry.register(Box::new(lock_busy.clone()));
        let _ = registry.register(Box::new(event_publish_failures.clone()));
        let _ = registry.register(Box::new(sweeper_duration_seconds.clone()));
        let _ = registry.register(Box::new(http_errors_total.clone()));
        ReservationMetrics {
            registry,
            reservations_created,
            reservations_cancelled,
            reservations_expired,
            sales_confirmed,
            seat_conflicts,
            lock_busy,
            event_publish_failures,
            sweeper_duration_seconds,
            http_errors_total,
        }
    }
}

impl Default for ReservationMetrics {
    fn default() -> Self { Self::new() }
}
