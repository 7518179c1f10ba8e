pub mod app;
pub mod lock;
pub mod model;
pub mod payment_handlers;
pub mod repo;
pub mod reservation_handlers;
pub mod session_handlers;
pub mod sweeper;

pub use app::{build_router, AppState};
pub use lock::{seat_lock_resource, RedisLockManager};
pub use sweeper::{ExpirationSweeper, SweepOutcome, DEFAULT_EXPIRATION_BATCH_LIMIT};
