//! Periodic delivery scheduling.

pub mod delivery_timer;
pub mod error;

pub use delivery_timer::{DeliveryTimer, DeliveryTimerConfig, FlushTrigger};
pub use error::SchedulerError;
