//! Delivery timer lifecycle errors.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("delivery timer is already running")]
    AlreadyRunning,

    #[error("delivery timer is not running")]
    NotRunning,

    #[error("delivery timer did not stop within {timeout:?}")]
    ShutdownTimeout { timeout: Duration },

    #[error("delivery timer task failed: {0}")]
    TaskFailed(String),
}
