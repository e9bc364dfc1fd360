//! Periodic delivery timer.
//!
//! Ticks at the configured upload interval and hands each tick to the
//! flush trigger. The timer owns no queue state; it only decides when a
//! periodic flush happens and whether a heartbeat call rides along. Each
//! tick runs to completion before the next is considered, so a slow
//! flush delays ticks instead of stacking them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_domain::UploadInterval;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::SchedulerError;

/// What the timer fires into on every tick. Implemented by the request
/// sender; mocked in tests.
#[async_trait]
pub trait FlushTrigger: Send + Sync {
    async fn tick(&self, send_heartbeat: bool);
}

/// Configuration for [`DeliveryTimer`].
#[derive(Debug, Clone)]
pub struct DeliveryTimerConfig {
    /// Time between periodic flushes.
    pub interval: Duration,
    /// Whether each tick enqueues a heartbeat call before flushing.
    pub send_heartbeat: bool,
    /// How long `stop` waits for the loop to finish its current tick.
    pub shutdown_timeout: Duration,
}

impl Default for DeliveryTimerConfig {
    fn default() -> Self {
        Self {
            interval: UploadInterval::default().as_duration(),
            send_heartbeat: true,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl DeliveryTimerConfig {
    /// Config for one of the recognized upload intervals.
    pub fn for_interval(interval: UploadInterval) -> Self {
        Self { interval: interval.as_duration(), ..Self::default() }
    }
}

/// Recurring background task driving periodic flushes.
pub struct DeliveryTimer {
    trigger: Arc<dyn FlushTrigger>,
    config: DeliveryTimerConfig,
    cancellation: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl DeliveryTimer {
    pub fn new(trigger: Arc<dyn FlushTrigger>, config: DeliveryTimerConfig) -> Self {
        Self { trigger, config, cancellation: CancellationToken::new(), handle: None }
    }

    /// Spawn the timer loop.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.handle.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let trigger = Arc::clone(&self.trigger);
        let interval = self.config.interval;
        let send_heartbeat = self.config.send_heartbeat;
        let cancellation = self.cancellation.clone();

        info!(interval_secs = interval.as_secs(), send_heartbeat, "starting delivery timer");

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; the first
            // flush should wait a full period.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => {
                        debug!("delivery timer cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        debug!("delivery timer tick");
                        trigger.tick(send_heartbeat).await;
                    }
                }
            }
        }));

        Ok(())
    }

    /// Cancel the loop and wait for it to finish its current tick.
    pub async fn stop(&mut self) -> Result<(), SchedulerError> {
        let handle = self.handle.take().ok_or(SchedulerError::NotRunning)?;

        self.cancellation.cancel();
        // Fresh token so a stopped timer can be started again.
        self.cancellation = CancellationToken::new();

        let timeout = self.config.shutdown_timeout;
        match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(())) => {
                info!("delivery timer stopped");
                Ok(())
            }
            Ok(Err(join_err)) => Err(SchedulerError::TaskFailed(join_err.to_string())),
            Err(_) => Err(SchedulerError::ShutdownTimeout { timeout }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for DeliveryTimer {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("delivery timer dropped while running, cancelling its task");
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct RecordingTrigger {
        ticks: AtomicUsize,
        saw_heartbeat: AtomicBool,
    }

    #[async_trait]
    impl FlushTrigger for RecordingTrigger {
        async fn tick(&self, send_heartbeat: bool) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            if send_heartbeat {
                self.saw_heartbeat.store(true, Ordering::SeqCst);
            }
        }
    }

    fn fast_config(send_heartbeat: bool) -> DeliveryTimerConfig {
        DeliveryTimerConfig {
            interval: Duration::from_millis(20),
            send_heartbeat,
            shutdown_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn ticks_repeatedly_at_the_configured_interval() {
        let trigger = Arc::new(RecordingTrigger::default());
        let mut timer = DeliveryTimer::new(trigger.clone(), fast_config(true));

        timer.start().unwrap();
        tokio::time::sleep(Duration::from_millis(90)).await;
        timer.stop().await.unwrap();

        assert!(trigger.ticks.load(Ordering::SeqCst) >= 2);
        assert!(trigger.saw_heartbeat.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn heartbeat_flag_is_forwarded_when_disabled() {
        let trigger = Arc::new(RecordingTrigger::default());
        let mut timer = DeliveryTimer::new(trigger.clone(), fast_config(false));

        timer.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        timer.stop().await.unwrap();

        assert!(trigger.ticks.load(Ordering::SeqCst) >= 1);
        assert!(!trigger.saw_heartbeat.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn double_start_and_stop_without_start_are_rejected() {
        let trigger = Arc::new(RecordingTrigger::default());
        let mut timer = DeliveryTimer::new(trigger, fast_config(true));

        assert!(matches!(timer.stop().await, Err(SchedulerError::NotRunning)));

        timer.start().unwrap();
        assert!(matches!(timer.start(), Err(SchedulerError::AlreadyRunning)));
        timer.stop().await.unwrap();
    }

    #[tokio::test]
    async fn no_flush_fires_before_the_first_full_interval() {
        let trigger = Arc::new(RecordingTrigger::default());
        let mut timer = DeliveryTimer::new(
            trigger.clone(),
            DeliveryTimerConfig {
                interval: Duration::from_secs(3600),
                send_heartbeat: true,
                shutdown_timeout: Duration::from_secs(1),
            },
        );

        timer.start().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(timer.is_running());
        timer.stop().await.unwrap();

        assert_eq!(trigger.ticks.load(Ordering::SeqCst), 0);
        assert!(!timer.is_running());
    }

    #[tokio::test]
    async fn timer_can_be_restarted_after_stop() {
        let trigger = Arc::new(RecordingTrigger::default());
        let mut timer = DeliveryTimer::new(trigger.clone(), fast_config(true));

        timer.start().unwrap();
        timer.stop().await.unwrap();

        timer.start().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        timer.stop().await.unwrap();

        assert!(trigger.ticks.load(Ordering::SeqCst) >= 1);
    }
}
