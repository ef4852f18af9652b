//! Keepalive timer.
//!
//! The heartbeat only decides *when* a ping is due. The event loop owns the
//! socket and does the write; if that write fails it stops the heartbeat.
//! Missing pongs never trigger anything. Liveness comes from transport close
//! events alone.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

/// Default keepalive period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// Heartbeat
// ============================================================================

/// Periodic keepalive scheduler.
#[derive(Debug)]
pub struct Heartbeat {
    period: Duration,
    timer: Option<Interval>,
    last_ack: Option<Instant>,
}

impl Heartbeat {
    /// Creates a stopped heartbeat with the given period.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            timer: None,
            last_ack: None,
        }
    }

    /// Arms the timer; the first tick comes one period from now.
    ///
    /// Calling this while running restarts the schedule.
    pub fn start(&mut self) {
        let mut timer = interval_at(Instant::now() + self.period, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.timer = Some(timer);
        trace!(period_ms = self.period.as_millis() as u64, "Heartbeat started");
    }

    /// Disarms the timer. Safe to call when stopped.
    pub fn stop(&mut self) {
        if self.timer.take().is_some() {
            trace!("Heartbeat stopped");
        }
    }

    /// Completes when the next ping is due. Never completes while stopped.
    pub async fn tick(&mut self) {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick().await;
            }
            None => pending::<()>().await,
        }
    }

    /// Records a pong.
    #[inline]
    pub fn acknowledge(&mut self) {
        self.last_ack = Some(Instant::now());
    }

    /// Returns `true` while the timer is armed.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Returns the configured period.
    #[inline]
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns when the last pong arrived.
    #[inline]
    #[must_use]
    pub fn last_ack(&self) -> Option<Instant> {
        self.last_ack
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::time::timeout;

    #[test]
    fn test_default_interval() {
        assert_eq!(DEFAULT_HEARTBEAT_INTERVAL.as_secs(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(30));
        heartbeat.start();

        let early = timeout(Duration::from_secs(29), heartbeat.tick()).await;
        assert!(early.is_err());

        let due = timeout(Duration::from_secs(2), heartbeat.tick()).await;
        assert!(due.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_never_ticks() {
        let mut heartbeat = Heartbeat::new(Duration::from_millis(10));
        heartbeat.start();
        heartbeat.stop();
        heartbeat.stop();

        assert!(!heartbeat.is_running());
        let result = timeout(Duration::from_secs(60), heartbeat.tick()).await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_schedule() {
        let mut heartbeat = Heartbeat::new(Duration::from_secs(10));
        heartbeat.start();
        tokio::time::advance(Duration::from_secs(8)).await;

        heartbeat.start();
        let early = timeout(Duration::from_secs(5), heartbeat.tick()).await;
        assert!(early.is_err(), "restart must push the next tick out");

        let due = timeout(Duration::from_secs(6), heartbeat.tick()).await;
        assert!(due.is_ok());
    }

    #[tokio::test]
    async fn test_acknowledge_records_time() {
        let mut heartbeat = Heartbeat::new(DEFAULT_HEARTBEAT_INTERVAL);
        assert!(heartbeat.last_ack().is_none());
        heartbeat.acknowledge();
        assert!(heartbeat.last_ack().is_some());
    }
}
