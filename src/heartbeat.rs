//! Liveness probing for open connections.
//!
//! [`HeartbeatMonitor`] tracks a single deadline. The connection task awaits
//! [`HeartbeatMonitor::tick`] alongside its other sources and sends a probe
//! whenever it resolves. Observed inbound traffic calls
//! [`HeartbeatMonitor::restart`], pushing the deadline out so no probe is
//! sent while the link is demonstrably alive.
//!
//! Holding one deadline rather than a spawned timer task means at most one
//! timer can be armed per connection, and stopping it is just clearing the
//! deadline.

use std::{future::pending, time::Duration};

use tokio::time::{Instant, sleep_until};

/// Default interval between liveness probes.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Deadline-driven liveness probe timer.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tether::heartbeat::HeartbeatMonitor;
///
/// # #[tokio::main(flavor = "current_thread", start_paused = true)]
/// # async fn main() {
/// let mut monitor = HeartbeatMonitor::new(Duration::from_secs(30));
/// monitor.start();
/// monitor.tick().await; // resolves after thirty (virtual) seconds
/// assert!(monitor.is_running());
/// monitor.stop();
/// assert!(!monitor.is_running());
/// # }
/// ```
#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    deadline: Option<Instant>,
}

impl HeartbeatMonitor {
    /// Create a stopped monitor. A zero `interval` disables probing.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
        }
    }

    /// Interval between probes.
    #[must_use]
    pub const fn interval(&self) -> Duration { self.interval }

    /// Whether a deadline is armed.
    #[must_use]
    pub const fn is_running(&self) -> bool { self.deadline.is_some() }

    /// When the next probe is due, if the monitor is running.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Arm the monitor for one interval from now, replacing any previous
    /// deadline.
    pub fn start(&mut self) {
        if self.interval.is_zero() {
            return;
        }
        self.deadline = Some(Instant::now() + self.interval);
    }

    /// Push the deadline out by a full interval from now.
    ///
    /// Has no effect on a stopped monitor, so late traffic on a link that is
    /// already shutting down cannot revive probing.
    pub fn restart(&mut self) {
        if self.is_running() {
            self.start();
        }
    }

    /// Disarm the monitor. Safe to call when already stopped.
    pub fn stop(&mut self) { self.deadline = None; }

    /// Wait until a probe is due, then re-arm for the following interval.
    ///
    /// Pending forever while the monitor is stopped. Cancel-safe: dropping
    /// the future before it resolves leaves the deadline untouched.
    pub async fn tick(&mut self) {
        let Some(deadline) = self.deadline else {
            return pending().await;
        };
        sleep_until(deadline).await;
        self.start();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use tokio::time::{Instant, advance, timeout};

    use super::*;

    const INTERVAL: Duration = Duration::from_secs(30);

    // The timer wheel rounds deadlines up to the next millisecond.
    fn assert_within(elapsed: Duration, expected: Duration) {
        assert!(
            elapsed >= expected && elapsed <= expected + Duration::from_millis(2),
            "expected ~{expected:?}, got {elapsed:?}"
        );
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn tick_fires_after_one_interval() {
        let mut monitor = HeartbeatMonitor::new(INTERVAL);
        let started = Instant::now();
        monitor.start();

        monitor.tick().await;

        assert_within(started.elapsed(), INTERVAL);
        assert_eq!(monitor.deadline(), Some(Instant::now() + INTERVAL));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn stopped_monitor_never_ticks() {
        let mut monitor = HeartbeatMonitor::new(INTERVAL);
        monitor.start();
        monitor.stop();
        monitor.stop();

        let fired = timeout(INTERVAL * 4, monitor.tick()).await;

        assert!(fired.is_err(), "stopped monitor must not tick");
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn restart_defers_the_next_tick() {
        let mut monitor = HeartbeatMonitor::new(INTERVAL);
        let started = Instant::now();
        monitor.start();

        advance(Duration::from_secs(20)).await;
        monitor.restart();
        monitor.tick().await;

        assert_within(started.elapsed(), Duration::from_secs(50));
    }

    #[test]
    fn restart_does_not_arm_a_stopped_monitor() {
        let mut monitor = HeartbeatMonitor::new(INTERVAL);
        monitor.restart();
        assert!(!monitor.is_running());
    }

    #[test]
    fn zero_interval_disables_probing() {
        let mut monitor = HeartbeatMonitor::new(Duration::ZERO);
        monitor.start();
        assert!(!monitor.is_running());
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn cancelled_tick_keeps_deadline() {
        let mut monitor = HeartbeatMonitor::new(INTERVAL);
        monitor.start();
        let deadline = monitor.deadline();

        let _ = timeout(Duration::from_secs(5), monitor.tick()).await;

        assert_eq!(monitor.deadline(), deadline);
    }
}
